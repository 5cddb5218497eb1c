#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod error;
mod notify;
mod pipeline;
mod request;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod memory;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use notify::{EVENT_OCR_COMPLETE, EVENT_OCR_COMPLETE_ASYNC, NatsEventPublisher, OcrCompleteEvent};
pub use pipeline::{BatchResponse, ItemOutcome, OcrPipeline, ProcessingReport};
pub use request::{JobCallback, JobStatus, UploadNotification, parse_batch};

/// Tracing target for pipeline orchestration events.
pub const TRACING_TARGET_PIPELINE: &str = "docmill_worker::pipeline";

/// Tracing target for outbound notifications.
pub const TRACING_TARGET_NOTIFY: &str = "docmill_worker::notify";

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for dispatch decisions.
pub const TRACING_TARGET_DISPATCH: &str = "docmill_core::dispatch";

mod dispatch;
mod document;
mod error;
mod extraction;

pub use dispatch::{
    DEFAULT_MAX_SYNC_BYTES, DispatchPolicy, SUPPORTED_DOCUMENT_EXTENSIONS,
    SUPPORTED_IMAGE_EXTENSIONS,
};
pub use document::{DocumentRecord, DocumentStatus, OcrSummary, StatusUpdate};
pub use error::{Error, Result};
pub use extraction::{
    Artifact, BoundingBox, ExtractionResult, PROCESSOR_VERSION, ProcessingMode, TextLine,
};

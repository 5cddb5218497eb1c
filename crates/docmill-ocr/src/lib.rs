#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for OCR client operations.
///
/// Use this target for logging client initialization, configuration, and client-level errors.
pub const TRACING_TARGET_CLIENT: &str = "docmill_ocr::client";

/// Tracing target for extraction calls and normalization.
pub const TRACING_TARGET_BACKEND: &str = "docmill_ocr::backend";

mod backend;
mod block;
mod client;
pub mod error;
mod normalize;

pub use crate::backend::{ExtractionBackend, StartedJob};
pub use crate::block::{Block, BlockType, EntityType, Relationship, RelationshipType};
pub use crate::client::{OcrBuilder, OcrClient, OcrConfig, OcrCredentials};
pub use crate::error::{Error, Result};
pub use crate::normalize::{key_value_pairs, normalize, text_lines};

//! Error types for pipeline orchestration.

use std::time::Duration;

use crate::store::StoreError;

/// Result type for all operations in this crate.
///
/// This is a convenience type alias that defaults to using [`PipelineError`]
/// as the error type.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// Unified error type for one document's trip through the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Document-level rejection: unsupported format, oversize file, or a
    /// malformed inbound payload.
    #[error(transparent)]
    Document(#[from] docmill_core::Error),

    /// The extraction backend call failed.
    #[error("Extraction failed: {0}")]
    Extraction(#[from] docmill_ocr::Error),

    /// A status store, object store, or registry operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A best-effort downstream notification failed.
    ///
    /// Never propagated past the pipeline boundary; surfaced in logs only.
    #[error("Notification failed: {reason}")]
    Notification { reason: String },

    /// The backend call exceeded its mode-specific time budget.
    #[error("Extraction timed out after {timeout:?}")]
    Timeout { timeout: Duration },
}

impl PipelineError {
    /// Create a notification error
    pub fn notification(reason: impl Into<String>) -> Self {
        Self::Notification {
            reason: reason.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout { timeout }
    }

    /// Check if redelivering the inbound message could succeed.
    ///
    /// Document-level rejections are terminal; backend and persistence
    /// failures are worth a retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Document(error) => error.is_retryable(),
            Self::Extraction(error) => error.is_retryable(),
            Self::Store(_) => true,
            Self::Notification { .. } => false,
            Self::Timeout { .. } => true,
        }
    }
}

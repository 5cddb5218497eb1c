//! Error types for docmill-ocr
//!
//! This module provides error handling for the extraction backend client.

use std::time::Duration;

/// Result type for all OCR operations in this crate.
///
/// This is a convenience type alias that defaults to using [`Error`] as the error type.
/// Most functions in this crate return this type for consistent error handling.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type for extraction backend operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP client/connection errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors when sending or receiving data
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Operation timeout
    #[error("Operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// Extraction API error response
    #[error("Extraction API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Asynchronous extraction job failed backend-side
    #[error("Extraction job '{job_id}' failed: {reason}")]
    JobFailed { job_id: String, reason: String },

    /// Invalid configuration
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Generic operation error with context
    #[error("Extraction operation failed: {operation} - {details}")]
    Operation { operation: String, details: String },
}

impl Error {
    /// Create an API error
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Create a job failed error
    pub fn job_failed(job_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::JobFailed {
            job_id: job_id.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a timeout error with the given duration
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { timeout: duration }
    }

    /// Create an operation error with context
    pub fn operation(op: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Operation {
            operation: op.into(),
            details: details.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(err) => err.is_timeout() || err.is_connect(),
            Error::Timeout { .. } => true,
            Error::ApiError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Get suggested retry delay for retryable errors
    pub fn retry_delay(&self) -> Option<Duration> {
        match self {
            Error::Timeout { .. } => Some(Duration::from_secs(1)),
            Error::Http(_) => Some(Duration::from_millis(500)),
            Error::ApiError { status, .. } if *status >= 500 => Some(Duration::from_secs(2)),
            _ => None,
        }
    }
}

// Import builder error type for From implementation
use crate::client::OcrBuilderError;

impl From<OcrBuilderError> for Error {
    fn from(err: OcrBuilderError) -> Self {
        Error::InvalidConfig {
            reason: err.to_string(),
        }
    }
}

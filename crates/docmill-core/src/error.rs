//! Error types for core pipeline decisions.

/// Result type for all operations in this crate.
///
/// This is a convenience type alias that defaults to using [`Error`] as the error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Unified error type for core pipeline decisions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Document format is not in the supported set.
    #[error("Unsupported document format: {extension}. Supported formats: {supported:?}")]
    UnsupportedFormat {
        extension: String,
        supported: Vec<String>,
    },

    /// Document size exceeds the configured maximum.
    #[error("File size {size} bytes exceeds limit of {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    /// Inbound payload failed boundary validation.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Serialization errors when encoding or decoding payloads.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create an unsupported format error
    pub fn unsupported_format(extension: impl Into<String>, supported: Vec<String>) -> Self {
        Self::UnsupportedFormat {
            extension: extension.into(),
            supported,
        }
    }

    /// Create a file too large error
    pub fn file_too_large(size: u64, limit: u64) -> Self {
        Self::FileTooLarge { size, limit }
    }

    /// Create an invalid request error
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Check if this error is retryable.
    ///
    /// Format and size rejections are terminal for the document; the user
    /// must resubmit a different file.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Get a user-friendly error message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            Error::UnsupportedFormat { extension, supported } => {
                format!(
                    "Unsupported file format '{}'. Please use one of: {}",
                    extension,
                    supported.join(", ")
                )
            }
            Error::FileTooLarge { size, limit } => {
                format!(
                    "Document is too large ({:.1} MB). Maximum size is {:.1} MB.",
                    *size as f64 / 1024.0 / 1024.0,
                    *limit as f64 / 1024.0 / 1024.0
                )
            }
            Error::InvalidRequest { reason } => format!("Invalid request: {}", reason),
            Error::Serialization(_) => "Data format error. Please check your input.".to_string(),
        }
    }
}

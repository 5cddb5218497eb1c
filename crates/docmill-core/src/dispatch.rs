//! Extraction strategy dispatch.
//!
//! Large or complex documents must go through the backend's asynchronous
//! path to respect its synchronous call-time limits; images are cheap enough
//! to always process synchronously within the size tier.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::extraction::ProcessingMode;
use crate::TRACING_TARGET_DISPATCH;

/// Image extensions accepted for synchronous text detection.
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "tif"];

/// Document extensions accepted for synchronous analysis.
pub const SUPPORTED_DOCUMENT_EXTENSIONS: &[&str] = &["pdf"];

/// Default size tier below which synchronous extraction is used (5 MB).
pub const DEFAULT_MAX_SYNC_BYTES: u64 = 5 * 1024 * 1024;

/// Chooses an extraction strategy from file extension and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchPolicy {
    /// Maximum object size processed synchronously.
    pub max_sync_bytes: u64,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self {
            max_sync_bytes: DEFAULT_MAX_SYNC_BYTES,
        }
    }
}

impl DispatchPolicy {
    /// Creates a policy with a custom synchronous size tier.
    pub fn new(max_sync_bytes: u64) -> Self {
        Self { max_sync_bytes }
    }

    /// Returns true if the extension is in the supported set.
    pub fn is_supported(extension: &str) -> bool {
        let extension = extension.to_lowercase();
        SUPPORTED_IMAGE_EXTENSIONS.contains(&extension.as_str())
            || SUPPORTED_DOCUMENT_EXTENSIONS.contains(&extension.as_str())
    }

    /// All supported extensions, for error reporting.
    pub fn supported_extensions() -> Vec<String> {
        SUPPORTED_IMAGE_EXTENSIONS
            .iter()
            .chain(SUPPORTED_DOCUMENT_EXTENSIONS)
            .map(|ext| ext.to_string())
            .collect()
    }

    /// Selects the extraction strategy for a document.
    ///
    /// Unsupported extensions are rejected before any extraction call is
    /// made. An unknown size (failed metadata lookup) is a soft failure: the
    /// document is processed as if it were empty, with a warning.
    pub fn select(&self, extension: &str, size: Option<u64>) -> Result<ProcessingMode> {
        let extension = extension.to_lowercase();

        if !Self::is_supported(&extension) {
            return Err(Error::unsupported_format(
                extension,
                Self::supported_extensions(),
            ));
        }

        let size = match size {
            Some(size) => size,
            None => {
                tracing::warn!(
                    target: TRACING_TARGET_DISPATCH,
                    extension = %extension,
                    "Object size unknown, dispatching as if empty"
                );
                0
            }
        };

        let mode = if SUPPORTED_IMAGE_EXTENSIONS.contains(&extension.as_str())
            && size <= self.max_sync_bytes
        {
            ProcessingMode::SyncDetectText
        } else if extension == "pdf" && size <= self.max_sync_bytes {
            ProcessingMode::SyncAnalyzeDocument
        } else {
            ProcessingMode::AsyncDetectText
        };

        tracing::debug!(
            target: TRACING_TARGET_DISPATCH,
            extension = %extension,
            size = size,
            mode = %mode,
            "Selected extraction strategy"
        );

        Ok(mode)
    }
}

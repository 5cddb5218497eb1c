//! Document status record and transition updates.
//!
//! A [`DocumentRecord`] tracks one uploaded file as it moves through the
//! pipeline. The orchestrator owns all status transitions for the duration of
//! one invocation; writes are expressed as partial [`StatusUpdate`]s so the
//! backing store can apply them idempotently.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::extraction::ProcessingMode;

/// Lifecycle state of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentStatus {
    /// Upload was initialized but no bytes have arrived.
    Pending,
    /// Upload is in flight (set by the upload collaborator).
    Uploading,
    /// Upload completed (set by the upload collaborator).
    Uploaded,
    /// The pipeline is extracting text from the document.
    Processing,
    /// Extraction completed and the artifact was persisted.
    Processed,
    /// The pipeline failed for this document.
    Failed,
}

impl DocumentStatus {
    /// Returns true if no further processing will occur for this document
    /// without a new attempt.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Processed | Self::Failed)
    }
}

/// Summary of a completed extraction, attached to the document record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrSummary {
    /// Strategy used for the extraction.
    pub mode: ProcessingMode,
    /// Number of recognized text lines.
    pub text_line_count: usize,
    /// Mean line confidence (0-100).
    pub average_confidence: f64,
    /// Backend call duration in milliseconds.
    pub processing_time_ms: u64,
    /// Object key of the persisted JSON artifact.
    pub json_key: String,
    /// Backend job id for asynchronous runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

/// One uploaded document tracked by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Opaque stable identifier.
    pub document_id: String,

    /// Upload session this document belongs to, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Object storage bucket holding the raw upload.
    pub bucket: String,

    /// Object storage key of the raw upload.
    pub object_key: String,

    /// Lower-cased file extension, when derivable from the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,

    /// Object size in bytes, when the metadata lookup succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,

    /// Current lifecycle state.
    pub status: DocumentStatus,

    /// Extraction summary, populated once processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_results: Option<OcrSummary>,

    /// Error message for failed documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the record was created.
    pub created_at: Timestamp,

    /// When the record was last written.
    pub updated_at: Timestamp,

    /// Start timestamp of the attempt that produced the current status.
    ///
    /// A stale duplicate attempt must never overwrite a newer terminal
    /// state; stores compare this timestamp before applying an update.
    pub last_attempt_at: Timestamp,

    /// When processing started for the most recent attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_started_at: Option<Timestamp>,

    /// When the document reached `processed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<Timestamp>,

    /// When the document reached `failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<Timestamp>,
}

impl DocumentRecord {
    /// Creates a fresh record for an object that just appeared in storage.
    pub fn new(
        document_id: impl Into<String>,
        bucket: impl Into<String>,
        object_key: impl Into<String>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            document_id: document_id.into(),
            session_id: None,
            bucket: bucket.into(),
            object_key: object_key.into(),
            file_extension: None,
            file_size_bytes: None,
            status: DocumentStatus::Pending,
            ocr_results: None,
            error: None,
            created_at: now,
            updated_at: now,
            last_attempt_at: now,
            processing_started_at: None,
            processed_at: None,
            failed_at: None,
        }
    }

    /// Applies a partial update to this record.
    ///
    /// Returns false without modifying the record when the update originates
    /// from an attempt older than the one that produced the current state.
    pub fn apply(&mut self, update: &StatusUpdate) -> bool {
        if update.attempt_at < self.last_attempt_at && self.status.is_terminal() {
            return false;
        }

        self.status = update.status;
        self.updated_at = Timestamp::now();
        self.last_attempt_at = update.attempt_at;

        match update.status {
            DocumentStatus::Processing => {
                self.processing_started_at = Some(update.attempt_at);
                // A reprocessing attempt starts from a clean slate.
                self.error = None;
            }
            DocumentStatus::Processed => {
                self.processed_at = Some(self.updated_at);
                self.error = None;
            }
            DocumentStatus::Failed => {
                self.failed_at = Some(self.updated_at);
            }
            _ => {}
        }

        if let Some(extension) = &update.file_extension {
            self.file_extension = Some(extension.clone());
        }
        if let Some(size) = update.file_size_bytes {
            self.file_size_bytes = Some(size);
        }
        if let Some(summary) = &update.ocr_results {
            self.ocr_results = Some(summary.clone());
        }
        if let Some(error) = &update.error {
            self.error = Some(error.clone());
        }

        true
    }
}

/// Partial update for a document record.
///
/// Carries the target status, the originating attempt timestamp, and any
/// additional fields set by that transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Target lifecycle state.
    pub status: DocumentStatus,
    /// Start timestamp of the attempt issuing this update.
    pub attempt_at: Timestamp,
    /// File extension computed during validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,
    /// Object size observed during validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
    /// Extraction summary for `processed` transitions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ocr_results: Option<OcrSummary>,
    /// Error message for `failed` transitions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusUpdate {
    fn new(status: DocumentStatus, attempt_at: Timestamp) -> Self {
        Self {
            status,
            attempt_at,
            file_extension: None,
            file_size_bytes: None,
            ocr_results: None,
            error: None,
        }
    }

    /// Transition into `processing`, recording validation metadata.
    pub fn processing(
        attempt_at: Timestamp,
        file_extension: impl Into<String>,
        file_size_bytes: Option<u64>,
    ) -> Self {
        let mut update = Self::new(DocumentStatus::Processing, attempt_at);
        update.file_extension = Some(file_extension.into());
        update.file_size_bytes = file_size_bytes;
        update
    }

    /// Transition into `processed`, attaching the extraction summary.
    pub fn processed(attempt_at: Timestamp, summary: OcrSummary) -> Self {
        let mut update = Self::new(DocumentStatus::Processed, attempt_at);
        update.ocr_results = Some(summary);
        update
    }

    /// Transition into `failed`, recording the error message.
    pub fn failed(attempt_at: Timestamp, error: impl Into<String>) -> Self {
        let mut update = Self::new(DocumentStatus::Failed, attempt_at);
        update.error = Some(error.into());
        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> OcrSummary {
        OcrSummary {
            mode: ProcessingMode::SyncDetectText,
            text_line_count: 3,
            average_confidence: 92.5,
            processing_time_ms: 140,
            json_key: "json/doc-1_abcd1234.json".to_string(),
            job_id: None,
        }
    }

    #[test]
    fn test_status_terminal() {
        assert!(DocumentStatus::Processed.is_terminal());
        assert!(DocumentStatus::Failed.is_terminal());
        assert!(!DocumentStatus::Processing.is_terminal());
        assert!(!DocumentStatus::Pending.is_terminal());
    }

    #[test]
    fn test_transition_sequence() {
        let mut record = DocumentRecord::new("doc-1", "documents-raw", "raw/s1/doc-1/a.pdf");
        let attempt = Timestamp::now();

        assert!(record.apply(&StatusUpdate::processing(attempt, "pdf", Some(1024))));
        assert_eq!(record.status, DocumentStatus::Processing);
        assert_eq!(record.file_extension.as_deref(), Some("pdf"));
        assert_eq!(record.file_size_bytes, Some(1024));
        assert_eq!(record.processing_started_at, Some(attempt));

        assert!(record.apply(&StatusUpdate::processed(attempt, summary())));
        assert_eq!(record.status, DocumentStatus::Processed);
        assert!(record.ocr_results.is_some());
        assert!(record.processed_at.is_some());
        assert!(record.error.is_none());
    }

    #[test]
    fn test_failed_records_error() {
        let mut record = DocumentRecord::new("doc-1", "documents-raw", "raw/s1/doc-1/a.pdf");
        let attempt = Timestamp::now();

        record.apply(&StatusUpdate::processing(attempt, "pdf", None));
        record.apply(&StatusUpdate::failed(attempt, "backend unavailable"));

        assert_eq!(record.status, DocumentStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("backend unavailable"));
        assert!(record.failed_at.is_some());
    }

    #[test]
    fn test_stale_attempt_cannot_clobber_terminal_state() {
        let mut record = DocumentRecord::new("doc-1", "documents-raw", "raw/s1/doc-1/a.pdf");
        let stale = Timestamp::now();
        let fresh = stale + jiff::SignedDuration::from_secs(5);

        record.apply(&StatusUpdate::processing(fresh, "pdf", Some(1024)));
        record.apply(&StatusUpdate::processed(fresh, summary()));

        // A delayed duplicate from an older attempt must be ignored.
        assert!(!record.apply(&StatusUpdate::failed(stale, "stale failure")));
        assert_eq!(record.status, DocumentStatus::Processed);
        assert!(record.error.is_none());
    }

    #[test]
    fn test_reprocessing_overwrites_previous_result() {
        let mut record = DocumentRecord::new("doc-1", "documents-raw", "raw/s1/doc-1/a.pdf");
        let first = Timestamp::now();
        let second = first + jiff::SignedDuration::from_secs(60);

        record.apply(&StatusUpdate::processing(first, "pdf", Some(1024)));
        record.apply(&StatusUpdate::processed(first, summary()));

        let mut newer = summary();
        newer.json_key = "json/doc-1_ffff0000.json".to_string();
        assert!(record.apply(&StatusUpdate::processing(second, "pdf", Some(1024))));
        assert!(record.apply(&StatusUpdate::processed(second, newer.clone())));

        assert_eq!(record.status, DocumentStatus::Processed);
        assert_eq!(record.ocr_results, Some(newer));
    }
}

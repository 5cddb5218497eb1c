//! Injected storage and collaborator abstractions.
//!
//! The pipeline never talks to a concrete store directly; every external
//! dependency is a trait object so one document's trip through the state
//! machine is testable with in-memory doubles.

use async_trait::async_trait;
use bytes::Bytes;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use docmill_core::{DocumentRecord, StatusUpdate};
use docmill_mapper::MappedFields;

use crate::notify::OcrCompleteEvent;

/// Error from a storage or collaborator operation.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Store operation '{operation}' failed: {reason}")]
pub struct StoreError {
    /// Operation that failed, e.g. `put_json` or `apply`.
    pub operation: String,
    /// Underlying failure description.
    pub reason: String,
}

impl StoreError {
    pub fn new(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

/// Metadata of a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Object size in bytes.
    pub size: u64,
}

/// Context persisted when an asynchronous extraction job is started, so the
/// completion callback can resume the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingJob {
    /// Document the job belongs to.
    pub document_id: String,
    /// Bucket of the raw upload.
    pub bucket: String,
    /// Object key of the raw upload.
    pub object_key: String,
    /// When the originating attempt started; carried into the resumed
    /// status updates for stale-attempt arbitration.
    pub started_at: Timestamp,
}

/// Per-document status records.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches the record for a document, if one exists.
    async fn get(&self, document_id: &str) -> Result<Option<DocumentRecord>, StoreError>;

    /// Applies a partial status update, creating the record if absent.
    ///
    /// Returns false when the store refused the update because it originates
    /// from an attempt older than the one that produced the current terminal
    /// state.
    async fn apply(
        &self,
        document_id: &str,
        bucket: &str,
        object_key: &str,
        update: StatusUpdate,
    ) -> Result<bool, StoreError>;
}

/// Durable object storage for raw uploads and JSON artifacts.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Looks up object metadata. A missing object yields `None`; the
    /// pipeline treats both a missing object and a failed lookup as an
    /// unknown size, never as a hard failure.
    async fn metadata(&self, bucket: &str, key: &str) -> Result<Option<ObjectMetadata>, StoreError>;

    /// Writes a JSON document under the given key, replacing any previous
    /// content.
    async fn put_json(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), StoreError>;
}

/// Questionnaire-answer collaborator; mapped fields are forwarded
/// best-effort.
#[async_trait]
pub trait AnswerSink: Send + Sync {
    async fn submit(&self, document_id: &str, fields: &MappedFields) -> Result<(), StoreError>;
}

/// Outbound completion notifications.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &OcrCompleteEvent) -> Result<(), StoreError>;
}

/// Persisted asynchronous-job context, keyed by backend job id.
#[async_trait]
pub trait JobRegistry: Send + Sync {
    /// Registers a started job.
    async fn put(&self, job_id: &str, job: PendingJob) -> Result<(), StoreError>;

    /// Removes and returns the context for a job, if known.
    async fn take(&self, job_id: &str) -> Result<Option<PendingJob>, StoreError>;
}

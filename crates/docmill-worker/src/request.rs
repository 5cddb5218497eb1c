//! Inbound request payloads.
//!
//! The batch entry point accepts both the nested object-storage event form
//! and a flat `{bucket, key}` form; anything else is rejected at the
//! boundary with [`docmill_core::Error::InvalidRequest`] rather than failing
//! deep inside field access.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One uploaded object to process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadNotification {
    /// Object storage bucket holding the upload.
    pub bucket: String,
    /// Object storage key of the upload.
    pub key: String,
}

impl UploadNotification {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Derives the document id from the object key.
    ///
    /// Keys shaped `raw/{session_id}/{document_id}/{filename}` yield the
    /// third segment; anything shallower falls back to the filename stem.
    pub fn document_id(&self) -> String {
        let segments: Vec<&str> = self.key.split('/').collect();
        if segments.len() >= 3 {
            return segments[2].to_string();
        }

        let filename = segments.last().copied().unwrap_or_default();
        match filename.rsplit_once('.') {
            Some((stem, _)) => stem.to_string(),
            None => filename.to_string(),
        }
    }

    /// Lower-cased file extension of the object key, when present.
    pub fn file_extension(&self) -> Option<String> {
        let filename = self.key.rsplit('/').next()?;
        filename
            .rsplit_once('.')
            .map(|(_, extension)| extension.to_lowercase())
            .filter(|extension| !extension.is_empty())
    }
}

/// Status reported by the backend's completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    Failed,
    /// Any status string this pipeline does not recognize.
    #[serde(other)]
    Other,
}

/// Completion callback for a backend-side asynchronous extraction job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCallback {
    /// Backend-assigned job id recorded when the job was started.
    pub job_id: String,
    /// Terminal status of the job.
    pub status: JobStatus,
    /// Backend-provided detail, usually present on failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BatchPayload {
    Nested { records: Vec<RecordEntry> },
    Flat { bucket: String, key: String },
}

#[derive(Debug, Deserialize)]
struct RecordEntry {
    bucket: BucketRef,
    object: ObjectRef,
}

#[derive(Debug, Deserialize)]
struct BucketRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ObjectRef {
    key: String,
}

/// Parses an inbound batch payload into upload notifications.
///
/// # Errors
///
/// Returns [`docmill_core::Error::InvalidRequest`] when the payload matches
/// neither accepted form or names an empty bucket or key.
pub fn parse_batch(payload: &serde_json::Value) -> Result<Vec<UploadNotification>> {
    let payload: BatchPayload = serde_json::from_value(payload.clone()).map_err(|_| {
        docmill_core::Error::invalid_request(
            "Expected a {records: [{bucket: {name}, object: {key}}]} or {bucket, key} payload",
        )
    })?;

    let notifications = match payload {
        BatchPayload::Nested { records } => records
            .into_iter()
            .map(|record| UploadNotification::new(record.bucket.name, record.object.key))
            .collect(),
        BatchPayload::Flat { bucket, key } => vec![UploadNotification::new(bucket, key)],
    };

    for notification in &notifications {
        if notification.bucket.is_empty() || notification.key.is_empty() {
            return Err(
                docmill_core::Error::invalid_request("Bucket and key must be non-empty").into(),
            );
        }
    }

    Ok(notifications)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_from_deep_key() {
        let notification =
            UploadNotification::new("documents-raw", "raw/session-1/doc-42/passport.jpg");
        assert_eq!(notification.document_id(), "doc-42");
    }

    #[test]
    fn test_document_id_falls_back_to_filename_stem() {
        let notification = UploadNotification::new("documents-raw", "passport.jpg");
        assert_eq!(notification.document_id(), "passport");

        let notification = UploadNotification::new("documents-raw", "uploads/loa.pdf");
        assert_eq!(notification.document_id(), "loa");
    }

    #[test]
    fn test_file_extension_lower_cased() {
        let notification = UploadNotification::new("b", "raw/s/d/SCAN.PDF");
        assert_eq!(notification.file_extension().as_deref(), Some("pdf"));

        let notification = UploadNotification::new("b", "raw/s/d/no_extension");
        assert_eq!(notification.file_extension(), None);
    }

    #[test]
    fn test_parse_nested_batch() {
        let payload = serde_json::json!({
            "records": [
                {"bucket": {"name": "documents-raw"}, "object": {"key": "raw/s1/d1/a.jpg"}},
                {"bucket": {"name": "documents-raw"}, "object": {"key": "raw/s1/d2/b.pdf"}}
            ]
        });

        let notifications = parse_batch(&payload).unwrap();
        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[1].key, "raw/s1/d2/b.pdf");
    }

    #[test]
    fn test_parse_flat_payload() {
        let payload = serde_json::json!({"bucket": "documents-raw", "key": "raw/s1/d1/a.jpg"});
        let notifications = parse_batch(&payload).unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].bucket, "documents-raw");
    }

    #[test]
    fn test_parse_rejects_malformed_payloads() {
        for payload in [
            serde_json::json!({"records": "not-a-list"}),
            serde_json::json!({"something": "else"}),
            serde_json::json!(42),
            serde_json::json!({"bucket": "", "key": "raw/s/d/a.jpg"}),
        ] {
            let error = parse_batch(&payload).unwrap_err();
            assert!(
                matches!(
                    error,
                    crate::PipelineError::Document(docmill_core::Error::InvalidRequest { .. })
                ),
                "payload {payload}"
            );
        }
    }

    #[test]
    fn test_job_callback_unknown_status() {
        let callback: JobCallback =
            serde_json::from_value(serde_json::json!({"job_id": "j1", "status": "in_progress"}))
                .unwrap();
        assert_eq!(callback.status, JobStatus::Other);
    }
}

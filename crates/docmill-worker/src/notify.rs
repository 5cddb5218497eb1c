//! Completion notifications.

use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use docmill_core::ProcessingMode;

use crate::TRACING_TARGET_NOTIFY;
use crate::store::{EventPublisher, StoreError};

/// Event type for synchronously processed documents.
pub const EVENT_OCR_COMPLETE: &str = "ocr_complete";

/// Event type for documents completed through the asynchronous callback.
pub const EVENT_OCR_COMPLETE_ASYNC: &str = "ocr_complete_async";

/// Notification emitted after a document reaches `processed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrCompleteEvent {
    /// [`EVENT_OCR_COMPLETE`] or [`EVENT_OCR_COMPLETE_ASYNC`].
    pub event_type: String,
    pub document_id: String,
    pub processing_mode: ProcessingMode,
    /// Number of recognized text lines.
    pub text_blocks_found: usize,
    pub average_confidence: f64,
    pub mapped_fields_count: usize,
    /// Names of the fields the mapper derived.
    pub mapped_fields: Vec<String>,
    /// Object key of the persisted JSON artifact.
    pub json_key: String,
    /// Backend job id for asynchronous runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub processing_time_ms: u64,
    pub timestamp: Timestamp,
}

/// Publishes completion events to a NATS subject.
///
/// An unconfigured subject downgrades publishing to a warning; completion
/// notifications are optional by contract.
#[derive(Debug, Clone)]
pub struct NatsEventPublisher {
    client: async_nats::Client,
    subject: Option<String>,
}

impl NatsEventPublisher {
    pub fn new(client: async_nats::Client, subject: Option<String>) -> Self {
        Self { client, subject }
    }
}

#[async_trait]
impl EventPublisher for NatsEventPublisher {
    async fn publish(&self, event: &OcrCompleteEvent) -> Result<(), StoreError> {
        let Some(subject) = &self.subject else {
            tracing::warn!(
                target: TRACING_TARGET_NOTIFY,
                document_id = %event.document_id,
                "No notification subject configured, skipping completion event"
            );
            return Ok(());
        };

        let payload = serde_json::to_vec(event)
            .map_err(|error| StoreError::new("publish", error.to_string()))?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|error| StoreError::new("publish", error.to_string()))?;

        tracing::debug!(
            target: TRACING_TARGET_NOTIFY,
            subject = %subject,
            document_id = %event.document_id,
            event_type = %event.event_type,
            "Published completion event"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_omits_absent_job_id() {
        let event = OcrCompleteEvent {
            event_type: EVENT_OCR_COMPLETE.to_string(),
            document_id: "doc-1".to_string(),
            processing_mode: ProcessingMode::SyncDetectText,
            text_blocks_found: 12,
            average_confidence: 93.4,
            mapped_fields_count: 2,
            mapped_fields: vec!["passport_number".to_string(), "full_name".to_string()],
            json_key: "json/doc-1_0a1b2c3d.json".to_string(),
            job_id: None,
            processing_time_ms: 180,
            timestamp: Timestamp::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "ocr_complete");
        assert_eq!(json["processing_mode"], "sync_detect_text");
        assert!(json.get("job_id").is_none());
    }
}

//! Extraction backend abstraction.
//!
//! The orchestrator talks to the extraction service exclusively through the
//! [`ExtractionBackend`] trait so the pipeline is testable without a live
//! service. The [`OcrClient`] implementation measures wall-clock time around
//! each backend call and normalizes the returned block graph before handing
//! it back.

use std::time::Instant;

use docmill_core::{ExtractionResult, ProcessingMode};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_BACKEND;
use crate::client::OcrClient;
use crate::error::Result;
use crate::normalize;

/// Acknowledgement of a started asynchronous extraction job.
///
/// The actual result is delivered later through the completion callback
/// registered at start time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartedJob {
    /// Backend-assigned job id, used to correlate the callback.
    pub job_id: String,
}

/// Remote text/structure extraction capability.
#[async_trait::async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Synchronous line-level text detection.
    async fn detect_text(&self, bucket: &str, key: &str) -> Result<ExtractionResult>;

    /// Synchronous document analysis extracting both text lines and form
    /// key/value pairs.
    async fn analyze_document(&self, bucket: &str, key: &str) -> Result<ExtractionResult>;

    /// Starts backend-side asynchronous text detection and registers a
    /// callback notification target. Returns immediately.
    async fn start_text_detection(
        &self,
        bucket: &str,
        key: &str,
        notify_target: &str,
    ) -> Result<StartedJob>;

    /// Fetches the delivered result of a completed asynchronous job.
    async fn fetch_job_result(&self, job_id: &str) -> Result<ExtractionResult>;
}

#[async_trait::async_trait]
impl ExtractionBackend for OcrClient {
    async fn detect_text(&self, bucket: &str, key: &str) -> Result<ExtractionResult> {
        let started = Instant::now();
        let response = self.detect_text_blocks(bucket, key).await?;
        let result = normalize::normalize(
            ProcessingMode::SyncDetectText,
            &response.blocks,
            started.elapsed(),
            response.request_id,
        );

        tracing::debug!(
            target: TRACING_TARGET_BACKEND,
            bucket = %bucket,
            key = %key,
            line_count = result.line_count(),
            average_confidence = result.average_confidence,
            processing_time_ms = result.processing_time_ms,
            "Detected text"
        );
        Ok(result)
    }

    async fn analyze_document(&self, bucket: &str, key: &str) -> Result<ExtractionResult> {
        let started = Instant::now();
        let response = self.analyze_document_blocks(bucket, key).await?;
        let result = normalize::normalize(
            ProcessingMode::SyncAnalyzeDocument,
            &response.blocks,
            started.elapsed(),
            response.request_id,
        );

        tracing::debug!(
            target: TRACING_TARGET_BACKEND,
            bucket = %bucket,
            key = %key,
            line_count = result.line_count(),
            key_value_count = result.key_value_pairs.len(),
            processing_time_ms = result.processing_time_ms,
            "Analyzed document"
        );
        Ok(result)
    }

    async fn start_text_detection(
        &self,
        bucket: &str,
        key: &str,
        notify_target: &str,
    ) -> Result<StartedJob> {
        let response =
            self.start_detection_job(bucket, key, notify_target).await?;

        tracing::info!(
            target: TRACING_TARGET_BACKEND,
            bucket = %bucket,
            key = %key,
            job_id = %response.job_id,
            "Started asynchronous text detection"
        );
        Ok(StartedJob {
            job_id: response.job_id,
        })
    }

    async fn fetch_job_result(&self, job_id: &str) -> Result<ExtractionResult> {
        let started = Instant::now();
        let blocks = self.fetch_job_blocks(job_id).await?;
        let result = normalize::normalize(
            ProcessingMode::AsyncDetectText,
            &blocks,
            started.elapsed(),
            None,
        )
        .with_job_id(job_id);

        tracing::debug!(
            target: TRACING_TARGET_BACKEND,
            job_id = %job_id,
            line_count = result.line_count(),
            "Fetched asynchronous job result"
        );
        Ok(result)
    }
}

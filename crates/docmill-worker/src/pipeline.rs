//! Pipeline orchestration.
//!
//! One invocation of [`OcrPipeline::process`] drives a single document
//! through the state machine: validate, transition to `processing`, extract,
//! persist the artifact, transition to `processed`, then forward mapped
//! fields and publish the completion event best-effort. Asynchronously
//! extracted documents stay `processing` until the backend callback reaches
//! [`OcrPipeline::resume`], which re-enters the tail of the same machine.

use std::sync::Arc;

use bytes::Bytes;
use jiff::Timestamp;
use serde::Serialize;
use uuid::Uuid;

use docmill_core::{
    Artifact, DispatchPolicy, DocumentStatus, ExtractionResult, OcrSummary, PROCESSOR_VERSION,
    ProcessingMode, StatusUpdate,
};
use docmill_mapper::map_fields;
use docmill_ocr::ExtractionBackend;

use crate::TRACING_TARGET_PIPELINE;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::notify::{EVENT_OCR_COMPLETE, EVENT_OCR_COMPLETE_ASYNC, OcrCompleteEvent};
use crate::request::{JobCallback, JobStatus, UploadNotification, parse_batch};
use crate::store::{
    AnswerSink, DocumentStore, EventPublisher, JobRegistry, ObjectStore, PendingJob,
};

/// Outcome of one document's pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingReport {
    pub document_id: String,
    pub mode: ProcessingMode,
    /// `processed` for completed documents, `processing` when an
    /// asynchronous job was started and the callback is pending.
    pub status: DocumentStatus,
    /// Artifact key, once one was written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_key: Option<String>,
    /// Backend job id for asynchronous runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub text_line_count: usize,
    pub mapped_field_count: usize,
}

/// Per-item outcome reported by the batch entry point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Processed {
        document_id: String,
        processing_mode: ProcessingMode,
        text_line_count: usize,
        json_key: String,
        mapped_fields_count: usize,
    },
    InProgress {
        document_id: String,
        job_id: String,
    },
    Failed {
        document_id: String,
        error: String,
        retryable: bool,
    },
}

/// Response of the batch entry point.
///
/// `ok` reflects whether the batch itself was accepted; individual item
/// failures are reported per item without failing their siblings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub items: Vec<ItemOutcome>,
}

impl BatchResponse {
    fn accepted(items: Vec<ItemOutcome>) -> Self {
        Self {
            ok: true,
            error: None,
            items,
        }
    }

    fn rejected(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
            items: Vec::new(),
        }
    }
}

/// Document OCR pipeline orchestrator.
///
/// All collaborators are injected; the orchestrator itself holds no mutable
/// state, so invocations for different documents may run fully in parallel.
#[derive(Clone)]
pub struct OcrPipeline {
    backend: Arc<dyn ExtractionBackend>,
    documents: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    answers: Arc<dyn AnswerSink>,
    events: Arc<dyn EventPublisher>,
    jobs: Arc<dyn JobRegistry>,
    policy: DispatchPolicy,
    config: PipelineConfig,
}

impl OcrPipeline {
    /// Creates a pipeline over the given collaborators.
    pub fn new(
        backend: Arc<dyn ExtractionBackend>,
        documents: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        answers: Arc<dyn AnswerSink>,
        events: Arc<dyn EventPublisher>,
        jobs: Arc<dyn JobRegistry>,
        config: PipelineConfig,
    ) -> Self {
        let policy = DispatchPolicy::new(config.max_sync_bytes);
        Self {
            backend,
            documents,
            objects,
            answers,
            events,
            jobs,
            policy,
            config,
        }
    }

    /// Processes a batch of upload notifications.
    ///
    /// Items are independent: one document's failure is reported in its own
    /// outcome and never fails its siblings. A payload that matches neither
    /// accepted form yields a rejected response, not an error.
    pub async fn handle_batch(&self, payload: &serde_json::Value) -> BatchResponse {
        let notifications = match parse_batch(payload) {
            Ok(notifications) => notifications,
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET_PIPELINE,
                    error = %error,
                    "Rejected inbound batch payload"
                );
                return BatchResponse::rejected(error.to_string());
            }
        };

        let outcomes = futures::future::join_all(
            notifications
                .iter()
                .map(|notification| self.process_item(notification)),
        )
        .await;

        BatchResponse::accepted(outcomes)
    }

    async fn process_item(&self, notification: &UploadNotification) -> ItemOutcome {
        let document_id = notification.document_id();
        match self.process(notification).await {
            Ok(report) => match report.status {
                DocumentStatus::Processing => ItemOutcome::InProgress {
                    document_id: report.document_id,
                    job_id: report.job_id.unwrap_or_default(),
                },
                _ => ItemOutcome::Processed {
                    document_id: report.document_id,
                    processing_mode: report.mode,
                    text_line_count: report.text_line_count,
                    json_key: report.json_key.unwrap_or_default(),
                    mapped_fields_count: report.mapped_field_count,
                },
            },
            Err(error) => {
                // Document rejections carry a user-facing phrasing; other
                // failures report the raw error.
                let message = match &error {
                    PipelineError::Document(rejection) => rejection.user_message(),
                    other => other.to_string(),
                };
                ItemOutcome::Failed {
                    document_id,
                    error: message,
                    retryable: error.is_retryable(),
                }
            }
        }
    }

    /// Processes one upload notification end to end.
    ///
    /// # Errors
    ///
    /// Rejections and extraction or persistence failures are recorded on the
    /// document's status record (except format rejections, which fire before
    /// any status transition) and propagated so the inbound message can be
    /// retried or dead-lettered.
    pub async fn process(&self, notification: &UploadNotification) -> Result<ProcessingReport> {
        let document_id = notification.document_id();
        let attempt_at = Timestamp::now();

        // Format validation happens before any status transition.
        let extension = notification.file_extension().unwrap_or_default();
        if !DispatchPolicy::is_supported(&extension) {
            return Err(docmill_core::Error::unsupported_format(
                extension,
                DispatchPolicy::supported_extensions(),
            )
            .into());
        }

        tracing::info!(
            target: TRACING_TARGET_PIPELINE,
            document_id = %document_id,
            bucket = %notification.bucket,
            key = %notification.key,
            "Processing upload notification"
        );

        match self
            .run(&document_id, notification, &extension, attempt_at)
            .await
        {
            Ok(report) => Ok(report),
            Err(error) => {
                self.mark_failed(
                    &document_id,
                    &notification.bucket,
                    &notification.key,
                    attempt_at,
                    &error,
                )
                .await;
                Err(error)
            }
        }
    }

    /// Resumes the state machine for a completed asynchronous job.
    ///
    /// # Errors
    ///
    /// An unknown job id yields an invalid-request rejection; failed jobs
    /// mark their document `failed` and propagate the extraction error.
    pub async fn resume(&self, callback: &JobCallback) -> Result<ProcessingReport> {
        let job = self.jobs.take(&callback.job_id).await?.ok_or_else(|| {
            docmill_core::Error::invalid_request(format!(
                "Unknown extraction job: {}",
                callback.job_id
            ))
        })?;

        tracing::info!(
            target: TRACING_TARGET_PIPELINE,
            document_id = %job.document_id,
            job_id = %callback.job_id,
            status = ?callback.status,
            "Resuming asynchronous extraction"
        );

        // Failure recording reuses the originating attempt's timestamp so a
        // delayed callback cannot clobber a newer attempt's terminal state.
        match callback.status {
            JobStatus::Succeeded => {
                let outcome = self.finish_async_job(&job, &callback.job_id).await;
                if let Err(error) = &outcome {
                    self.mark_failed(
                        &job.document_id,
                        &job.bucket,
                        &job.object_key,
                        job.started_at,
                        error,
                    )
                    .await;
                }
                outcome
            }
            JobStatus::Failed | JobStatus::Other => {
                let reason = callback
                    .message
                    .clone()
                    .unwrap_or_else(|| "backend reported job failure".to_string());
                let error =
                    PipelineError::from(docmill_ocr::Error::job_failed(&callback.job_id, reason));
                self.mark_failed(
                    &job.document_id,
                    &job.bucket,
                    &job.object_key,
                    job.started_at,
                    &error,
                )
                .await;
                Err(error)
            }
        }
    }

    async fn finish_async_job(&self, job: &PendingJob, job_id: &str) -> Result<ProcessingReport> {
        let timeout = self.config.sync_timeout();
        let result = tokio::time::timeout(timeout, self.backend.fetch_job_result(job_id))
            .await
            .map_err(|_| PipelineError::timeout(timeout))??;

        self.complete(
            &job.document_id,
            &job.bucket,
            &job.object_key,
            job.started_at,
            result,
            EVENT_OCR_COMPLETE_ASYNC,
        )
        .await
    }

    /// Steps between the format check and completion: size validation, the
    /// `processing` transition, dispatch, and the backend call.
    async fn run(
        &self,
        document_id: &str,
        notification: &UploadNotification,
        extension: &str,
        attempt_at: Timestamp,
    ) -> Result<ProcessingReport> {
        // A failed metadata lookup is survivable; an oversize file is not.
        let size = match self
            .objects
            .metadata(&notification.bucket, &notification.key)
            .await
        {
            Ok(metadata) => metadata.map(|metadata| metadata.size),
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET_PIPELINE,
                    document_id = %document_id,
                    error = %error,
                    "Size lookup failed, proceeding with unknown size"
                );
                None
            }
        };
        if let Some(size) = size
            && size > self.config.max_file_bytes
        {
            return Err(
                docmill_core::Error::file_too_large(size, self.config.max_file_bytes).into(),
            );
        }

        self.documents
            .apply(
                document_id,
                &notification.bucket,
                &notification.key,
                StatusUpdate::processing(attempt_at, extension, size),
            )
            .await?;

        let mode = self.policy.select(extension, size)?;
        match mode {
            ProcessingMode::SyncDetectText | ProcessingMode::SyncAnalyzeDocument => {
                let timeout = self.config.sync_timeout();
                let call = async {
                    match mode {
                        ProcessingMode::SyncDetectText => {
                            self.backend
                                .detect_text(&notification.bucket, &notification.key)
                                .await
                        }
                        _ => {
                            self.backend
                                .analyze_document(&notification.bucket, &notification.key)
                                .await
                        }
                    }
                };
                let result = tokio::time::timeout(timeout, call)
                    .await
                    .map_err(|_| PipelineError::timeout(timeout))??;

                self.complete(
                    document_id,
                    &notification.bucket,
                    &notification.key,
                    attempt_at,
                    result,
                    EVENT_OCR_COMPLETE,
                )
                .await
            }
            ProcessingMode::AsyncDetectText => {
                let timeout = self.config.async_start_timeout();
                let started = tokio::time::timeout(
                    timeout,
                    self.backend.start_text_detection(
                        &notification.bucket,
                        &notification.key,
                        &self.config.callback_subject,
                    ),
                )
                .await
                .map_err(|_| PipelineError::timeout(timeout))??;

                self.jobs
                    .put(
                        &started.job_id,
                        PendingJob {
                            document_id: document_id.to_string(),
                            bucket: notification.bucket.clone(),
                            object_key: notification.key.clone(),
                            started_at: attempt_at,
                        },
                    )
                    .await?;

                tracing::info!(
                    target: TRACING_TARGET_PIPELINE,
                    document_id = %document_id,
                    job_id = %started.job_id,
                    "Started asynchronous extraction, awaiting callback"
                );

                Ok(ProcessingReport {
                    document_id: document_id.to_string(),
                    mode,
                    status: DocumentStatus::Processing,
                    json_key: None,
                    job_id: Some(started.job_id),
                    text_line_count: 0,
                    mapped_field_count: 0,
                })
            }
        }
    }

    /// Tail of the state machine: artifact persistence, the `processed`
    /// transition, and best-effort field forwarding and notification.
    async fn complete(
        &self,
        document_id: &str,
        bucket: &str,
        object_key: &str,
        attempt_at: Timestamp,
        result: ExtractionResult,
        event_type: &str,
    ) -> Result<ProcessingReport> {
        let mut artifact = Artifact::new(document_id, result);
        if event_type == EVENT_OCR_COMPLETE_ASYNC {
            artifact.processor_version = format!("{PROCESSOR_VERSION}-async");
        }

        let disambiguator = Uuid::new_v4().simple().to_string();
        let json_key = format!("json/{document_id}_{}.json", &disambiguator[..8]);
        let body = serde_json::to_vec(&artifact).map_err(docmill_core::Error::from)?;
        self.objects
            .put_json(&self.config.artifact_bucket, &json_key, Bytes::from(body))
            .await?;

        let summary = OcrSummary {
            mode: artifact.result.mode,
            text_line_count: artifact.result.line_count(),
            average_confidence: artifact.result.average_confidence,
            processing_time_ms: artifact.result.processing_time_ms,
            json_key: json_key.clone(),
            job_id: artifact.result.job_id.clone(),
        };
        let applied = self
            .documents
            .apply(
                document_id,
                bucket,
                object_key,
                StatusUpdate::processed(attempt_at, summary),
            )
            .await?;
        if !applied {
            tracing::warn!(
                target: TRACING_TARGET_PIPELINE,
                document_id = %document_id,
                "A newer attempt already finished this document, keeping its result"
            );
        }

        let fields = map_fields(&artifact.result);
        if self.config.answer_forwarding
            && !fields.is_empty()
            && let Err(error) = self.answers.submit(document_id, &fields).await
        {
            let error = PipelineError::notification(error.to_string());
            tracing::warn!(
                target: TRACING_TARGET_PIPELINE,
                document_id = %document_id,
                error = %error,
                "Forwarding mapped fields failed"
            );
        }

        let event = OcrCompleteEvent {
            event_type: event_type.to_string(),
            document_id: document_id.to_string(),
            processing_mode: artifact.result.mode,
            text_blocks_found: artifact.result.line_count(),
            average_confidence: artifact.result.average_confidence,
            mapped_fields_count: fields.len(),
            mapped_fields: fields.names().map(str::to_owned).collect(),
            json_key: json_key.clone(),
            job_id: artifact.result.job_id.clone(),
            processing_time_ms: artifact.result.processing_time_ms,
            timestamp: Timestamp::now(),
        };
        if let Err(error) = self.events.publish(&event).await {
            let error = PipelineError::notification(error.to_string());
            tracing::warn!(
                target: TRACING_TARGET_PIPELINE,
                document_id = %document_id,
                error = %error,
                "Publishing completion event failed"
            );
        }

        tracing::info!(
            target: TRACING_TARGET_PIPELINE,
            document_id = %document_id,
            mode = %artifact.result.mode,
            text_line_count = artifact.result.line_count(),
            mapped_field_count = fields.len(),
            json_key = %json_key,
            "Document processed"
        );

        Ok(ProcessingReport {
            document_id: document_id.to_string(),
            mode: artifact.result.mode,
            status: DocumentStatus::Processed,
            json_key: Some(json_key),
            job_id: artifact.result.job_id,
            text_line_count: artifact.result.text_lines.len(),
            mapped_field_count: fields.len(),
        })
    }

    async fn mark_failed(
        &self,
        document_id: &str,
        bucket: &str,
        object_key: &str,
        attempt_at: Timestamp,
        error: &PipelineError,
    ) {
        tracing::error!(
            target: TRACING_TARGET_PIPELINE,
            document_id = %document_id,
            error = %error,
            retryable = error.is_retryable(),
            "Pipeline failed for document"
        );

        let update = StatusUpdate::failed(attempt_at, error.to_string());
        if let Err(store_error) = self
            .documents
            .apply(document_id, bucket, object_key, update)
            .await
        {
            tracing::error!(
                target: TRACING_TARGET_PIPELINE,
                document_id = %document_id,
                error = %store_error,
                "Recording failure state failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use docmill_core::TextLine;
    use docmill_ocr::StartedJob;

    use crate::memory::{
        MemoryAnswerSink, MemoryDocumentStore, MemoryEventPublisher, MemoryJobRegistry,
        MemoryObjectStore,
    };

    use super::*;

    const RAW_BUCKET: &str = "documents-raw";

    struct ScriptedBackend {
        lines: Vec<String>,
        key_value_pairs: BTreeMap<String, String>,
        delay: Option<Duration>,
        fail_sync: bool,
        detect_calls: AtomicUsize,
        analyze_calls: AtomicUsize,
        start_calls: AtomicUsize,
        fetch_calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn with_lines(lines: &[&str]) -> Self {
            Self {
                lines: lines.iter().map(|line| line.to_string()).collect(),
                key_value_pairs: BTreeMap::new(),
                delay: None,
                fail_sync: false,
                detect_calls: AtomicUsize::new(0),
                analyze_calls: AtomicUsize::new(0),
                start_calls: AtomicUsize::new(0),
                fetch_calls: AtomicUsize::new(0),
            }
        }

        fn result(&self, mode: ProcessingMode) -> ExtractionResult {
            let lines = self
                .lines
                .iter()
                .map(|line| TextLine::new(line, 92.0))
                .collect();
            ExtractionResult::from_lines(mode, lines)
                .with_key_value_pairs(self.key_value_pairs.clone())
                .with_processing_time(120)
        }

        fn backend_calls(&self) -> usize {
            self.detect_calls.load(Ordering::SeqCst)
                + self.analyze_calls.load(Ordering::SeqCst)
                + self.start_calls.load(Ordering::SeqCst)
                + self.fetch_calls.load(Ordering::SeqCst)
        }

        async fn simulate_latency(&self) -> docmill_ocr::Result<()> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_sync {
                return Err(docmill_ocr::Error::api_error(500, "backend exploded"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ExtractionBackend for ScriptedBackend {
        async fn detect_text(&self, _bucket: &str, _key: &str) -> docmill_ocr::Result<ExtractionResult> {
            self.detect_calls.fetch_add(1, Ordering::SeqCst);
            self.simulate_latency().await?;
            Ok(self.result(ProcessingMode::SyncDetectText))
        }

        async fn analyze_document(
            &self,
            _bucket: &str,
            _key: &str,
        ) -> docmill_ocr::Result<ExtractionResult> {
            self.analyze_calls.fetch_add(1, Ordering::SeqCst);
            self.simulate_latency().await?;
            Ok(self.result(ProcessingMode::SyncAnalyzeDocument))
        }

        async fn start_text_detection(
            &self,
            _bucket: &str,
            _key: &str,
            _notify_target: &str,
        ) -> docmill_ocr::Result<StartedJob> {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            Ok(StartedJob {
                job_id: "job-1".to_string(),
            })
        }

        async fn fetch_job_result(&self, job_id: &str) -> docmill_ocr::Result<ExtractionResult> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result(ProcessingMode::AsyncDetectText).with_job_id(job_id))
        }
    }

    struct Fixture {
        pipeline: OcrPipeline,
        backend: Arc<ScriptedBackend>,
        documents: Arc<MemoryDocumentStore>,
        objects: Arc<MemoryObjectStore>,
        answers: Arc<MemoryAnswerSink>,
        events: Arc<MemoryEventPublisher>,
        jobs: Arc<MemoryJobRegistry>,
        config: PipelineConfig,
    }

    fn fixture(backend: ScriptedBackend) -> Fixture {
        let backend = Arc::new(backend);
        let documents = Arc::new(MemoryDocumentStore::new());
        let objects = Arc::new(MemoryObjectStore::new());
        let answers = Arc::new(MemoryAnswerSink::new());
        let events = Arc::new(MemoryEventPublisher::new());
        let jobs = Arc::new(MemoryJobRegistry::new());
        let config = PipelineConfig::default();

        let pipeline = OcrPipeline::new(
            backend.clone(),
            documents.clone(),
            objects.clone(),
            answers.clone(),
            events.clone(),
            jobs.clone(),
            config.clone(),
        );

        Fixture {
            pipeline,
            backend,
            documents,
            objects,
            answers,
            events,
            jobs,
            config,
        }
    }

    fn passport_backend() -> ScriptedBackend {
        ScriptedBackend::with_lines(&["Passport Number: AB1234567", "Name: John Smith"])
    }

    #[tokio::test]
    async fn test_sync_image_happy_path() {
        let fx = fixture(passport_backend());
        let notification = UploadNotification::new(RAW_BUCKET, "raw/s1/doc-1/passport.jpg");
        fx.objects.insert_size(RAW_BUCKET, &notification.key, 1024).await;

        let report = fx.pipeline.process(&notification).await.unwrap();

        assert_eq!(report.document_id, "doc-1");
        assert_eq!(report.status, DocumentStatus::Processed);
        assert_eq!(report.mode, ProcessingMode::SyncDetectText);
        assert_eq!(report.text_line_count, 2);
        let json_key = report.json_key.unwrap();
        assert!(json_key.starts_with("json/doc-1_"));
        assert!(json_key.ends_with(".json"));

        assert_eq!(fx.backend.detect_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fx.backend.analyze_calls.load(Ordering::SeqCst), 0);

        // Artifact persisted under the configured bucket.
        let body = fx.objects.object(&fx.config.artifact_bucket, &json_key).await.unwrap();
        let artifact: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(artifact["document_id"], "doc-1");
        assert_eq!(artifact["processor_version"], "1.0");
        assert_eq!(artifact["mode"], "sync_detect_text");

        // Document record shows the summary.
        let record = fx.documents.get("doc-1").await.unwrap().unwrap();
        assert_eq!(record.status, DocumentStatus::Processed);
        assert_eq!(record.file_extension.as_deref(), Some("jpg"));
        assert_eq!(record.file_size_bytes, Some(1024));
        let summary = record.ocr_results.unwrap();
        assert_eq!(summary.json_key, json_key);
        assert_eq!(summary.text_line_count, 2);

        // Mapped fields forwarded and completion event published.
        let submissions = fx.answers.submissions().await;
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].0, "doc-1");
        assert!(submissions[0].1.get("passport_number").is_some());

        let events = fx.events.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EVENT_OCR_COMPLETE);
        assert!(events[0].mapped_fields.contains(&"passport_number".to_string()));
        assert_eq!(events[0].text_blocks_found, 2);
    }

    #[tokio::test]
    async fn test_sync_pdf_uses_document_analysis() {
        let mut backend = passport_backend();
        backend
            .key_value_pairs
            .insert("Program of Study".to_string(), "Data Science".to_string());
        let fx = fixture(backend);
        let notification = UploadNotification::new(RAW_BUCKET, "raw/s1/doc-2/loa.pdf");
        fx.objects.insert_size(RAW_BUCKET, &notification.key, 64 * 1024).await;

        let report = fx.pipeline.process(&notification).await.unwrap();

        assert_eq!(report.mode, ProcessingMode::SyncAnalyzeDocument);
        assert_eq!(fx.backend.analyze_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fx.backend.detect_calls.load(Ordering::SeqCst), 0);

        let submissions = fx.answers.submissions().await;
        let program = submissions[0].1.get("program_name").unwrap();
        assert_eq!(program.as_text(), Some("Data Science"));
    }

    #[tokio::test]
    async fn test_oversize_file_fails_without_backend_call() {
        let fx = fixture(passport_backend());
        let notification = UploadNotification::new(RAW_BUCKET, "raw/s1/doc-3/huge.pdf");
        fx.objects
            .insert_size(RAW_BUCKET, &notification.key, 12 * 1024 * 1024)
            .await;

        let error = fx.pipeline.process(&notification).await.unwrap_err();

        assert!(matches!(
            error,
            PipelineError::Document(docmill_core::Error::FileTooLarge { .. })
        ));
        assert!(!error.is_retryable());
        assert_eq!(fx.backend.backend_calls(), 0);

        let record = fx.documents.get("doc-3").await.unwrap().unwrap();
        assert_eq!(record.status, DocumentStatus::Failed);
        assert!(record.error.unwrap().contains("exceeds limit"));
    }

    #[tokio::test]
    async fn test_unsupported_extension_before_any_status_transition() {
        let fx = fixture(passport_backend());
        let notification = UploadNotification::new(RAW_BUCKET, "raw/s1/doc-4/essay.docx");
        fx.objects.insert_size(RAW_BUCKET, &notification.key, 1024).await;

        let error = fx.pipeline.process(&notification).await.unwrap_err();

        assert!(matches!(
            error,
            PipelineError::Document(docmill_core::Error::UnsupportedFormat { .. })
        ));
        assert_eq!(fx.backend.backend_calls(), 0);
        // No record was created at all.
        assert!(fx.documents.get("doc-4").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_size_is_a_soft_failure() {
        let fx = fixture(passport_backend());
        // No size registered: metadata lookup reports the object missing.
        let notification = UploadNotification::new(RAW_BUCKET, "raw/s1/doc-5/scan.jpg");

        let report = fx.pipeline.process(&notification).await.unwrap();

        assert_eq!(report.status, DocumentStatus::Processed);
        let record = fx.documents.get("doc-5").await.unwrap().unwrap();
        assert_eq!(record.file_size_bytes, None);
    }

    #[tokio::test]
    async fn test_metadata_store_error_is_soft_failure() {
        let fx = fixture(passport_backend());
        fx.objects.set_metadata_failing(true);
        let notification = UploadNotification::new(RAW_BUCKET, "raw/s1/doc-15/scan.jpg");

        let report = fx.pipeline.process(&notification).await.unwrap();

        assert_eq!(report.status, DocumentStatus::Processed);
        assert_eq!(fx.backend.detect_calls.load(Ordering::SeqCst), 1);
        let record = fx.documents.get("doc-15").await.unwrap().unwrap();
        assert_eq!(record.status, DocumentStatus::Processed);
        assert_eq!(record.file_size_bytes, None);
    }

    #[tokio::test]
    async fn test_async_start_and_resume() {
        let fx = fixture(passport_backend());
        let notification = UploadNotification::new(RAW_BUCKET, "raw/s1/doc-6/large.jpg");
        // Between the sync tier (5 MB) and the hard cap (10 MB).
        fx.objects
            .insert_size(RAW_BUCKET, &notification.key, 6 * 1024 * 1024)
            .await;

        let report = fx.pipeline.process(&notification).await.unwrap();

        assert_eq!(report.status, DocumentStatus::Processing);
        assert_eq!(report.mode, ProcessingMode::AsyncDetectText);
        assert_eq!(report.job_id.as_deref(), Some("job-1"));
        assert_eq!(fx.backend.start_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fx.jobs.len().await, 1);

        let record = fx.documents.get("doc-6").await.unwrap().unwrap();
        assert_eq!(record.status, DocumentStatus::Processing);

        let callback = JobCallback {
            job_id: "job-1".to_string(),
            status: JobStatus::Succeeded,
            message: None,
        };
        let report = fx.pipeline.resume(&callback).await.unwrap();

        assert_eq!(report.status, DocumentStatus::Processed);
        assert_eq!(report.job_id.as_deref(), Some("job-1"));
        assert_eq!(fx.backend.fetch_calls.load(Ordering::SeqCst), 1);
        assert!(fx.jobs.is_empty().await);

        let record = fx.documents.get("doc-6").await.unwrap().unwrap();
        assert_eq!(record.status, DocumentStatus::Processed);
        assert_eq!(record.ocr_results.unwrap().job_id.as_deref(), Some("job-1"));

        // Async completion carries its own event type and version suffix.
        let events = fx.events.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EVENT_OCR_COMPLETE_ASYNC);

        let json_key = report.json_key.unwrap();
        let body = fx.objects.object(&fx.config.artifact_bucket, &json_key).await.unwrap();
        let artifact: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(artifact["processor_version"], "1.0-async");
    }

    #[tokio::test]
    async fn test_resume_unknown_job_is_rejected() {
        let fx = fixture(passport_backend());
        let callback = JobCallback {
            job_id: "missing".to_string(),
            status: JobStatus::Succeeded,
            message: None,
        };

        let error = fx.pipeline.resume(&callback).await.unwrap_err();
        assert!(matches!(
            error,
            PipelineError::Document(docmill_core::Error::InvalidRequest { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_callback_marks_document_failed() {
        let fx = fixture(passport_backend());
        let notification = UploadNotification::new(RAW_BUCKET, "raw/s1/doc-7/large.jpg");
        fx.objects
            .insert_size(RAW_BUCKET, &notification.key, 6 * 1024 * 1024)
            .await;
        fx.pipeline.process(&notification).await.unwrap();

        let callback = JobCallback {
            job_id: "job-1".to_string(),
            status: JobStatus::Failed,
            message: Some("page limit exceeded".to_string()),
        };
        let error = fx.pipeline.resume(&callback).await.unwrap_err();

        assert!(matches!(error, PipelineError::Extraction(_)));
        let record = fx.documents.get("doc-7").await.unwrap().unwrap();
        assert_eq!(record.status, DocumentStatus::Failed);
        assert!(record.error.unwrap().contains("page limit exceeded"));
    }

    #[tokio::test]
    async fn test_backend_error_marks_document_failed() {
        let mut backend = passport_backend();
        backend.fail_sync = true;
        let fx = fixture(backend);
        let notification = UploadNotification::new(RAW_BUCKET, "raw/s1/doc-8/scan.jpg");
        fx.objects.insert_size(RAW_BUCKET, &notification.key, 1024).await;

        let error = fx.pipeline.process(&notification).await.unwrap_err();

        assert!(matches!(error, PipelineError::Extraction(_)));
        assert!(error.is_retryable());
        let record = fx.documents.get("doc-8").await.unwrap().unwrap();
        assert_eq!(record.status, DocumentStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_timeout_reaches_failed_state() {
        let mut backend = passport_backend();
        backend.delay = Some(Duration::from_secs(120));
        let fx = fixture(backend);
        let notification = UploadNotification::new(RAW_BUCKET, "raw/s1/doc-9/scan.jpg");
        fx.objects.insert_size(RAW_BUCKET, &notification.key, 1024).await;

        let error = fx.pipeline.process(&notification).await.unwrap_err();

        assert!(matches!(error, PipelineError::Timeout { .. }));
        assert!(error.is_retryable());
        let record = fx.documents.get("doc-9").await.unwrap().unwrap();
        assert_eq!(record.status, DocumentStatus::Failed);
    }

    #[tokio::test]
    async fn test_best_effort_forwarding_never_reverts_processed() {
        let fx = fixture(passport_backend());
        fx.answers.set_failing(true);
        fx.events.set_failing(true);
        let notification = UploadNotification::new(RAW_BUCKET, "raw/s1/doc-10/scan.jpg");
        fx.objects.insert_size(RAW_BUCKET, &notification.key, 1024).await;

        let report = fx.pipeline.process(&notification).await.unwrap();

        assert_eq!(report.status, DocumentStatus::Processed);
        let record = fx.documents.get("doc-10").await.unwrap().unwrap();
        assert_eq!(record.status, DocumentStatus::Processed);
    }

    #[tokio::test]
    async fn test_reprocessing_is_idempotent() {
        let fx = fixture(passport_backend());
        let notification = UploadNotification::new(RAW_BUCKET, "raw/s1/doc-11/scan.jpg");
        fx.objects.insert_size(RAW_BUCKET, &notification.key, 1024).await;

        let first = fx.pipeline.process(&notification).await.unwrap();
        let second = fx.pipeline.process(&notification).await.unwrap();

        assert_eq!(first.status, DocumentStatus::Processed);
        assert_eq!(second.status, DocumentStatus::Processed);
        assert_eq!(first.text_line_count, second.text_line_count);

        // The record reflects the latest attempt's artifact.
        let record = fx.documents.get("doc-11").await.unwrap().unwrap();
        assert_eq!(record.status, DocumentStatus::Processed);
        assert_eq!(record.ocr_results.unwrap().json_key, second.json_key.unwrap());
    }

    #[tokio::test]
    async fn test_stale_callback_cannot_clobber_newer_result() {
        let fx = fixture(passport_backend());
        let notification = UploadNotification::new(RAW_BUCKET, "raw/s1/doc-12/scan.jpg");
        fx.objects.insert_size(RAW_BUCKET, &notification.key, 1024).await;
        let current = fx.pipeline.process(&notification).await.unwrap();

        // A callback for a job started long before the attempt that just
        // finished must not overwrite its result.
        let stale_start = Timestamp::now() - jiff::SignedDuration::from_secs(3600);
        fx.jobs
            .put(
                "job-stale",
                PendingJob {
                    document_id: "doc-12".to_string(),
                    bucket: RAW_BUCKET.to_string(),
                    object_key: notification.key.clone(),
                    started_at: stale_start,
                },
            )
            .await
            .unwrap();
        let callback = JobCallback {
            job_id: "job-stale".to_string(),
            status: JobStatus::Succeeded,
            message: None,
        };
        fx.pipeline.resume(&callback).await.unwrap();

        let record = fx.documents.get("doc-12").await.unwrap().unwrap();
        assert_eq!(record.status, DocumentStatus::Processed);
        assert_eq!(record.ocr_results.unwrap().json_key, current.json_key.unwrap());
    }

    #[tokio::test]
    async fn test_handle_batch_reports_items_independently() {
        let fx = fixture(passport_backend());
        fx.objects
            .insert_size(RAW_BUCKET, "raw/s1/doc-13/scan.jpg", 1024)
            .await;

        let payload = serde_json::json!({
            "records": [
                {"bucket": {"name": RAW_BUCKET}, "object": {"key": "raw/s1/doc-13/scan.jpg"}},
                {"bucket": {"name": RAW_BUCKET}, "object": {"key": "raw/s1/doc-14/essay.docx"}}
            ]
        });
        let response = fx.pipeline.handle_batch(&payload).await;

        assert!(response.ok);
        assert_eq!(response.items.len(), 2);
        assert!(matches!(
            &response.items[0],
            ItemOutcome::Processed { document_id, .. } if document_id == "doc-13"
        ));
        match &response.items[1] {
            ItemOutcome::Failed {
                document_id,
                error,
                retryable,
            } => {
                assert_eq!(document_id, "doc-14");
                assert!(!retryable);
                // Rejections surface the user-facing phrasing.
                assert!(error.contains("Unsupported file format 'docx'"));
                assert!(error.contains("Please use one of:"));
            }
            other => panic!("expected a failed item, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_handle_batch_rejects_malformed_payload() {
        let fx = fixture(passport_backend());
        let response = fx.pipeline.handle_batch(&serde_json::json!(42)).await;

        assert!(!response.ok);
        assert!(response.error.unwrap().contains("Invalid request"));
        assert!(response.items.is_empty());
    }
}

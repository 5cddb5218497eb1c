//! Pipeline configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use docmill_core::DEFAULT_MAX_SYNC_BYTES;

/// Default bucket for persisted JSON artifacts.
pub const DEFAULT_ARTIFACT_BUCKET: &str = "documents-json";

/// Default hard cap on processable file size (10 MB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Default time budget for synchronous extraction calls.
pub const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 30;

/// Default time budget for starting an asynchronous job.
pub const DEFAULT_ASYNC_START_TIMEOUT_SECS: u64 = 10;

/// Default subject on which asynchronous job callbacks are delivered.
pub const DEFAULT_CALLBACK_SUBJECT: &str = "docmill.jobs.callback";

/// Complete pipeline configuration.
///
/// This is the main configuration type passed to [`OcrPipeline::new`].
///
/// [`OcrPipeline::new`]: crate::OcrPipeline::new
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct PipelineConfig {
    /// Bucket receiving JSON artifacts.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "pipeline-artifact-bucket",
            env = "PIPELINE_ARTIFACT_BUCKET",
            default_value = DEFAULT_ARTIFACT_BUCKET
        )
    )]
    #[serde(default = "default_artifact_bucket")]
    pub artifact_bucket: String,

    /// Hard cap on processable file size in bytes; larger uploads fail with
    /// a size rejection before any backend call.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "pipeline-max-file-bytes",
            env = "PIPELINE_MAX_FILE_BYTES",
            default_value_t = DEFAULT_MAX_FILE_BYTES
        )
    )]
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Size tier below which documents are extracted synchronously.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "pipeline-max-sync-bytes",
            env = "PIPELINE_MAX_SYNC_BYTES",
            default_value_t = DEFAULT_MAX_SYNC_BYTES
        )
    )]
    #[serde(default = "default_max_sync_bytes")]
    pub max_sync_bytes: u64,

    /// Time budget for a synchronous extraction call, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "pipeline-sync-timeout-secs",
            env = "PIPELINE_SYNC_TIMEOUT_SECS",
            default_value_t = DEFAULT_SYNC_TIMEOUT_SECS
        )
    )]
    #[serde(default = "default_sync_timeout_secs")]
    pub sync_timeout_secs: u64,

    /// Time budget for starting an asynchronous job, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "pipeline-async-start-timeout-secs",
            env = "PIPELINE_ASYNC_START_TIMEOUT_SECS",
            default_value_t = DEFAULT_ASYNC_START_TIMEOUT_SECS
        )
    )]
    #[serde(default = "default_async_start_timeout_secs")]
    pub async_start_timeout_secs: u64,

    /// Subject for completion notifications; unset disables publishing.
    #[cfg_attr(
        feature = "config",
        arg(long = "pipeline-notify-subject", env = "PIPELINE_NOTIFY_SUBJECT")
    )]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_subject: Option<String>,

    /// Callback target handed to the backend when starting asynchronous
    /// jobs.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "pipeline-callback-subject",
            env = "PIPELINE_CALLBACK_SUBJECT",
            default_value = DEFAULT_CALLBACK_SUBJECT
        )
    )]
    #[serde(default = "default_callback_subject")]
    pub callback_subject: String,

    /// Whether mapped fields are forwarded to the answer sink.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "pipeline-answer-forwarding",
            env = "PIPELINE_ANSWER_FORWARDING",
            default_value_t = true
        )
    )]
    #[serde(default = "default_answer_forwarding")]
    pub answer_forwarding: bool,
}

fn default_artifact_bucket() -> String {
    DEFAULT_ARTIFACT_BUCKET.to_string()
}

fn default_max_file_bytes() -> u64 {
    DEFAULT_MAX_FILE_BYTES
}

fn default_max_sync_bytes() -> u64 {
    DEFAULT_MAX_SYNC_BYTES
}

fn default_sync_timeout_secs() -> u64 {
    DEFAULT_SYNC_TIMEOUT_SECS
}

fn default_async_start_timeout_secs() -> u64 {
    DEFAULT_ASYNC_START_TIMEOUT_SECS
}

fn default_callback_subject() -> String {
    DEFAULT_CALLBACK_SUBJECT.to_string()
}

fn default_answer_forwarding() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            artifact_bucket: default_artifact_bucket(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_sync_bytes: DEFAULT_MAX_SYNC_BYTES,
            sync_timeout_secs: DEFAULT_SYNC_TIMEOUT_SECS,
            async_start_timeout_secs: DEFAULT_ASYNC_START_TIMEOUT_SECS,
            notify_subject: None,
            callback_subject: default_callback_subject(),
            answer_forwarding: true,
        }
    }
}

impl PipelineConfig {
    /// Time budget for a synchronous extraction call.
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(self.sync_timeout_secs)
    }

    /// Time budget for starting an asynchronous job.
    pub fn async_start_timeout(&self) -> Duration {
        Duration::from_secs(self.async_start_timeout_secs)
    }
}

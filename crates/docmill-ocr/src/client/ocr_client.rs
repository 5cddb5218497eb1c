//! Extraction client implementation
//!
//! This module provides the main client interface for the remote extraction
//! service. It handles authentication, request/response processing, and
//! connection management.

use reqwest::{Client as HttpClient, ClientBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{OcrConfig, OcrCredentials};
use crate::TRACING_TARGET_CLIENT;
use crate::block::Block;
use crate::error::{Error, Result};

/// Client for the remote text/structure extraction service.
///
/// # Examples
///
/// ```rust,ignore
/// use docmill_ocr::{OcrClient, OcrConfig, OcrCredentials};
/// use std::time::Duration;
///
/// let config = OcrConfig::builder()
///     .with_base_url("https://extract.example.com/v1")?
///     .with_timeout(Duration::from_secs(30))
///     .build()?;
///
/// let credentials = OcrCredentials::api_key("your-api-key");
/// let client = OcrClient::new(config, credentials)?;
/// ```
#[derive(Debug, Clone)]
pub struct OcrClient {
    http_client: HttpClient,
    config: OcrConfig,
    credentials: OcrCredentials,
}

/// Block list returned by a synchronous extraction call.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct BlocksResponse {
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Acknowledgement of a started asynchronous job.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JobStartResponse {
    pub job_id: String,
}

/// One page of an asynchronous job's results.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JobResultsPage {
    pub job_status: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct ObjectRef<'a> {
    bucket: &'a str,
    key: &'a str,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    bucket: &'a str,
    key: &'a str,
    features: &'a [&'a str],
}

#[derive(Debug, Serialize)]
struct StartJobRequest<'a> {
    bucket: &'a str,
    key: &'a str,
    notify_target: &'a str,
}

impl OcrClient {
    /// Create a new extraction client with the given configuration and
    /// credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: OcrConfig, credentials: OcrCredentials) -> Result<Self> {
        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            base_url = %config.base_url,
            "Creating extraction client"
        );

        let http_client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            http_client,
            config,
            credentials,
        })
    }

    /// Create a new extraction client with default configuration.
    pub fn with_defaults(
        base_url: impl AsRef<str>,
        credentials: OcrCredentials,
    ) -> Result<Self> {
        let config = OcrConfig::builder()
            .with_base_url(base_url.as_ref())?
            .build()?;

        Self::new(config, credentials)
    }

    /// Perform a health check against the extraction service.
    pub async fn health_check(&self) -> Result<()> {
        let url = self.endpoint(&["health"])?;
        let request = self.add_auth_headers(self.http_client.get(url));
        let response = request.send().await.map_err(Error::Http)?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(Error::api_error(status, message))
        }
    }

    /// Synchronous line-level text detection for an object in storage.
    pub(crate) async fn detect_text_blocks(&self, bucket: &str, key: &str) -> Result<BlocksResponse> {
        let url = self.endpoint(&["text", "detect"])?;
        self.post_json(url, &ObjectRef { bucket, key }).await
    }

    /// Synchronous document analysis with form and table extraction.
    pub(crate) async fn analyze_document_blocks(&self, bucket: &str, key: &str) -> Result<BlocksResponse> {
        let url = self.endpoint(&["documents", "analyze"])?;
        let request = AnalyzeRequest {
            bucket,
            key,
            features: &["forms", "tables"],
        };
        self.post_json(url, &request).await
    }

    /// Starts an asynchronous text detection job, registering a callback
    /// notification target. Returns immediately with the job id.
    pub(crate) async fn start_detection_job(
        &self,
        bucket: &str,
        key: &str,
        notify_target: &str,
    ) -> Result<JobStartResponse> {
        let url = self.endpoint(&["text", "detect", "jobs"])?;
        let request = StartJobRequest {
            bucket,
            key,
            notify_target,
        };
        self.post_json(url, &request).await
    }

    /// Fetches all blocks of a completed asynchronous job, following
    /// pagination tokens until exhausted.
    pub(crate) async fn fetch_job_blocks(&self, job_id: &str) -> Result<Vec<Block>> {
        let mut all_blocks = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut url = self.endpoint(&["text", "detect", "jobs", job_id])?;
            if let Some(token) = &next_token {
                url.query_pairs_mut().append_pair("next_token", token);
            }

            let request = self.add_auth_headers(self.http_client.get(url));
            let response = request.send().await.map_err(Error::Http)?;
            let page: JobResultsPage = self.decode(response).await?;

            if page.job_status.eq_ignore_ascii_case("failed") {
                return Err(Error::job_failed(job_id, "backend reported job failure"));
            }

            all_blocks.extend(page.blocks);
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            job_id = %job_id,
            block_count = all_blocks.len(),
            "Fetched asynchronous job results"
        );

        Ok(all_blocks)
    }

    /// Get the client configuration.
    pub fn config(&self) -> &OcrConfig {
        &self.config
    }

    /// Builds an endpoint URL under the configured base path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::invalid_config("Base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// POSTs a JSON body, retrying transient failures up to the configured
    /// attempt budget with the error's suggested backoff.
    async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T>
    where
        B: Serialize,
        T: for<'de> Deserialize<'de>,
    {
        let mut attempt = 0;
        loop {
            let request = self
                .add_auth_headers(self.http_client.post(url.clone()))
                .json(body);
            let outcome = match request.send().await.map_err(Error::Http) {
                Ok(response) => self.decode(response).await,
                Err(error) => Err(error),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = error
                        .retry_delay()
                        .unwrap_or_else(|| std::time::Duration::from_millis(500));
                    tracing::warn!(
                        target: TRACING_TARGET_CLIENT,
                        attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying extraction API call"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn decode<T>(&self, response: reqwest::Response) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        if response.status().is_success() {
            response.json::<T>().await.map_err(Error::Http)
        } else {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            tracing::error!(
                target: TRACING_TARGET_CLIENT,
                status,
                message,
                "Extraction API call failed"
            );

            Err(Error::api_error(status, message))
        }
    }

    /// Add authentication headers to a request.
    fn add_auth_headers(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            OcrCredentials::ApiKey(key) => request.header("X-API-Key", key),
            OcrCredentials::BearerToken(token) => {
                request.header("Authorization", format!("Bearer {}", token))
            }
            OcrCredentials::None => request,
        }
    }
}

//! Extraction client configuration
//!
//! This module provides configuration structures and builders for the
//! extraction service client.

use std::time::Duration;

use derive_builder::Builder;
use url::Url;

use crate::error::{Error, Result};

/// Configuration for the extraction service client
///
/// Contains the settings needed to configure client behavior, including
/// timeouts and API endpoints.
#[derive(Debug, Clone, Builder)]
#[builder(
    name = "OcrBuilder",
    pattern = "owned",
    setter(into, strip_option, prefix = "with"),
    build_fn(validate = "Self::validate_config")
)]
pub struct OcrConfig {
    /// Base URL for the extraction API
    #[builder(setter(custom), default = "OcrConfig::default_base_url()")]
    pub base_url: Url,
    /// Request timeout duration
    #[builder(default = "Duration::from_secs(30)")]
    pub timeout: Duration,
    /// Connection timeout duration
    #[builder(default = "Duration::from_secs(10)")]
    pub connect_timeout: Duration,
    /// Maximum number of retry attempts
    #[builder(default = "3")]
    pub max_retries: u32,
    /// User agent string for requests
    #[builder(default = "OcrConfig::default_user_agent()")]
    pub user_agent: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_retries: 3,
            user_agent: Self::default_user_agent(),
        }
    }
}

impl OcrConfig {
    /// Create a new configuration builder
    pub fn builder() -> OcrBuilder {
        OcrBuilder::default()
    }

    fn default_base_url() -> Url {
        "https://extract.docmill.dev/v1".parse().expect("Valid default URL")
    }

    fn default_user_agent() -> String {
        format!("docmill-ocr/{}", env!("CARGO_PKG_VERSION"))
    }
}

impl OcrBuilder {
    /// Set the base URL for the extraction API
    pub fn with_base_url(mut self, url: &str) -> Result<Self> {
        self.base_url =
            Some(url.parse().map_err(|e| {
                Error::invalid_config(format!("Invalid base URL '{}': {}", url, e))
            })?);
        Ok(self)
    }

    fn validate_config(&self) -> std::result::Result<(), String> {
        if let Some(timeout) = &self.timeout {
            if timeout.as_secs() == 0 {
                return Err("Timeout must be greater than 0".to_string());
            }
        }

        if let Some(connect_timeout) = &self.connect_timeout {
            if connect_timeout.as_secs() == 0 {
                return Err("Connect timeout must be greater than 0".to_string());
            }
        }

        Ok(())
    }
}

//! Authentication credentials
//!
//! This module provides authentication credential types and constructors for
//! the extraction service client.

/// Authentication credentials for the extraction service
#[derive(Debug, Clone)]
pub enum OcrCredentials {
    /// API key authentication
    ApiKey(String),
    /// Bearer token authentication
    BearerToken(String),
    /// No authentication (for testing/development)
    None,
}

impl OcrCredentials {
    /// Create API key credentials
    pub fn api_key(key: impl Into<String>) -> Self {
        Self::ApiKey(key.into())
    }

    /// Create bearer token credentials
    pub fn bearer_token(token: impl Into<String>) -> Self {
        Self::BearerToken(token.into())
    }

    /// Create credentials with no authentication
    pub fn none() -> Self {
        Self::None
    }
}

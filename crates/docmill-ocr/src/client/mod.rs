//! Extraction service client.

mod config;
mod credentials;
mod ocr_client;

pub use config::{OcrBuilder, OcrBuilderError, OcrConfig};
pub use credentials::OcrCredentials;
pub use ocr_client::OcrClient;

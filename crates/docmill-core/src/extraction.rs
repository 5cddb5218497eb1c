//! Normalized extraction results.
//!
//! The extraction backend returns engine-specific block graphs; this module
//! defines the uniform [`ExtractionResult`] every backend call is reduced to
//! before field mapping and persistence, along with the durable [`Artifact`]
//! written for each processed document.

use std::collections::BTreeMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Version tag recorded on every persisted artifact.
pub const PROCESSOR_VERSION: &str = "1.0";

/// Extraction strategy selected for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProcessingMode {
    /// Synchronous line-level text detection (images).
    SyncDetectText,
    /// Synchronous document analysis with form key/value extraction (PDFs).
    SyncAnalyzeDocument,
    /// Asynchronous text detection for large documents; completion arrives
    /// via a separate callback.
    AsyncDetectText,
}

/// Axis-aligned position of a recognized line, normalized to page size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// One recognized line of text with its confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    /// Recognized text content.
    pub text: String,
    /// Recognition confidence in the 0-100 range.
    pub confidence: f64,
    /// Position of the line on the page, when the backend reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<BoundingBox>,
}

impl TextLine {
    /// Creates a text line without geometry.
    pub fn new(text: impl Into<String>, confidence: f64) -> Self {
        Self {
            text: text.into(),
            confidence,
            geometry: None,
        }
    }
}

/// Normalized output of one extraction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Strategy that produced this result.
    pub mode: ProcessingMode,

    /// Recognized lines in backend reading order.
    pub text_lines: Vec<TextLine>,

    /// Detected form key/value pairs (analyze-document mode only).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub key_value_pairs: BTreeMap<String, String>,

    /// Arithmetic mean of line confidences; `0.0` when no lines were
    /// extracted.
    pub average_confidence: f64,

    /// Wall-clock duration of the backend call in milliseconds.
    pub processing_time_ms: u64,

    /// Backend request id for traceability, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Backend job id for asynchronous runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

impl ExtractionResult {
    /// Creates a result from recognized lines, computing the average
    /// confidence.
    pub fn from_lines(mode: ProcessingMode, text_lines: Vec<TextLine>) -> Self {
        let average_confidence = average_confidence(&text_lines);
        Self {
            mode,
            text_lines,
            key_value_pairs: BTreeMap::new(),
            average_confidence,
            processing_time_ms: 0,
            request_id: None,
            job_id: None,
        }
    }

    /// Sets detected key/value pairs.
    pub fn with_key_value_pairs(mut self, pairs: BTreeMap<String, String>) -> Self {
        self.key_value_pairs = pairs;
        self
    }

    /// Sets the measured backend call duration.
    pub fn with_processing_time(mut self, processing_time_ms: u64) -> Self {
        self.processing_time_ms = processing_time_ms;
        self
    }

    /// Sets the backend request id.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Sets the backend job id.
    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    /// Number of recognized lines.
    pub fn line_count(&self) -> usize {
        self.text_lines.len()
    }

    /// All recognized text joined with single spaces, in reading order.
    ///
    /// Case is preserved for display; matching against this text is done
    /// case-insensitively by the field mapper.
    pub fn full_text(&self) -> String {
        self.text_lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Mean of line confidences, or `0.0` for an empty set.
fn average_confidence(lines: &[TextLine]) -> f64 {
    if lines.is_empty() {
        return 0.0;
    }
    lines.iter().map(|line| line.confidence).sum::<f64>() / lines.len() as f64
}

/// Durable JSON record of one document's extraction result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Document this artifact belongs to.
    pub document_id: String,

    /// When the extraction completed.
    pub processed_at: Timestamp,

    /// Version of the processing pipeline that produced this artifact.
    pub processor_version: String,

    /// The normalized extraction result.
    #[serde(flatten)]
    pub result: ExtractionResult,
}

impl Artifact {
    /// Creates an artifact for a document, stamped with the current time and
    /// processor version.
    pub fn new(document_id: impl Into<String>, result: ExtractionResult) -> Self {
        Self {
            document_id: document_id.into(),
            processed_at: Timestamp::now(),
            processor_version: PROCESSOR_VERSION.to_string(),
            result,
        }
    }
}

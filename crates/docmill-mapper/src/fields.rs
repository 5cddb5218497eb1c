//! Mapped field names and value types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Canonical field names produced by the mapper.
pub mod names {
    pub const PASSPORT_NUMBER: &str = "passport_number";
    pub const FULL_NAME: &str = "full_name";
    pub const DATE_OF_BIRTH: &str = "date_of_birth";
    pub const NATIONALITY: &str = "nationality";
    pub const IELTS_SCORES: &str = "ielts_scores";
    pub const INSTITUTION_NAME: &str = "institution_name";
    pub const PROGRAM_NAME: &str = "program_name";
    pub const GIC_AMOUNT: &str = "gic_amount";
    pub const TUITION_AMOUNT: &str = "tuition_amount";
}

/// Value of a single mapped field.
///
/// Serialized untagged so the artifact reads as plain JSON: strings for
/// textual fields, numbers for amounts, an object for sub-score maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Textual field such as a name or passport number.
    Text(String),
    /// Skill-keyed sub-scores, e.g. IELTS bands.
    Scores(BTreeMap<String, f64>),
    /// Monetary amount with separators already stripped.
    Amount(f64),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn amount(value: f64) -> Self {
        Self::Amount(value)
    }

    /// The textual payload, if this is a text field.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// The numeric payload, if this is an amount field.
    pub fn as_amount(&self) -> Option<f64> {
        match self {
            Self::Amount(value) => Some(*value),
            _ => None,
        }
    }

    /// The sub-score map, if this is a scores field.
    pub fn as_scores(&self) -> Option<&BTreeMap<String, f64>> {
        match self {
            Self::Scores(scores) => Some(scores),
            _ => None,
        }
    }
}

/// Fields derived from one document's extraction result.
///
/// Fields with no match are absent from the map, never present with an
/// empty value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappedFields(BTreeMap<String, FieldValue>);

impl MappedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts the value under `name` if one was extracted.
    pub fn insert_opt(&mut self, name: &str, value: Option<FieldValue>) {
        if let Some(value) = value {
            self.0.insert(name.to_owned(), value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    /// Names of all fields that were extracted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }
}

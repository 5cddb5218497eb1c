//! Heuristic field extractors.
//!
//! Each extractor is a pure function over the full concatenated document
//! text and the detected form key/value pairs. Extractors run in a fixed
//! order and are independent of each other; a field with no match is simply
//! absent from the output.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use docmill_core::ExtractionResult;

use crate::TRACING_TARGET;
use crate::fields::{FieldValue, MappedFields, names};

type Extractor = fn(&str, &BTreeMap<String, String>) -> Option<FieldValue>;

/// Registry of extractors, run in this order.
const REGISTRY: &[(&str, Extractor)] = &[
    (names::PASSPORT_NUMBER, extract_passport_number),
    (names::FULL_NAME, extract_full_name),
    (names::DATE_OF_BIRTH, extract_date_of_birth),
    (names::NATIONALITY, extract_nationality),
    (names::IELTS_SCORES, extract_ielts_scores),
    (names::INSTITUTION_NAME, extract_institution_name),
    (names::PROGRAM_NAME, extract_program_name),
    (names::GIC_AMOUNT, extract_gic_amount),
    (names::TUITION_AMOUNT, extract_tuition_amount),
];

/// Maps an extraction result to structured application fields.
pub fn map_fields(result: &ExtractionResult) -> MappedFields {
    let text = result.full_text();
    let mut fields = MappedFields::new();

    for (name, extractor) in REGISTRY {
        fields.insert_opt(name, extractor(&text, &result.key_value_pairs));
    }

    tracing::info!(
        target: TRACING_TARGET,
        field_count = fields.len(),
        "Mapped fields from extraction result"
    );

    fields
}

static PASSPORT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)passport\s*(?:no|number|#)?\s*:?\s*([A-Z0-9]{6,9})",
        r"(?i)passport\s*([A-Z0-9]{6,9})",
        r"(?i)([A-Z]{1,2}[0-9]{6,8})",
    ])
});

static NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)name\s*:?\s*([A-Za-z\s]{2,50})",
        r"(?i)applicant\s*:?\s*([A-Za-z\s]{2,50})",
        r"(?i)student\s*:?\s*([A-Za-z\s]{2,50})",
    ])
});

static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)(?:date\s*of\s*birth|dob|birth\s*date)\s*:?\s*(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})",
        r"(?i)(?:born|birth)\s*:?\s*(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})",
        r"(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})",
    ])
});

static IELTS_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    ["listening", "reading", "writing", "speaking", "overall"]
        .into_iter()
        .map(|skill| {
            let pattern = format!(r"(?i){skill}\s*:?\s*(\d+\.?\d*)");
            (skill, compile_one(&pattern))
        })
        .collect()
});

static INSTITUTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)(?:university|college|institute|school)\s*(?:of|at)?\s*([A-Za-z\s]{2,50})",
        r"(?i)([A-Za-z\s]{2,50})\s*(?:university|college|institute)",
    ])
});

static GIC_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)gic\s*(?:amount)?\s*:?\s*(?:cad|can\$|\$)?\s*(\d+(?:,\d{3})*(?:\.\d{2})?)",
        r"(?i)guaranteed\s*investment\s*certificate\s*:?\s*(?:cad|can\$|\$)?\s*(\d+(?:,\d{3})*(?:\.\d{2})?)",
    ])
});

static TUITION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)tuition\s*(?:fee|fees)?\s*:?\s*(?:cad|can\$|\$)?\s*(\d+(?:,\d{3})*(?:\.\d{2})?)",
        r"(?i)program\s*fee\s*:?\s*(?:cad|can\$|\$)?\s*(\d+(?:,\d{3})*(?:\.\d{2})?)",
    ])
});

const DEMONYMS: &[&str] = &[
    "indian",
    "chinese",
    "canadian",
    "american",
    "british",
    "australian",
    "german",
    "french",
];

fn extract_passport_number(text: &str, pairs: &BTreeMap<String, String>) -> Option<FieldValue> {
    if let Some(value) = lookup(
        pairs,
        |key| key.contains("passport") && key.contains("number"),
        any_value,
    ) {
        return Some(FieldValue::text(value.to_uppercase()));
    }

    first_capture(&PASSPORT_PATTERNS, text).map(|value| FieldValue::text(value.to_uppercase()))
}

fn extract_full_name(text: &str, pairs: &BTreeMap<String, String>) -> Option<FieldValue> {
    let value = lookup(
        pairs,
        |key| ["name", "applicant", "student"].iter().any(|word| key.contains(word)),
        |value| value.split_whitespace().count() >= 2,
    );
    if let Some(value) = value {
        return Some(FieldValue::text(title_case(&value)));
    }

    for pattern in NAME_PATTERNS.iter() {
        if let Some(capture) = pattern.captures(text) {
            let name = title_case(capture[1].trim());
            if name.split_whitespace().count() >= 2 {
                return Some(FieldValue::text(name));
            }
        }
    }

    None
}

fn extract_date_of_birth(text: &str, pairs: &BTreeMap<String, String>) -> Option<FieldValue> {
    if let Some(value) = lookup(pairs, |key| key.contains("birth") || key.contains("dob"), any_value)
    {
        return Some(FieldValue::text(value));
    }

    // Returned as the literal matched substring; no calendar validation or
    // reformatting happens at this layer.
    first_capture(&DATE_PATTERNS, text).map(FieldValue::text)
}

fn extract_nationality(text: &str, pairs: &BTreeMap<String, String>) -> Option<FieldValue> {
    if let Some(value) = lookup(
        pairs,
        |key| key.contains("nationality") || key.contains("country"),
        any_value,
    ) {
        return Some(FieldValue::text(value));
    }

    let lowered = text.to_lowercase();
    DEMONYMS
        .iter()
        .find(|demonym| lowered.contains(*demonym))
        .map(|demonym| FieldValue::text(title_case(demonym)))
}

fn extract_ielts_scores(text: &str, _pairs: &BTreeMap<String, String>) -> Option<FieldValue> {
    let mut scores = BTreeMap::new();

    for (skill, pattern) in IELTS_PATTERNS.iter() {
        if let Some(capture) = pattern.captures(text)
            && let Ok(score) = capture[1].parse::<f64>()
        {
            scores.insert((*skill).to_owned(), score);
        }
    }

    if scores.is_empty() {
        None
    } else {
        Some(FieldValue::Scores(scores))
    }
}

fn extract_institution_name(text: &str, pairs: &BTreeMap<String, String>) -> Option<FieldValue> {
    let value = lookup(
        pairs,
        |key| {
            ["institution", "university", "college", "school"]
                .iter()
                .any(|word| key.contains(word))
        },
        any_value,
    );
    if let Some(value) = value {
        return Some(FieldValue::text(value));
    }

    first_capture(&INSTITUTION_PATTERNS, text)
        .map(|value| FieldValue::text(title_case(value.trim())))
}

fn extract_program_name(_text: &str, pairs: &BTreeMap<String, String>) -> Option<FieldValue> {
    lookup(
        pairs,
        |key| {
            ["program", "course", "degree", "major"]
                .iter()
                .any(|word| key.contains(word))
        },
        any_value,
    )
    .map(FieldValue::text)
}

fn extract_gic_amount(text: &str, _pairs: &BTreeMap<String, String>) -> Option<FieldValue> {
    first_amount(&GIC_PATTERNS, text)
}

fn extract_tuition_amount(text: &str, _pairs: &BTreeMap<String, String>) -> Option<FieldValue> {
    first_amount(&TUITION_PATTERNS, text)
}

/// First key/value pair whose lower-cased key satisfies `key_predicate` and
/// whose trimmed, non-empty value satisfies `value_predicate`. Pairs whose
/// value fails the check do not stop the scan.
fn lookup(
    pairs: &BTreeMap<String, String>,
    key_predicate: impl Fn(&str) -> bool,
    value_predicate: impl Fn(&str) -> bool,
) -> Option<String> {
    pairs
        .iter()
        .map(|(key, value)| (key, value.trim()))
        .find(|(key, value)| {
            key_predicate(&key.to_lowercase()) && !value.is_empty() && value_predicate(value)
        })
        .map(|(_, value)| value.to_owned())
}

fn any_value(_value: &str) -> bool {
    true
}

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|pattern| pattern.captures(text).map(|capture| capture[1].to_owned()))
}

/// First labeled monetary match, with thousands separators stripped. A
/// match that fails numeric parsing counts as no match.
fn first_amount(patterns: &[Regex], text: &str) -> Option<FieldValue> {
    patterns.iter().find_map(|pattern| {
        let capture = pattern.captures(text)?;
        capture[1].replace(',', "").parse::<f64>().ok().map(FieldValue::Amount)
    })
}

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|pattern| compile_one(pattern)).collect()
}

fn compile_one(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Valid extractor pattern")
}

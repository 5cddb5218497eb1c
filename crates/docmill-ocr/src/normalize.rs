//! Normalization of backend block graphs into [`ExtractionResult`]s.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use docmill_core::{ExtractionResult, ProcessingMode, TextLine};

use crate::block::{Block, BlockType, EntityType, RelationshipType};

/// Extracts recognized lines from a block list, preserving backend reading
/// order.
pub fn text_lines(blocks: &[Block]) -> Vec<TextLine> {
    blocks
        .iter()
        .filter(|block| block.block_type == BlockType::Line)
        .map(|block| TextLine {
            text: block.text.clone().unwrap_or_default(),
            confidence: block.confidence.unwrap_or(0.0),
            geometry: block.geometry,
        })
        .collect()
}

/// Resolves form key/value pairs from the block relationship graph.
///
/// For each key/value set block tagged as a key, the key string is assembled
/// from its child word blocks joined with single spaces; the paired value
/// block is resolved through the value relationship and assembled the same
/// way. A pair is recorded only when both sides are non-empty.
pub fn key_value_pairs(blocks: &[Block]) -> BTreeMap<String, String> {
    let by_id: HashMap<&str, &Block> = blocks.iter().map(|b| (b.id.as_str(), b)).collect();

    let mut pairs = BTreeMap::new();
    for block in blocks {
        if block.block_type != BlockType::KeyValueSet || !block.has_entity_type(EntityType::Key) {
            continue;
        }

        let key_text = child_text(block, &by_id);
        if key_text.is_empty() {
            continue;
        }

        let value_text = block
            .related_ids(RelationshipType::Value)
            .filter_map(|id| by_id.get(id))
            .map(|value_block| child_text(value_block, &by_id))
            .find(|text| !text.is_empty());

        if let Some(value_text) = value_text {
            pairs.insert(key_text, value_text);
        }
    }

    pairs
}

/// Assembles a block's text from its child word blocks.
fn child_text(block: &Block, by_id: &HashMap<&str, &Block>) -> String {
    block
        .related_ids(RelationshipType::Child)
        .filter_map(|id| by_id.get(id))
        .filter(|child| child.block_type == BlockType::Word)
        .filter_map(|child| child.text.as_deref())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reduces a backend block list to the uniform [`ExtractionResult`].
///
/// `elapsed` is the wall-clock duration of the backend call only, excluding
/// dispatch overhead. Key/value pairs are resolved for the analyze-document
/// mode only.
pub fn normalize(
    mode: ProcessingMode,
    blocks: &[Block],
    elapsed: Duration,
    request_id: Option<String>,
) -> ExtractionResult {
    let mut result = ExtractionResult::from_lines(mode, text_lines(blocks))
        .with_processing_time(elapsed.as_millis() as u64);

    if mode == ProcessingMode::SyncAnalyzeDocument {
        result = result.with_key_value_pairs(key_value_pairs(blocks));
    }
    if let Some(request_id) = request_id {
        result = result.with_request_id(request_id);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Relationship;

    fn form_blocks() -> Vec<Block> {
        vec![
            Block::line("l1", "Passport Number: AB1234567", 98.0),
            Block::line("l2", "Name: Jane Doe", 96.0),
            Block::key_value_set(
                "k1",
                EntityType::Key,
                vec![
                    Relationship {
                        kind: RelationshipType::Child,
                        ids: vec!["w1".into(), "w2".into()],
                    },
                    Relationship {
                        kind: RelationshipType::Value,
                        ids: vec!["v1".into()],
                    },
                ],
            ),
            Block::key_value_set(
                "v1",
                EntityType::Value,
                vec![Relationship {
                    kind: RelationshipType::Child,
                    ids: vec!["w3".into()],
                }],
            ),
            Block::word("w1", "Passport"),
            Block::word("w2", "Number"),
            Block::word("w3", "AB1234567"),
        ]
    }

    #[test]
    fn test_text_lines_preserve_order() {
        let lines = text_lines(&form_blocks());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "Passport Number: AB1234567");
        assert_eq!(lines[1].text, "Name: Jane Doe");
    }

    #[test]
    fn test_key_value_resolution() {
        let pairs = key_value_pairs(&form_blocks());
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs.get("Passport Number").map(String::as_str), Some("AB1234567"));
    }

    #[test]
    fn test_key_without_value_is_dropped() {
        let blocks = vec![
            Block::key_value_set(
                "k1",
                EntityType::Key,
                vec![Relationship {
                    kind: RelationshipType::Child,
                    ids: vec!["w1".into()],
                }],
            ),
            Block::word("w1", "Orphan"),
        ];
        assert!(key_value_pairs(&blocks).is_empty());
    }

    #[test]
    fn test_empty_value_is_dropped() {
        let blocks = vec![
            Block::key_value_set(
                "k1",
                EntityType::Key,
                vec![
                    Relationship {
                        kind: RelationshipType::Child,
                        ids: vec!["w1".into()],
                    },
                    Relationship {
                        kind: RelationshipType::Value,
                        ids: vec!["v1".into()],
                    },
                ],
            ),
            Block::key_value_set("v1", EntityType::Value, Vec::new()),
            Block::word("w1", "Label"),
        ];
        assert!(key_value_pairs(&blocks).is_empty());
    }

    #[test]
    fn test_normalize_detect_text_skips_pairs() {
        let result = normalize(
            ProcessingMode::SyncDetectText,
            &form_blocks(),
            Duration::from_millis(120),
            Some("req-1".into()),
        );
        assert_eq!(result.mode, ProcessingMode::SyncDetectText);
        assert!(result.key_value_pairs.is_empty());
        assert_eq!(result.processing_time_ms, 120);
        assert_eq!(result.request_id.as_deref(), Some("req-1"));
        assert!((result.average_confidence - 97.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_analyze_resolves_pairs() {
        let result = normalize(
            ProcessingMode::SyncAnalyzeDocument,
            &form_blocks(),
            Duration::from_millis(300),
            None,
        );
        assert_eq!(result.key_value_pairs.len(), 1);
    }

    #[test]
    fn test_normalize_empty_blocks() {
        let result = normalize(
            ProcessingMode::SyncDetectText,
            &[],
            Duration::from_millis(10),
            None,
        );
        assert_eq!(result.line_count(), 0);
        assert_eq!(result.average_confidence, 0.0);
    }
}

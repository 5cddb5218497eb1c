//! Wire-level block model returned by the extraction service.
//!
//! The service reports a flat list of blocks forming a relationship graph:
//! pages contain lines, lines contain words, and form fields are key/value
//! set blocks whose key side references its value side through an explicit
//! relationship.

use docmill_core::BoundingBox;
use serde::{Deserialize, Serialize};

/// Kind of a recognized block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Page,
    Line,
    Word,
    KeyValueSet,
    /// Any block kind this client does not interpret.
    #[serde(other)]
    Other,
}

/// Role of a key/value set block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Key,
    Value,
    #[serde(other)]
    Other,
}

/// Kind of a relationship edge between blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Child,
    Value,
    #[serde(other)]
    Other,
}

/// One edge in the block relationship graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Edge kind.
    #[serde(rename = "type")]
    pub kind: RelationshipType,
    /// Ids of the referenced blocks.
    pub ids: Vec<String>,
}

/// One recognized block as returned by the extraction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Service-assigned block id, unique within one response.
    pub id: String,

    /// Block kind.
    #[serde(rename = "type")]
    pub block_type: BlockType,

    /// Recognized text (lines and words).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Recognition confidence in the 0-100 range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Position of the block on the page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<BoundingBox>,

    /// Roles for key/value set blocks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_types: Vec<EntityType>,

    /// Outgoing relationship edges.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,
}

impl Block {
    /// Creates a line block (testing and fixtures).
    pub fn line(id: impl Into<String>, text: impl Into<String>, confidence: f64) -> Self {
        Self {
            id: id.into(),
            block_type: BlockType::Line,
            text: Some(text.into()),
            confidence: Some(confidence),
            geometry: None,
            entity_types: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Creates a word block (testing and fixtures).
    pub fn word(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            block_type: BlockType::Word,
            text: Some(text.into()),
            confidence: Some(99.0),
            geometry: None,
            entity_types: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Creates a key/value set block with the given role and edges.
    pub fn key_value_set(
        id: impl Into<String>,
        entity_type: EntityType,
        relationships: Vec<Relationship>,
    ) -> Self {
        Self {
            id: id.into(),
            block_type: BlockType::KeyValueSet,
            text: None,
            confidence: None,
            geometry: None,
            entity_types: vec![entity_type],
            relationships,
        }
    }

    /// Returns true if this block carries the given entity role.
    pub fn has_entity_type(&self, entity_type: EntityType) -> bool {
        self.entity_types.contains(&entity_type)
    }

    /// Ids referenced through relationships of the given kind.
    pub fn related_ids(&self, kind: RelationshipType) -> impl Iterator<Item = &str> {
        self.relationships
            .iter()
            .filter(move |rel| rel.kind == kind)
            .flat_map(|rel| rel.ids.iter().map(|id| id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_block_type_deserializes_as_other() {
        let json = r#"{"id": "b1", "type": "table_cell"}"#;
        let block: Block = serde_json::from_str(json).unwrap();
        assert_eq!(block.block_type, BlockType::Other);
        assert!(block.text.is_none());
    }

    #[test]
    fn test_block_type_wire_names() {
        let json = serde_json::to_string(&BlockType::KeyValueSet).unwrap();
        assert_eq!(json, "\"key_value_set\"");
    }

    #[test]
    fn test_related_ids_filters_by_kind() {
        let block = Block::key_value_set(
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
        );

        let children: Vec<_> = block.related_ids(RelationshipType::Child).collect();
        assert_eq!(children, vec!["w1", "w2"]);

        let values: Vec<_> = block.related_ids(RelationshipType::Value).collect();
        assert_eq!(values, vec!["v1"]);
    }
}

use serde::{Deserialize, Serialize};

/// A node of the knowledge graph.
///
/// Field names on the wire follow the cache file layout; `kind` is stored as
/// `entity_type` and the free-text description as `content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "entity_type", default)]
    pub kind: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// A directed edge between two entities, referenced by name.
///
/// Either endpoint may name an entity that does not exist in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "from_entity")]
    pub source: String,
    #[serde(rename = "to_entity")]
    pub target: String,
    #[serde(rename = "relationship_type", default)]
    pub kind: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub evidence: String,
}

use serde_json::{Map, Value};

use super::entity::{Entity, Relationship};

/// Entities are unique by name once a graph has been through the merger;
/// per-session graphs may still repeat names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnowledgeGraph {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    pub metadata: Map<String, Value>,
}

impl KnowledgeGraph {
    pub fn project_name(&self) -> &str {
        self.metadata
            .get("project_name")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
    }
}

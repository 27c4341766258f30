//! Knowledge graph assembly and merging
//!
//! - Per-session graphs are plain concatenations of every message's extraction output
//! - Merging folds many graphs into one: entities are unique by name (first seen wins),
//!   relationships are appended in input order without dedup or endpoint validation
//! - Graph files use the `{entities, relationships, metadata}` export layout

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use crate::error::GraphError;
use crate::models::{Entity, KnowledgeGraph, Relationship, SessionAnalysis};

/// Build the graph for one analysed session.
pub fn session_graph(analysis: &SessionAnalysis) -> KnowledgeGraph {
    let mut entities = Vec::new();
    let mut relationships = Vec::new();
    let mut concepts: Vec<String> = Vec::new();
    let mut seen_concepts = HashSet::new();

    for result in &analysis.results {
        entities.extend(result.entities.iter().cloned());
        relationships.extend(result.relationships.iter().cloned());
        for concept in &result.concepts {
            if seen_concepts.insert(concept.as_str()) {
                concepts.push(concept.clone());
            }
        }
    }

    let mut metadata = Map::new();
    metadata.insert("session_id".into(), json!(analysis.session_id));
    metadata.insert("project_name".into(), json!(analysis.project_label));
    metadata.insert("analysis_timestamp".into(), json!(Utc::now().to_rfc3339()));
    metadata.insert("concepts".into(), json!(concepts));
    metadata.insert("total_entities".into(), json!(entities.len()));
    metadata.insert("total_relationships".into(), json!(relationships.len()));

    KnowledgeGraph {
        entities,
        relationships,
        metadata,
    }
}

/// Merge graphs in input order.
///
/// The first entity seen under a given name is kept; later entities with the
/// same name are dropped even when they carry richer attributes.
pub fn merge_graphs(graphs: &[KnowledgeGraph]) -> KnowledgeGraph {
    let mut entities: Vec<Entity> = Vec::new();
    let mut relationships: Vec<Relationship> = Vec::new();
    let mut entity_names: HashSet<&str> = HashSet::new();
    let mut projects: BTreeSet<&str> = BTreeSet::new();

    for graph in graphs {
        for entity in &graph.entities {
            if entity_names.insert(entity.name.as_str()) {
                entities.push(entity.clone());
            }
        }

        relationships.extend(graph.relationships.iter().cloned());
        projects.insert(graph.project_name());
    }

    tracing::debug!(
        inputs = graphs.len(),
        entities = entities.len(),
        relationships = relationships.len(),
        "Merged knowledge graphs"
    );

    let mut metadata = Map::new();
    metadata.insert("total_sessions".into(), json!(graphs.len()));
    metadata.insert("projects".into(), json!(projects));
    metadata.insert("merge_timestamp".into(), json!(Utc::now().to_rfc3339()));
    metadata.insert("total_entities".into(), json!(entities.len()));
    metadata.insert("total_relationships".into(), json!(relationships.len()));

    KnowledgeGraph {
        entities,
        relationships,
        metadata,
    }
}

// ============================================================================
// Graph file format
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphFileEntity {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphFileRelationship {
    pub source: String,
    pub target: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub context: String,
}

/// On-disk representation of a `KnowledgeGraph`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphFile {
    #[serde(default)]
    pub entities: Vec<GraphFileEntity>,
    #[serde(default)]
    pub relationships: Vec<GraphFileRelationship>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl From<&KnowledgeGraph> for GraphFile {
    fn from(graph: &KnowledgeGraph) -> Self {
        Self {
            entities: graph
                .entities
                .iter()
                .map(|e| GraphFileEntity {
                    id: e.id.clone(),
                    name: e.name.clone(),
                    kind: e.kind.clone(),
                    description: e.content.clone().unwrap_or_default(),
                    file_path: e.file_path.clone(),
                    line_number: e.line_number,
                    language: e.language.clone(),
                    confidence: e.confidence,
                })
                .collect(),
            relationships: graph
                .relationships
                .iter()
                .map(|r| GraphFileRelationship {
                    source: r.source.clone(),
                    target: r.target.clone(),
                    kind: r.kind.clone(),
                    confidence: r.confidence,
                    context: r.evidence.clone(),
                })
                .collect(),
            metadata: graph.metadata.clone(),
        }
    }
}

impl From<GraphFile> for KnowledgeGraph {
    fn from(file: GraphFile) -> Self {
        Self {
            entities: file
                .entities
                .into_iter()
                .map(|e| Entity {
                    id: e.id,
                    name: e.name,
                    kind: e.kind,
                    confidence: e.confidence,
                    content: (!e.description.is_empty()).then_some(e.description),
                    context: None,
                    file_path: e.file_path,
                    line_number: e.line_number,
                    language: e.language,
                })
                .collect(),
            relationships: file
                .relationships
                .into_iter()
                .map(|r| Relationship {
                    source: r.source,
                    target: r.target,
                    kind: r.kind,
                    confidence: r.confidence,
                    evidence: r.context,
                })
                .collect(),
            metadata: file.metadata,
        }
    }
}

pub fn write_graph_file(path: &Path, graph: &KnowledgeGraph) -> Result<(), GraphError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(&GraphFile::from(graph))?;
    fs::write(path, body)?;
    Ok(())
}

pub fn read_graph_file(path: &Path) -> Result<KnowledgeGraph, GraphError> {
    let raw = fs::read_to_string(path)?;
    let file: GraphFile = serde_json::from_str(&raw)?;
    Ok(file.into())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisOutcome, AnalysisResult};

    fn entity(name: &str, description: &str) -> Entity {
        Entity {
            id: format!("id-{name}"),
            name: name.to_string(),
            kind: "CONCEPT".to_string(),
            confidence: 0.7,
            content: Some(description.to_string()),
            context: None,
            file_path: None,
            line_number: None,
            language: None,
        }
    }

    fn rel(source: &str, target: &str) -> Relationship {
        Relationship {
            source: source.to_string(),
            target: target.to_string(),
            kind: "CALLS".to_string(),
            confidence: 0.5,
            evidence: String::new(),
        }
    }

    fn graph(project: &str, entities: Vec<Entity>, relationships: Vec<Relationship>) -> KnowledgeGraph {
        let mut metadata = Map::new();
        metadata.insert("project_name".into(), json!(project));
        KnowledgeGraph {
            entities,
            relationships,
            metadata,
        }
    }

    #[test]
    fn test_merge_keeps_first_entity_by_name() {
        let first = graph("agrama", vec![entity("X", "first")], vec![]);
        let second = graph("agrama", vec![entity("X", "second"), entity("Y", "y")], vec![]);

        let merged = merge_graphs(&[first, second]);

        assert_eq!(merged.entities.len(), 2);
        let x = merged.entities.iter().find(|e| e.name == "X").unwrap();
        assert_eq!(x.content.as_deref(), Some("first"));
        assert_eq!(merged.entities[1].name, "Y");
    }

    #[test]
    fn test_merge_dedups_within_a_single_input() {
        let only = graph("agrama", vec![entity("X", "a"), entity("X", "b")], vec![]);
        let merged = merge_graphs(&[only]);
        assert_eq!(merged.entities.len(), 1);
        assert_eq!(merged.entities[0].content.as_deref(), Some("a"));
    }

    #[test]
    fn test_merge_concatenates_relationships_in_order() {
        let a = graph("agrama", vec![], vec![rel("a", "b"), rel("a", "b")]);
        let b = graph("agentprobe", vec![], vec![rel("c", "d")]);
        let c = graph("unknown", vec![], vec![rel("ghost", "missing"), rel("a", "b")]);

        let merged = merge_graphs(&[a, b, c]);

        let pairs: Vec<(&str, &str)> = merged
            .relationships
            .iter()
            .map(|r| (r.source.as_str(), r.target.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("a", "b"), ("a", "b"), ("c", "d"), ("ghost", "missing"), ("a", "b")]
        );
    }

    #[test]
    fn test_merge_metadata_counts_and_projects() {
        let a = graph("agrama", vec![entity("X", "x")], vec![rel("X", "Y")]);
        let b = graph("agrama", vec![entity("X", "x2")], vec![]);
        let c = KnowledgeGraph::default();

        let merged = merge_graphs(&[a, b, c]);

        assert_eq!(merged.metadata["total_sessions"], 3);
        assert_eq!(merged.metadata["total_entities"], 1);
        assert_eq!(merged.metadata["total_relationships"], 1);
        assert_eq!(merged.metadata["projects"], json!(["agrama", "unknown"]));
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        let merged = merge_graphs(&[]);
        assert!(merged.entities.is_empty());
        assert!(merged.relationships.is_empty());
        assert_eq!(merged.metadata["total_sessions"], 0);
    }

    #[test]
    fn test_session_graph_concatenates_results() {
        let mut first = AnalysisResult::empty("s1", "m1", AnalysisOutcome::Extracted);
        first.entities = vec![entity("X", "x")];
        first.relationships = vec![rel("X", "Y")];
        first.concepts = vec!["graphs".to_string(), "caching".to_string()];
        let mut second = AnalysisResult::empty("s1", "m2", AnalysisOutcome::CacheHit);
        second.entities = vec![entity("X", "again")];
        second.concepts = vec!["graphs".to_string()];

        let analysis = SessionAnalysis {
            session_id: "s1".to_string(),
            project_label: "agrama".to_string(),
            results: vec![first, second, AnalysisResult::empty("s1", "m3", AnalysisOutcome::Skipped)],
        };

        let g = session_graph(&analysis);

        assert_eq!(g.entities.len(), 2);
        assert_eq!(g.relationships.len(), 1);
        assert_eq!(g.project_name(), "agrama");
        assert_eq!(g.metadata["session_id"], "s1");
        assert_eq!(g.metadata["concepts"], json!(["graphs", "caching"]));
    }

    #[test]
    fn test_graph_file_layout() {
        let g = graph("agrama", vec![entity("X", "desc")], vec![rel("X", "Y")]);
        let value = serde_json::to_value(GraphFile::from(&g)).unwrap();

        assert_eq!(value["entities"][0]["name"], "X");
        assert_eq!(value["entities"][0]["type"], "CONCEPT");
        assert_eq!(value["entities"][0]["description"], "desc");
        assert!(value["entities"][0].get("file_path").is_none());
        assert_eq!(value["relationships"][0]["source"], "X");
        assert_eq!(value["relationships"][0]["type"], "CALLS");
        assert_eq!(value["relationships"][0]["context"], "");
        assert_eq!(value["metadata"]["project_name"], "agrama");
    }

    #[test]
    fn test_write_then_read_graph_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("graph.json");
        let g = graph("agrama", vec![entity("X", "desc")], vec![rel("X", "Y")]);

        write_graph_file(&path, &g).unwrap();
        let loaded = read_graph_file(&path).unwrap();

        assert_eq!(loaded.entities[0].name, "X");
        assert_eq!(loaded.entities[0].content.as_deref(), Some("desc"));
        assert_eq!(loaded.relationships, g.relationships);
        assert_eq!(loaded.project_name(), "agrama");
    }
}

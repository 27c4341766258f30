//! Batch runs: discover sessions, analyze them, and write graph files.
//!
//! Output layout under the configured output directory:
//! - `<project>_<session_id>_graph.json` per analyzed session
//! - `unified_knowledge_graph.json` merged across the run
//! - `analysis_results.json` with every per-message result

use anyhow::Context;
use serde::Serialize;
use sessiongraph_core::models::{AnalysisResult, KnowledgeGraph, SessionAnalysis};
use sessiongraph_core::{merge_graphs, read_graph_file, session_graph, write_graph_file, SessionGraphConfig};
use sessiongraph_ingest::process_directory;
use std::fs;
use std::path::{Path, PathBuf};

use super::orchestrator::{AnalyzerStats, ExtractionOrchestrator};

pub const UNIFIED_GRAPH_FILE: &str = "unified_knowledge_graph.json";
pub const RESULTS_FILE: &str = "analysis_results.json";

/// Summary of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub sessions: usize,
    pub messages_analyzed: usize,
    pub graph_files: Vec<PathBuf>,
    pub unified_graph: PathBuf,
    pub total_entities: usize,
    pub total_relationships: usize,
    pub stats: AnalyzerStats,
}

/// File name for a session's graph. Path separators in labels are replaced.
pub fn session_graph_filename(project: &str, session_id: &str) -> String {
    let clean = |s: &str| s.replace(['/', '\\'], "_");
    format!("{}_{}_graph.json", clean(project), clean(session_id))
}

/// Run the full pipeline over the configured input directory.
pub async fn run_batch(
    config: &SessionGraphConfig,
    orchestrator: &mut ExtractionOrchestrator,
) -> anyhow::Result<BatchReport> {
    let input_dir = config.input_dir();
    let output_dir = config.output_dir();

    let sessions = process_directory(&input_dir, config.ingest.recursive, &config.ingest.project_markers);
    if sessions.is_empty() {
        tracing::warn!(input_dir = %input_dir.display(), "No sessions found");
    }

    let analyses = orchestrator
        .analyze_batch(&sessions, config.batch.max_messages_per_session)
        .await;

    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let mut graphs = Vec::with_capacity(analyses.len());
    let mut graph_files = Vec::with_capacity(analyses.len());

    for analysis in &analyses {
        let graph = session_graph(analysis);
        let path = output_dir.join(session_graph_filename(&analysis.project_label, &analysis.session_id));
        write_graph_file(&path, &graph)
            .with_context(|| format!("Failed to write session graph {}", path.display()))?;

        tracing::info!(
            session_id = %analysis.session_id,
            entities = graph.entities.len(),
            relationships = graph.relationships.len(),
            path = %path.display(),
            "Wrote session graph"
        );

        graphs.push(graph);
        graph_files.push(path);
    }

    let unified = merge_graphs(&graphs);
    let unified_path = output_dir.join(UNIFIED_GRAPH_FILE);
    write_graph_file(&unified_path, &unified)
        .with_context(|| format!("Failed to write merged graph {}", unified_path.display()))?;

    export_results(&analyses, &output_dir.join(RESULTS_FILE))?;

    let report = BatchReport {
        sessions: analyses.len(),
        messages_analyzed: analyses.iter().map(|a| a.results.len()).sum(),
        graph_files,
        unified_graph: unified_path,
        total_entities: unified.entities.len(),
        total_relationships: unified.relationships.len(),
        stats: orchestrator.stats(),
    };

    tracing::info!(
        sessions = report.sessions,
        entities = report.total_entities,
        relationships = report.total_relationships,
        "Batch run complete"
    );

    Ok(report)
}

/// Write every per-message result as one JSON array.
pub fn export_results(analyses: &[SessionAnalysis], path: &Path) -> anyhow::Result<()> {
    let results: Vec<&AnalysisResult> = analyses.iter().flat_map(|a| a.results.iter()).collect();
    let body = serde_json::to_string_pretty(&results)?;
    fs::write(path, body).with_context(|| format!("Failed to write results {}", path.display()))?;
    tracing::info!(path = %path.display(), results = results.len(), "Exported analysis results");
    Ok(())
}

/// Merge existing graph files into `output`.
///
/// Unreadable inputs are reported and skipped; input order decides which
/// duplicate entity survives.
pub fn merge_graph_files(paths: &[PathBuf], output: &Path) -> anyhow::Result<KnowledgeGraph> {
    let graphs: Vec<KnowledgeGraph> = paths
        .iter()
        .filter_map(|path| match read_graph_file(path) {
            Ok(graph) => Some(graph),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable graph file");
                None
            }
        })
        .collect();

    let merged = merge_graphs(&graphs);
    write_graph_file(output, &merged)
        .with_context(|| format!("Failed to write merged graph {}", output.display()))?;

    tracing::info!(
        inputs = graphs.len(),
        entities = merged.entities.len(),
        relationships = merged.relationships.len(),
        path = %output.display(),
        "Merged graph files"
    );

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_graph_filename() {
        assert_eq!(session_graph_filename("agrama", "abc-123"), "agrama_abc-123_graph.json");
        assert_eq!(session_graph_filename("a/b", "c\\d"), "a_b_c_d_graph.json");
    }

    #[test]
    fn test_merge_graph_files_skips_unreadable_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        std::fs::write(
            &good,
            r#"{"entities":[{"name":"a","type":"FILE","description":"first","confidence":0.5}],
                "relationships":[{"source":"a","target":"b","type":"CALLS","confidence":0.4,"context":""}],
                "metadata":{"project_name":"agrama"}}"#,
        )
        .unwrap();
        let output = dir.path().join("merged").join("out.json");

        let merged =
            merge_graph_files(&[good, dir.path().join("missing.json")], &output).unwrap();

        assert_eq!(merged.entities.len(), 1);
        assert_eq!(merged.relationships.len(), 1);
        assert_eq!(merged.metadata["total_sessions"], 1);
        assert_eq!(merged.metadata["projects"], serde_json::json!(["agrama"]));
        assert!(output.exists());
    }
}

use serde::{Deserialize, Serialize};

use super::entity::{Entity, Relationship};

/// How an `AnalysisResult` came to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// Content was empty or below the minimum length.
    Skipped,
    CacheHit,
    Extracted,
    Failed { reason: String },
}

/// Extraction output for a single message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub session_id: String,
    pub message_uuid: String,
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    pub concepts: Vec<String>,
    pub analysis_timestamp: String,
    pub model_version: String,
    pub outcome: AnalysisOutcome,
}

impl AnalysisResult {
    pub fn empty(session_id: &str, message_uuid: &str, outcome: AnalysisOutcome) -> Self {
        Self {
            session_id: session_id.to_string(),
            message_uuid: message_uuid.to_string(),
            entities: Vec::new(),
            relationships: Vec::new(),
            concepts: Vec::new(),
            analysis_timestamp: String::new(),
            model_version: String::new(),
            outcome,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, AnalysisOutcome::Failed { .. })
    }
}

/// All results produced for one session during a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct SessionAnalysis {
    pub session_id: String,
    pub project_label: String,
    pub results: Vec<AnalysisResult>,
}

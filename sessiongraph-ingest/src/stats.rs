//! Corpus-level statistics and session summary export.

use regex::Regex;
use serde::Serialize;
use sessiongraph_core::models::{Role, Session};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use crate::error::IngestError;

/// Patterns collected from a single message's content.
const MAX_FILE_PATTERNS_PER_MESSAGE: usize = 10;
/// Messages previewed per session summary.
const SUMMARY_PREVIEW_MESSAGES: usize = 10;
const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProjectStats {
    pub sessions: usize,
    pub messages: usize,
    pub tool_invocations: usize,
}

/// Totals over every parsed session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    pub total_sessions: usize,
    pub total_messages: usize,
    pub user_messages: usize,
    pub agent_messages: usize,
    pub tool_invocations: usize,
    pub projects: BTreeMap<String, ProjectStats>,
    pub tool_names: BTreeSet<String>,
    pub file_patterns: BTreeSet<String>,
}

impl CorpusStats {
    pub fn from_sessions(sessions: &[Session]) -> Self {
        let file_pattern = Regex::new(r"\b\w+\.\w+\b").ok();
        let mut stats = Self::default();

        for session in sessions {
            stats.total_sessions += 1;
            stats.total_messages += session.total_messages();
            stats.user_messages += session.user_message_count();
            stats.agent_messages += session.agent_message_count();
            stats.tool_invocations += session.tool_invocation_count();

            let project = stats
                .projects
                .entry(session.project_label.clone())
                .or_default();
            project.sessions += 1;
            project.messages += session.total_messages();
            project.tool_invocations += session.tool_invocation_count();

            for message in session.messages() {
                for invocation in &message.tool_invocations {
                    if !invocation.name.is_empty() {
                        stats.tool_names.insert(invocation.name.clone());
                    }
                }

                if let Some(re) = &file_pattern {
                    stats.file_patterns.extend(
                        re.find_iter(&message.content)
                            .take(MAX_FILE_PATTERNS_PER_MESSAGE)
                            .map(|m| m.as_str().to_string()),
                    );
                }
            }
        }

        stats
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessagePreview {
    pub role: Role,
    pub timestamp: String,
    pub content_preview: String,
    pub tools_used: Vec<String>,
    pub working_directory: String,
}

/// Compact, human-readable view of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub project: String,
    pub file_path: String,
    pub total_messages: usize,
    pub user_messages: usize,
    pub agent_messages: usize,
    pub tool_invocations: usize,
    pub messages: Vec<MessagePreview>,
}

impl SessionSummary {
    pub fn from_session(session: &Session) -> Self {
        let messages = session
            .messages()
            .iter()
            .take(SUMMARY_PREVIEW_MESSAGES)
            .map(|m| MessagePreview {
                role: m.role,
                timestamp: m.timestamp.clone(),
                content_preview: preview(&m.content),
                tools_used: m.tool_invocations.iter().map(|t| t.name.clone()).collect(),
                working_directory: m.working_directory.clone(),
            })
            .collect();

        Self {
            session_id: session.session_id.clone(),
            project: session.project_label.clone(),
            file_path: session.file_origin.display().to_string(),
            total_messages: session.total_messages(),
            user_messages: session.user_message_count(),
            agent_messages: session.agent_message_count(),
            tool_invocations: session.tool_invocation_count(),
            messages,
        }
    }
}

fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        let head: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        content.to_string()
    }
}

/// Write one summary per session as a pretty-printed JSON array.
pub fn export_session_summaries(sessions: &[Session], path: &Path) -> Result<(), IngestError> {
    let summaries: Vec<SessionSummary> = sessions.iter().map(SessionSummary::from_session).collect();
    let json = serde_json::to_string_pretty(&summaries)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| IngestError::io(parent, e))?;
    }
    fs::write(path, json).map_err(|e| IngestError::io(path, e))?;

    tracing::info!(path = %path.display(), sessions = summaries.len(), "Exported session summaries");
    Ok(())
}

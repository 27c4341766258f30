use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::message::{Message, Role};

/// Aggregate counters over a session's messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_messages: usize,
    pub user_messages: usize,
    pub agent_messages: usize,
    pub tool_invocations: usize,
}

impl SessionStats {
    pub fn from_messages(messages: &[Message]) -> Self {
        Self {
            total_messages: messages.len(),
            user_messages: messages.iter().filter(|m| m.role == Role::User).count(),
            agent_messages: messages.iter().filter(|m| m.role == Role::Agent).count(),
            tool_invocations: messages.iter().map(|m| m.tool_invocations.len()).sum(),
        }
    }
}

/// One reconstructed conversation.
///
/// Messages and counters are only reachable through accessors so the counters
/// can never drift from the message list they were folded from.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub session_id: String,
    pub project_label: String,
    pub file_origin: PathBuf,
    messages: Vec<Message>,
    stats: SessionStats,
}

impl Session {
    /// Build a session, or `None` when there is nothing to hold.
    pub fn new(
        session_id: String,
        project_label: String,
        file_origin: &Path,
        messages: Vec<Message>,
    ) -> Option<Self> {
        if messages.is_empty() {
            return None;
        }
        let stats = SessionStats::from_messages(&messages);
        Some(Self {
            session_id,
            project_label,
            file_origin: file_origin.to_path_buf(),
            messages,
            stats,
        })
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn total_messages(&self) -> usize {
        self.stats.total_messages
    }

    pub fn user_message_count(&self) -> usize {
        self.stats.user_messages
    }

    pub fn agent_message_count(&self) -> usize {
        self.stats.agent_messages
    }

    pub fn tool_invocation_count(&self) -> usize {
        self.stats.tool_invocations
    }

    /// Context string handed to the extractor and mixed into cache keys.
    pub fn context(&self) -> SessionContext {
        SessionContext {
            session_id: self.session_id.clone(),
            project_label: self.project_label.clone(),
        }
    }
}

/// Identifies the session a message belongs to during extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: String,
    pub project_label: String,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, project_label: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            project_label: project_label.into(),
        }
    }

    pub fn describe(&self) -> String {
        format!("Project: {}, Session: {}", self.project_label, self.session_id)
    }
}

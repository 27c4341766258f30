use serde::{Deserialize, Serialize};

/// Conversation role. Log records carry `"user"` or `"assistant"`; every other
/// record type is filtered out before a `Message` is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Agent,
}

impl Role {
    /// Map a raw record `type` onto a role, `None` for non-conversation records.
    pub fn from_record_type(record_type: &str) -> Option<Self> {
        match record_type {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Agent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub input: serde_json::Value,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: serde_json::Value,
    pub source_invocation_id: String,
    pub is_error: bool,
    #[serde(default)]
    pub interrupted: bool,
}

/// One parsed conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub uuid: String,
    pub timestamp: String,
    pub role: Role,
    pub content: String,
    pub tool_invocations: Vec<ToolInvocation>,
    pub tool_results: Vec<ToolResult>,
    pub session_id: String,
    pub parent_uuid: Option<String>,
    pub working_directory: String,
    pub branch_label: String,
}

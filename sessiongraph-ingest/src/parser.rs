//! Log record decoding.
//!
//! Turns one JSONL line from a coding-session log into a `Message`. Only
//! `user` and `assistant` records become messages; everything else (summaries,
//! system notices, file snapshots, ...) is not a conversation turn and yields
//! `None`. Field access is lenient: a record with the right `type`
//! always produces a message, with absent or oddly-typed fields defaulted.

use serde_json::{Map, Value};
use sessiongraph_core::models::{Message, Role, ToolInvocation, ToolResult};
use std::path::Path;

/// Shape of `message.content`, resolved once per record.
enum ContentShape<'a> {
    Text(&'a str),
    Blocks(&'a [Value]),
    Missing,
}

impl<'a> ContentShape<'a> {
    fn of(record: &'a Value) -> Self {
        match record.get("message").and_then(|m| m.get("content")) {
            Some(Value::String(text)) => ContentShape::Text(text),
            Some(Value::Array(blocks)) => ContentShape::Blocks(blocks),
            _ => ContentShape::Missing,
        }
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Decode a single already-parsed JSON record.
pub fn parse_record(record: &Value) -> Option<Message> {
    let role = record
        .get("type")
        .and_then(Value::as_str)
        .and_then(Role::from_record_type)?;

    let mut content = String::new();
    let mut tool_invocations = Vec::new();
    let mut tool_results = Vec::new();

    match ContentShape::of(record) {
        ContentShape::Text(text) => content.push_str(text),
        ContentShape::Blocks(blocks) => {
            for block in blocks {
                match block.get("type").and_then(Value::as_str) {
                    Some("text") => {
                        if let Some(text) = block.get("text").and_then(Value::as_str) {
                            content.push_str(text);
                        }
                    }
                    Some("tool_use") => tool_invocations.push(ToolInvocation {
                        name: str_field(block, "name"),
                        input: block
                            .get("input")
                            .cloned()
                            .unwrap_or_else(|| Value::Object(Map::new())),
                        id: str_field(block, "id"),
                    }),
                    Some("tool_result") => tool_results.push(ToolResult {
                        content: block
                            .get("content")
                            .cloned()
                            .unwrap_or_else(|| Value::String(String::new())),
                        source_invocation_id: str_field(block, "tool_use_id"),
                        is_error: block
                            .get("is_error")
                            .and_then(Value::as_bool)
                            .unwrap_or(false),
                        interrupted: false,
                    }),
                    _ => {}
                }
            }
        }
        ContentShape::Missing => {}
    }

    if let Some(result) = record.get("toolUseResult").and_then(side_channel_result) {
        tool_results.push(result);
    }

    Some(Message {
        uuid: str_field(record, "uuid"),
        timestamp: str_field(record, "timestamp"),
        role,
        content: content.trim().to_string(),
        tool_invocations,
        tool_results,
        session_id: str_field(record, "sessionId"),
        parent_uuid: record
            .get("parentUuid")
            .and_then(Value::as_str)
            .map(String::from),
        working_directory: str_field(record, "cwd"),
        branch_label: str_field(record, "gitBranch"),
    })
}

/// Fold a `toolUseResult` capture into a synthetic tool result.
fn side_channel_result(capture: &Value) -> Option<ToolResult> {
    match capture {
        Value::Object(_) => {
            let stdout = str_field(capture, "stdout");
            let stderr = str_field(capture, "stderr");
            Some(ToolResult {
                content: Value::String(format!("{stdout}{stderr}")),
                source_invocation_id: String::new(),
                is_error: !stderr.is_empty(),
                interrupted: capture
                    .get("interrupted")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            })
        }
        Value::String(text) => Some(ToolResult {
            content: Value::String(text.clone()),
            source_invocation_id: String::new(),
            is_error: false,
            interrupted: false,
        }),
        _ => None,
    }
}

/// Decode one raw line. Blank lines and non-conversation records yield `None`;
/// malformed JSON is logged with its location and also yields `None`.
pub fn parse_line(line: &str, origin: &Path, line_number: usize) -> Option<Message> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let record: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(
                file = %origin.display(),
                line = line_number,
                error = %e,
                "Skipping malformed JSON line"
            );
            return None;
        }
    };

    parse_record(&record)
}

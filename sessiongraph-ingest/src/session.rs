use sessiongraph_core::models::{Message, Session};
use std::fs;
use std::path::Path;

use crate::error::IngestError;
use crate::parser::parse_line;

/// Label a source by the first known project marker among its path components.
pub fn project_label(origin: &Path, markers: &[String]) -> String {
    markers
        .iter()
        .find(|marker| {
            origin
                .components()
                .any(|c| c.as_os_str() == marker.as_str())
        })
        .cloned()
        .unwrap_or_else(|| "unknown".to_string())
}

/// Identifier used when no record in the source carries a session id.
fn fallback_session_id(origin: &Path) -> String {
    origin
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| origin.to_string_lossy().into_owned())
}

/// Group raw log lines from one source into a `Session`.
///
/// Returns `None` when no line yields a message.
pub fn assemble<I, S>(lines: I, origin: &Path, markers: &[String]) -> Option<Session>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let messages: Vec<Message> = lines
        .into_iter()
        .enumerate()
        .filter_map(|(idx, line)| parse_line(line.as_ref(), origin, idx + 1))
        .collect();

    if messages.is_empty() {
        tracing::debug!(file = %origin.display(), "No conversation messages, skipping source");
        return None;
    }

    let session_id = messages
        .iter()
        .map(|m| m.session_id.as_str())
        .find(|id| !id.is_empty())
        .map(String::from)
        .unwrap_or_else(|| fallback_session_id(origin));

    Session::new(session_id, project_label(origin, markers), origin, messages)
}

/// Read and assemble one JSONL file.
///
/// I/O failures are returned; per-line problems never are. Invalid UTF-8 is
/// replaced rather than rejected so the readable lines still count.
pub fn parse_session_file(path: &Path, markers: &[String]) -> Result<Option<Session>, IngestError> {
    let bytes = fs::read(path).map_err(|e| IngestError::io(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(assemble(text.lines(), path, markers))
}

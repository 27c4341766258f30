use sessiongraph_core::models::Session;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::session::parse_session_file;

/// List `*.jsonl` files under `dir`, sorted by path.
pub fn discover_session_files(dir: &Path, recursive: bool) -> Vec<PathBuf> {
    let max_depth = if recursive { usize::MAX } else { 1 };

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().map(|ext| ext == "jsonl").unwrap_or(false))
        .collect();

    files.sort();
    files
}

/// Parse every session file under `dir`.
///
/// Unreadable files and files without conversation messages are logged and
/// left out; they never abort the scan.
pub fn process_directory(dir: &Path, recursive: bool, markers: &[String]) -> Vec<Session> {
    let mut sessions = Vec::new();

    for path in discover_session_files(dir, recursive) {
        match parse_session_file(&path, markers) {
            Ok(Some(session)) => {
                tracing::info!(
                    file = %path.display(),
                    session_id = %session.session_id,
                    messages = session.total_messages(),
                    tool_invocations = session.tool_invocation_count(),
                    "Parsed session"
                );
                sessions.push(session);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable session file");
            }
        }
    }

    sessions
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discovery_respects_recursion_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("agrama").join("tmp");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("b.jsonl"), "").unwrap();
        fs::write(dir.path().join("a.jsonl"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(nested.join("c.jsonl"), "").unwrap();

        let flat = discover_session_files(dir.path(), false);
        assert_eq!(flat, vec![dir.path().join("a.jsonl"), dir.path().join("b.jsonl")]);

        let deep = discover_session_files(dir.path(), true);
        assert_eq!(deep.len(), 3);
        assert!(deep.contains(&nested.join("c.jsonl")));
    }

    #[test]
    fn test_process_directory_skips_empty_sources() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("agrama");
        fs::create_dir_all(&project).unwrap();
        fs::write(
            project.join("one.jsonl"),
            "{\"type\":\"user\",\"sessionId\":\"s1\",\"message\":{\"content\":\"hi\"}}\n",
        )
        .unwrap();
        fs::write(project.join("empty.jsonl"), "\n\n").unwrap();
        fs::write(project.join("meta.jsonl"), "{\"type\":\"summary\"}\n").unwrap();

        let sessions = process_directory(dir.path(), true, &["agrama".to_string()]);

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session_id, "s1");
        assert_eq!(sessions[0].project_label, "agrama");
    }
}

use sessiongraph_core::models::Role;
use sessiongraph_ingest::{assemble, parse_session_file, process_directory, CorpusStats};
use std::fs;
use std::path::Path;

fn markers() -> Vec<String> {
    vec!["agrama".to_string(), "agentprobe".to_string()]
}

#[test]
fn test_three_line_log_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("s1.jsonl");
    let log = [
        r#"{"type":"user","uuid":"a","sessionId":"s1","message":{"content":"hi"}}"#,
        r#"{"type":"assistant","uuid":"b","sessionId":"s1","message":{"content":[{"type":"text","text":"ok"},{"type":"tool_use","name":"Read","input":{},"id":"t1"}]}}"#,
        r#"{"type":"meta"}"#,
    ]
    .join("\n");
    fs::write(&path, log).unwrap();

    let session = parse_session_file(&path, &markers())
        .expect("file is readable")
        .expect("file has messages");

    assert_eq!(session.session_id, "s1");
    assert_eq!(session.total_messages(), 2);
    assert_eq!(session.user_message_count(), 1);
    assert_eq!(session.agent_message_count(), 1);
    assert_eq!(session.tool_invocation_count(), 1);
    assert_eq!(session.messages()[1].content, "ok");
    assert_eq!(session.messages()[1].role, Role::Agent);
    assert_eq!(session.messages()[1].tool_invocations[0].name, "Read");
}

#[test]
fn test_parse_totality_with_interleaved_malformed_lines() {
    let lines = vec![
        r#"{"type":"user","uuid":"1","sessionId":"s","message":{"content":"one"}}"#,
        "{not json",
        r#"{"type":"summary","summary":"skip me"}"#,
        "",
        r#"{"type":"assistant","uuid":"2","sessionId":"s","message":{"content":"two"}}"#,
        r#"{"type":"user""#,
        r#"{"type":"assistant","uuid":"3","sessionId":"s"}"#,
        r#"[1, 2, 3]"#,
        r#"{"type":"user","uuid":"4","sessionId":"s","message":{"content":42}}"#,
    ];

    let session = assemble(lines, Path::new("/logs/agrama/s.jsonl"), &markers()).unwrap();
    let uuids: Vec<&str> = session.messages().iter().map(|m| m.uuid.as_str()).collect();

    assert_eq!(uuids, vec!["1", "2", "3", "4"]);
    assert_eq!(session.project_label, "agrama");
}

#[test]
fn test_aggregate_counters_match_messages() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("agentprobe");
    fs::create_dir_all(&project).unwrap();

    for (name, tools) in [("a.jsonl", 0usize), ("b.jsonl", 2), ("c.jsonl", 5)] {
        let mut lines = vec![format!(
            r#"{{"type":"user","sessionId":"{name}","message":{{"content":"start"}}}}"#
        )];
        for i in 0..tools {
            lines.push(format!(
                r#"{{"type":"assistant","sessionId":"{name}","message":{{"content":[{{"type":"tool_use","name":"Bash","id":"t{i}"}},{{"type":"tool_use","name":"Read","id":"r{i}"}}]}}}}"#
            ));
        }
        fs::write(project.join(name), lines.join("\n")).unwrap();
    }

    let sessions = process_directory(dir.path(), true, &markers());
    assert_eq!(sessions.len(), 3);

    for session in &sessions {
        assert_eq!(
            session.user_message_count() + session.agent_message_count(),
            session.total_messages()
        );
        let invocations: usize = session
            .messages()
            .iter()
            .map(|m| m.tool_invocations.len())
            .sum();
        assert_eq!(session.tool_invocation_count(), invocations);
    }

    let stats = CorpusStats::from_sessions(&sessions);
    assert_eq!(stats.tool_invocations, 14);
    assert_eq!(stats.projects["agentprobe"].sessions, 3);
}

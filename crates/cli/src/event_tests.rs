use super::*;

#[test]
fn classifies_known_types() {
    assert_eq!(HookEventKind::classify("SessionStart"), HookEventKind::SessionStart);
    assert_eq!(HookEventKind::classify("Stop"), HookEventKind::Stop);
    assert_eq!(HookEventKind::classify("PreToolUse"), HookEventKind::PreToolUse);
    assert_eq!(HookEventKind::classify("SubagentStop"), HookEventKind::Subagent);
}

#[test]
fn unknown_type_classifies_as_error() {
    assert_eq!(HookEventKind::classify("SomethingNew"), HookEventKind::Error);
}

#[test]
fn raw_text_fallback_is_a_stop_with_raw_stdin() {
    let event = RawHookEvent::from_raw_text("assistant printed garbage\n");
    assert_eq!(event.event_type, "Stop");
    assert_eq!(event.raw_stdin.as_deref(), Some("assistant printed garbage\n"));
    assert!(event.timestamp.is_some());
}

#[test]
fn missing_timestamp_gets_filled() {
    let event = RawHookEvent {
        event_type: "Stop".to_owned(),
        timestamp: None,
        cwd: None,
        session_id: None,
        tool: None,
        raw_stdin: None,
        extra: serde_json::Map::new(),
    };
    let filled = event.with_timestamp_filled();
    assert!(filled.timestamp.is_some());
}

#[test]
fn epoch_formats_known_instant() {
    // 2024-01-01T00:00:00Z
    assert_eq!(epoch_to_rfc3339(1_704_067_200), "2024-01-01T00:00:00Z");
}

#[test]
fn stamped_event_flattens_raw_fields() {
    let raw = RawHookEvent::from_raw_text("boom");
    let stamped = StampedHookEvent {
        agent_id: "agent-1".to_owned(),
        project_path: "/tmp/proj".to_owned(),
        orka_session_id: "sess-1".to_owned(),
        raw,
    };
    let value = serde_json::to_value(&stamped).expect("serializes");
    assert_eq!(value["agent_id"], "agent-1");
    assert_eq!(value["event_type"], "Stop");
}

use super::*;

fn reply(parent: &str, syscall: &str, status: Status) -> Frame {
    Frame {
        id: Uuid::new_v4().to_string(),
        parent_id: Some(parent.to_owned()),
        ts: 0,
        room_id: Some("lobby".to_owned()),
        from: None,
        syscall: syscall.to_owned(),
        status,
        data: Value::Object(Map::new()),
    }
}

#[test]
fn ws_url_maps_http_schemes_and_adds_room() {
    assert_eq!(
        ws_url("http://localhost:3000", "lobby", None).unwrap(),
        "ws://localhost:3000/api/ws?room=lobby"
    );
    assert_eq!(
        ws_url("https://sketch.example/", "a-1", None).unwrap(),
        "wss://sketch.example/api/ws?room=a-1"
    );
}

#[test]
fn ws_url_encodes_name() {
    let url = ws_url("http://localhost:3000", "lobby", Some("Ada L")).unwrap();
    assert_eq!(url, "ws://localhost:3000/api/ws?room=lobby&name=Ada+L");
}

#[test]
fn ws_url_rejects_other_schemes() {
    assert!(matches!(ws_url("ftp://x", "lobby", None), Err(CliError::InvalidBaseUrl(_))));
}

#[test]
fn storage_path_targets_room() {
    assert_eq!(storage_path("lobby"), "/api/rooms/lobby/storage");
}

#[test]
fn request_frame_is_a_fresh_room_request() {
    let a = request_frame("history:undo", "lobby", Value::Object(Map::new()));
    let b = request_frame("history:undo", "lobby", Value::Object(Map::new()));
    assert_ne!(a.id, b.id);
    assert_eq!(a.status, Status::Request);
    assert_eq!(a.room_id.as_deref(), Some("lobby"));
    assert!(a.parent_id.is_none());
}

#[test]
fn payloads_match_server_fields() {
    assert_eq!(id_payload("s1"), serde_json::json!({ "id": "s1" }));
    assert_eq!(
        set_payload("s1", serde_json::json!({ "type": "rect" })),
        serde_json::json!({ "id": "s1", "shape": { "type": "rect" } })
    );
    assert_eq!(
        reaction_payload("🔥", 1.5, -2.0),
        serde_json::json!({ "event": { "x": 1.5, "y": -2.0, "value": "🔥" } })
    );
}

#[test]
fn reply_matching_requires_parent_syscall_and_terminal_status() {
    assert!(is_reply_to(&reply("r1", "storage:set", Status::Done), "r1", "storage:set"));
    assert!(is_reply_to(&reply("r1", "storage:set", Status::Error), "r1", "storage:set"));
    assert!(!is_reply_to(&reply("r2", "storage:set", Status::Done), "r1", "storage:set"));
    assert!(!is_reply_to(&reply("r1", "storage:delete", Status::Done), "r1", "storage:set"));
    assert!(!is_reply_to(&reply("r1", "storage:set", Status::Item), "r1", "storage:set"));
}

#[test]
fn shape_line_keys_by_object_id() {
    let (id, shape) = parse_shape_line(r#"{"type":"rect","objectId":"s1","left":1}"#)
        .unwrap()
        .unwrap();
    assert_eq!(id, "s1");
    assert_eq!(shape["left"], 1);
}

#[test]
fn shape_line_skips_blank_and_unkeyed() {
    assert!(parse_shape_line("   \n").unwrap().is_none());
    assert!(parse_shape_line(r#"{"type":"rect"}"#).unwrap().is_none());
    assert!(parse_shape_line(r#"{"objectId":""}"#).unwrap().is_none());
}

#[test]
fn shape_line_rejects_bad_json() {
    assert!(matches!(parse_shape_line("{nope"), Err(CliError::InvalidJson(_))));
}

#[test]
fn missing_room_is_an_error() {
    let ctx = CliContext { base_url: "http://localhost".into(), room: None, name: None };
    assert!(matches!(ctx.room(), Err(CliError::MissingRoom)));
}

#[test]
fn session_parses_history_and_edits() {
    assert_eq!(parse_session_line("undo\n").unwrap(), Some(SessionCommand::Undo));
    assert_eq!(parse_session_line("  redo ").unwrap(), Some(SessionCommand::Redo));
    assert_eq!(
        parse_session_line("delete s1").unwrap(),
        Some(SessionCommand::Delete { id: "s1".into() })
    );
    assert_eq!(
        parse_session_line(r#"set s1 {"type": "rect", "left": 4}"#).unwrap(),
        Some(SessionCommand::Set {
            id: "s1".into(),
            shape: serde_json::json!({ "type": "rect", "left": 4 }),
        })
    );
    assert_eq!(
        parse_session_line("react 🔥 10 -2.5").unwrap(),
        Some(SessionCommand::React { emoji: "🔥".into(), x: 10.0, y: -2.5 })
    );
}

#[test]
fn session_skips_blank_and_comments() {
    assert_eq!(parse_session_line("").unwrap(), None);
    assert_eq!(parse_session_line("# set up the board").unwrap(), None);
}

#[test]
fn session_rejects_malformed_lines() {
    let lines = [
        "undo now",
        "delete",
        "delete a b",
        "set s1",
        "react 🔥 1",
        "react 🔥 x 1",
        "paint s1",
    ];
    for line in lines {
        assert!(
            matches!(parse_session_line(line), Err(CliError::BadCommand(_))),
            "accepted {line:?}"
        );
    }
    assert!(matches!(parse_session_line("set s1 {nope"), Err(CliError::InvalidJson(_))));
}

#[test]
fn session_commands_map_to_syscalls() {
    assert_eq!(SessionCommand::Undo.syscall(), "history:undo");
    let delete = SessionCommand::Delete { id: "a".into() };
    assert_eq!(delete.payload(), serde_json::json!({ "id": "a" }));
    let react = SessionCommand::React { emoji: "👍".into(), x: 0.0, y: 0.0 };
    assert_eq!(react.syscall(), "event:broadcast");
    assert!(!react.expects_reply());
    assert!(SessionCommand::Redo.expects_reply());
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_registration_stamps_activity() {
    let reg = AgentRegistration::new("amber-owl", 42, "sess-1", "/tmp/p", 1_000);
    assert_eq!(reg.activity.last_activity_at, 1_000);
    assert!(reg.reservations.is_empty());
    assert!(!reg.is_human);
}

#[test]
fn unknown_fields_survive_roundtrip() {
    let json = r#"{
        "name": "amber-owl",
        "pid": 42,
        "session_id": "sess-1",
        "cwd": "/tmp/p",
        "started_at": 5,
        "future_field": {"nested": true}
    }"#;
    let reg: AgentRegistration = serde_json::from_str(json).unwrap();
    assert!(reg.extra.contains_key("future_field"));
    let out = serde_json::to_string(&reg).unwrap();
    assert!(out.contains("future_field"));
}

#[test]
fn reservation_reason_is_optional() {
    let res = Reservation::new("src/lib.rs");
    assert!(serde_json::to_string(&res).unwrap() == r#"{"path":"src/lib.rs"}"#);
    let with = Reservation::new("src/").reason("refactor");
    assert_eq!(with.reason.as_deref(), Some("refactor"));
}

#[test]
fn session_stats_default_on_missing() {
    let json = r#"{"name":"n","pid":1,"session_id":"s","cwd":"/","started_at":0}"#;
    let reg: AgentRegistration = serde_json::from_str(json).unwrap();
    assert_eq!(reg.session.tool_calls, 0);
    assert_eq!(reg.activity.last_activity_at, 0);
}

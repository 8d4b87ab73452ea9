// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn request(json: &str) -> ActionRequest {
    serde_json::from_str(json).unwrap()
}

#[test]
fn parses_task_start_with_id_aliases() {
    for field in ["id", "taskId", "target"] {
        let req = request(&format!(r#"{{"action": "task.start", "{field}": "task-3"}}"#));
        assert_eq!(
            parse_action(&req).unwrap(),
            CrewAction::TaskStart { id: TaskId::new(3) }
        );
    }
}

#[test]
fn task_done_requires_summary() {
    let req = request(r#"{"action": "task.done", "id": "task-1"}"#);
    let err = parse_action(&req).unwrap_err();
    assert_eq!(err.code(), "missing_value");

    let req = request(r#"{"action": "task.done", "id": "task-1", "summary": "did it"}"#);
    assert!(matches!(parse_action(&req).unwrap(), CrewAction::TaskDone { .. }));
}

#[test]
fn block_requires_reason() {
    let req = request(r#"{"action": "task.block", "id": "task-1"}"#);
    assert_eq!(parse_action(&req).unwrap_err().code(), "missing_reason");
}

#[test]
fn unknown_action_and_operation_codes() {
    let req = request(r#"{"action": "bogus"}"#);
    assert_eq!(parse_action(&req).unwrap_err().code(), "unknown_action");

    let req = request(r#"{"action": "task.bogus"}"#);
    assert_eq!(parse_action(&req).unwrap_err().code(), "unknown_operation");

    let req = request(r#"{"action": ""}"#);
    assert_eq!(parse_action(&req).unwrap_err().code(), "missing_operation");
}

#[test]
fn join_and_config_are_preregistration_actions() {
    let join = parse_action(&request(r#"{"action": "join"}"#)).unwrap();
    assert!(join.allowed_unregistered());

    let config = parse_action(&request(
        r#"{"action": "config.add_auto_register_path", "autoRegisterPath": "/home/u/code/*"}"#,
    ))
    .unwrap();
    assert!(config.allowed_unregistered());

    let work = parse_action(&request(r#"{"action": "work"}"#)).unwrap();
    assert!(!work.allowed_unregistered());
}

#[test]
fn plan_carries_optional_fields() {
    let req = request(r#"{"action": "plan", "prompt": "build it", "autoWork": false}"#);
    assert_eq!(
        parse_action(&req).unwrap(),
        CrewAction::Plan { prd: None, prompt: Some("build it".into()), auto_work: Some(false) }
    );
}

#[test]
fn work_defaults() {
    let req = request(r#"{"action": "work"}"#);
    assert_eq!(
        parse_action(&req).unwrap(),
        CrewAction::Work { autonomous: false, concurrency: None, model: None }
    );
    let req = request(r#"{"action": "work", "autonomous": true, "concurrency": 4.0}"#);
    assert!(matches!(
        parse_action(&req).unwrap(),
        CrewAction::Work { autonomous: true, concurrency: Some(c), .. } if c == 4.0
    ));
}

#[test]
fn reserve_requires_paths() {
    let req = request(r#"{"action": "reserve"}"#);
    assert_eq!(parse_action(&req).unwrap_err().code(), "missing_paths");
}

#[test]
fn release_without_paths_means_all() {
    let req = request(r#"{"action": "release"}"#);
    assert_eq!(parse_action(&req).unwrap(), CrewAction::Release { paths: None });
}

#[test]
fn send_requires_recipient_and_message() {
    let req = request(r#"{"action": "send", "message": "hi"}"#);
    assert_eq!(parse_action(&req).unwrap_err().code(), "missing_name");
    let req = request(r#"{"action": "send", "to": "owl"}"#);
    assert_eq!(parse_action(&req).unwrap_err().code(), "missing_message");
}

#[test]
fn invalid_task_id_is_missing_id() {
    let req = request(r#"{"action": "task.start", "id": "not-a-task"}"#);
    assert_eq!(parse_action(&req).unwrap_err().code(), "missing_id");
}

#[test]
fn revise_tree_parses() {
    let req = request(r#"{"action": "task.revise-tree", "id": "task-2", "prompt": "split it"}"#);
    assert_eq!(
        parse_action(&req).unwrap(),
        CrewAction::TaskReviseTree { id: TaskId::new(2), prompt: Some("split it".into()) }
    );
}

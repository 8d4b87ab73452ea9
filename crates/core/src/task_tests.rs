// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    todo        = { TaskStatus::Todo, "todo" },
    in_progress = { TaskStatus::InProgress, "in_progress" },
    done        = { TaskStatus::Done, "done" },
    blocked     = { TaskStatus::Blocked, "blocked" },
)]
fn status_display_matches_wire_form(status: TaskStatus, expected: &str) {
    assert_eq!(status.to_string(), expected);
    let json = serde_json::to_string(&status).unwrap();
    assert_eq!(json, format!("{expected:?}"));
}

#[test]
fn new_task_is_todo_with_no_lifecycle_fields() {
    let task = Task::new(TaskId::new(1), "build parser", "2026-01-01T00:00:00.000Z");
    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(task.attempt_count, 0);
    assert!(task.started_at.is_none());
    assert!(task.depends_on.is_empty());
    assert!(!task.milestone);
}

#[test]
fn clear_lifecycle_keeps_attempts() {
    let mut task = Task::builder()
        .status(TaskStatus::Done)
        .attempt_count(3)
        .started_at("2026-01-01T01:00:00.000Z")
        .completed_at("2026-01-01T02:00:00.000Z")
        .summary("done")
        .assigned_to("crimson-fox")
        .build();
    task.clear_lifecycle_fields();
    assert_eq!(task.attempt_count, 3);
    assert!(task.started_at.is_none());
    assert!(task.completed_at.is_none());
    assert!(task.summary.is_none());
    assert!(task.assigned_to.is_none());
}

#[test]
fn serde_omits_empty_optionals_and_false_milestone() {
    let task = Task::new(TaskId::new(2), "t", "2026-01-01T00:00:00.000Z");
    let json = serde_json::to_string(&task).unwrap();
    assert!(!json.contains("milestone"));
    assert!(!json.contains("summary"));
    assert!(json.contains("\"id\":\"task-2\""));
}

#[test]
fn serde_roundtrip_preserves_dependencies() {
    let task = Task::builder()
        .depends_on(vec![TaskId::new(1), TaskId::new(3)])
        .milestone(true)
        .build();
    let json = serde_json::to_string(&task).unwrap();
    let back: Task = serde_json::from_str(&json).unwrap();
    assert_eq!(back.depends_on, vec![TaskId::new(1), TaskId::new(3)]);
    assert!(back.milestone);
}

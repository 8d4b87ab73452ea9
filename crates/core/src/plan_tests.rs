// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn file_plan_is_not_prompt_only() {
    let plan = Plan::new("docs/PRD.md", "2026-01-01T00:00:00.000Z");
    assert!(!plan.is_prompt_only());
    assert_eq!(plan.task_count, 0);
}

#[test]
fn sentinel_marks_prompt_only() {
    let mut plan = Plan::new(PROMPT_SENTINEL, "2026-01-01T00:00:00.000Z");
    plan.prompt = Some("build a widget".to_string());
    assert!(plan.is_prompt_only());
}

#[test]
fn serde_roundtrip() {
    let plan = Plan::builder().prd("(prompt)").prompt("inline spec").task_count(3).build();
    let json = serde_json::to_string(&plan).unwrap();
    let back: Plan = serde_json::from_str(&json).unwrap();
    assert_eq!(back.prd, "(prompt)");
    assert_eq!(back.prompt.as_deref(), Some("inline spec"));
    assert_eq!(back.task_count, 3);
}

#[test]
fn missing_counts_default_to_zero() {
    let plan: Plan = serde_json::from_str(
        r#"{"prd":"PRD.md","created_at":"a","updated_at":"b"}"#,
    )
    .unwrap();
    assert_eq!(plan.task_count, 0);
    assert_eq!(plan.completed_count, 0);
}

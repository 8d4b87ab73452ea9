// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::engine::EngineError;
use crate::test_support::engine_fixture;
use pim_core::{TaskId, TaskStatus};
use pim_runner::AgentResult;

fn ok(output: &str) -> AgentResult {
    AgentResult { exit_code: 0, output: output.to_string(), ..Default::default() }
}

fn chain_fixture() -> (crate::test_support::TestEngine, TaskId, TaskId, TaskId) {
    let f = engine_fixture();
    let store = &f.engine.store;
    store.create_plan("PRD.md", None).unwrap();
    let a = store.create_task("A", Some("spec a"), &[]).unwrap();
    let b = store.create_task("B", Some("spec b"), &[a.id]).unwrap();
    let c = store.create_task("C", Some("spec c"), &[b.id]).unwrap();
    (f, a.id, b.id, c.id)
}

#[tokio::test(flavor = "multi_thread")]
async fn revise_updates_spec_and_title() {
    let (f, a, _, _) = chain_fixture();
    f.spawner.push_result(ok(
        "```revised-task\n{\"title\": \"A improved\", \"spec\": \"tighter spec\"}\n```",
    ));

    f.engine.revise_task(a, Some("make it tighter")).await.unwrap();
    let task = f.engine.store.load_task(a).unwrap();
    assert_eq!(task.title, "A improved");
    assert_eq!(f.engine.store.read_spec(a).unwrap(), "tighter spec");
    let progress = f.engine.store.read_progress(a).unwrap();
    assert!(progress.contains("Spec revised: make it tighter"));
}

#[tokio::test(flavor = "multi_thread")]
async fn revise_rejects_in_progress_tasks() {
    let (f, a, _, _) = chain_fixture();
    f.engine.store.start_task(a, "owl").unwrap();
    assert!(matches!(
        f.engine.revise_task(a, None).await.unwrap_err(),
        EngineError::ActiveWorker(_)
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn revise_rejects_while_planning_or_autonomous() {
    let (f, a, _, _) = chain_fixture();
    f.engine.coordinator.start_planning_run(f.engine.store.paths(), 1);
    assert!(matches!(
        f.engine.revise_task(a, None).await.unwrap_err(),
        EngineError::PlanningActive
    ));
    f.engine.coordinator.finish_planning_run(f.engine.store.paths());

    f.engine.coordinator.start_autonomous(f.engine.store.paths().root(), 1);
    assert!(matches!(
        f.engine.revise_task(a, None).await.unwrap_err(),
        EngineError::AutonomousActive
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn revise_without_block_fails_cleanly() {
    let (f, a, _, _) = chain_fixture();
    f.spawner.push_result(ok("no fenced block here"));
    assert!(matches!(
        f.engine.revise_task(a, None).await.unwrap_err(),
        EngineError::RevisionFailed(_)
    ));
    // spec untouched
    assert_eq!(f.engine.store.read_spec(a).unwrap(), "spec a");
}

#[tokio::test(flavor = "multi_thread")]
async fn revise_tree_updates_creates_and_resets() {
    let (f, a, b, c) = chain_fixture();
    let store = &f.engine.store;
    // A is done; B and C pending
    store.start_task(a, "owl").unwrap();
    store.complete_task(a, "done", None).unwrap();

    f.spawner.push_result(ok(
        r#"```tasks-json
[
  {"id": "task-2", "title": "B sharpened", "description": "new b spec"},
  {"title": "D", "description": "extra work", "dependsOn": ["task-2"]}
]
```"#,
    ));

    let outcome = f.engine.revise_tree(a, Some("rework the middle")).await.unwrap();
    assert_eq!(outcome.updated, vec![b]);
    assert_eq!(outcome.created.len(), 1);
    // A stays done; B and C reset to todo
    assert_eq!(store.load_task(a).unwrap().status, TaskStatus::Done);
    assert!(outcome.reset.contains(&b));
    assert!(outcome.reset.contains(&c));

    let revised_b = store.load_task(b).unwrap();
    assert_eq!(revised_b.title, "B sharpened");
    assert_eq!(store.read_spec(b).unwrap(), "new b spec");

    let d = store.load_task(outcome.created[0]).unwrap();
    assert_eq!(d.title, "D");
    assert_eq!(d.depends_on, vec![b]);
}

#[tokio::test(flavor = "multi_thread")]
async fn revise_tree_rejects_ids_outside_subtree() {
    let (f, _, b, _) = chain_fixture();
    let store = &f.engine.store;
    let other = store.create_task("unrelated", None, &[]).unwrap();

    f.spawner.push_result(ok(&format!(
        "```tasks-json\n[{{\"id\": \"{}\", \"title\": \"hijack\"}}]\n```",
        other.id
    )));
    let err = f.engine.revise_tree(b, None).await.unwrap_err();
    assert!(matches!(err, EngineError::RevisionFailed(_)));
    assert_eq!(store.load_task(other.id).unwrap().title, "unrelated");
}

#[tokio::test(flavor = "multi_thread")]
async fn revise_tree_bounds_new_tasks() {
    let (f, _, _, c) = chain_fixture();
    // subtree of C is just C: bound = max(5, 2*1) = 5
    let entries: Vec<String> =
        (0..6).map(|n| format!("{{\"title\": \"extra {n}\"}}")).collect();
    f.spawner.push_result(ok(&format!("```tasks-json\n[{}]\n```", entries.join(","))));

    let err = f.engine.revise_tree(c, None).await.unwrap_err();
    assert!(matches!(err, EngineError::RevisionFailed(_)));
    assert_eq!(f.engine.store.all_tasks().len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn revise_tree_never_self_depends() {
    let (f, _, _, c) = chain_fixture();
    f.spawner.push_result(ok(
        "```tasks-json\n[{\"id\": \"task-3\", \"title\": \"C\", \"dependsOn\": [\"task-3\", \"task-2\"]}]\n```",
    ));
    f.engine.revise_tree(c, None).await.unwrap();
    let task = f.engine.store.load_task(c).unwrap();
    assert_eq!(task.depends_on, vec![TaskId::new(2)]);
}

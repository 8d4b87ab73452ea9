// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::engine::EngineError;
use crate::test_support::{engine_fixture, engine_with_config, planner_output};
use pim_core::{CrewConfig, FeedEventKind, TaskStatus};
use pim_runner::AgentResult;

const THREE_TASKS: &str = r#"[
  {"title": "A", "description": "first", "dependsOn": []},
  {"title": "B", "description": "second", "dependsOn": ["A"]},
  {"title": "C", "description": "third", "dependsOn": ["A", "B"]}
]"#;

fn write_prd(fixture: &crate::test_support::TestEngine, rel: &str, content: &str) {
    let path = fixture.engine.store.paths().root().join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn ok_result(output: String) -> AgentResult {
    AgentResult { exit_code: 0, output, ..Default::default() }
}

#[tokio::test(flavor = "multi_thread")]
async fn plans_from_discovered_prd_with_pruned_deps() {
    let mut config = CrewConfig::default();
    config.planning.max_passes = 1;
    let f = engine_with_config(config);
    write_prd(&f, "docs/PRD.md", "build the widget");
    f.spawner.push_result(ok_result(planner_output(THREE_TASKS)));

    let outcome = f.engine.plan(PlanParams::default()).await.unwrap();
    assert_eq!(outcome.prd, "docs/PRD.md");
    assert_eq!(outcome.task_ids.len(), 3);
    assert_eq!(outcome.passes_run, 1);
    assert!(!outcome.parse_warning);

    let tasks = f.engine.store.all_tasks();
    assert_eq!(tasks.len(), 3);
    assert_eq!(tasks[0].title, "A");
    // C's direct dep on A is transitively reachable through B and pruned
    assert_eq!(tasks[2].depends_on, vec![tasks[1].id]);
    assert_eq!(f.engine.store.load_plan().unwrap().task_count, 3);

    // spec + outline landed on disk
    assert!(f.engine.store.paths().plan_spec_path().exists());
    assert!(f.engine.store.paths().planning_outline_path().exists());

    let kinds: Vec<FeedEventKind> =
        f.engine.feed.read(100).into_iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&FeedEventKind::PlanStart));
    assert!(kinds.contains(&FeedEventKind::PlanPassStart));
    assert!(kinds.contains(&FeedEventKind::PlanPassDone));
    assert!(kinds.contains(&FeedEventKind::PlanDone));
}

#[tokio::test(flavor = "multi_thread")]
async fn prompt_only_plan_uses_sentinel() {
    let mut config = CrewConfig::default();
    config.planning.max_passes = 1;
    let f = engine_with_config(config);
    f.spawner.push_result(ok_result(planner_output(r#"[{"title": "Solo"}]"#)));

    let outcome = f
        .engine
        .plan(PlanParams { prompt: Some("inline spec".into()), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(outcome.prd, "(prompt)");
    let plan = f.engine.store.load_plan().unwrap();
    assert!(plan.is_prompt_only());
    assert_eq!(plan.prompt.as_deref(), Some("inline spec"));
}

#[tokio::test(flavor = "multi_thread")]
async fn explicit_missing_prd_errors() {
    let f = engine_fixture();
    let err = f
        .engine
        .plan(PlanParams { prd: Some("nope.md".into()), ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PrdNotFound(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn no_prd_and_no_prompt_errors() {
    let f = engine_fixture();
    assert!(matches!(
        f.engine.plan(PlanParams::default()).await.unwrap_err(),
        EngineError::NoPrd
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn existing_plan_with_tasks_rejects_replan_without_prompt() {
    let mut config = CrewConfig::default();
    config.planning.max_passes = 1;
    let f = engine_with_config(config);
    write_prd(&f, "PRD.md", "spec");
    f.spawner.push_result(ok_result(planner_output(r#"[{"title": "One"}]"#)));
    f.engine.plan(PlanParams::default()).await.unwrap();

    assert!(matches!(
        f.engine.plan(PlanParams::default()).await.unwrap_err(),
        EngineError::PlanExists
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn replan_with_prompt_wipes_tasks_but_keeps_progress() {
    let mut config = CrewConfig::default();
    config.planning.max_passes = 1;
    let f = engine_with_config(config);
    write_prd(&f, "PRD.md", "spec");
    f.spawner.push_result(ok_result(planner_output(r#"[{"title": "Old"}]"#)));
    let first = f.engine.plan(PlanParams::default()).await.unwrap();
    f.engine.store.append_progress(first.task_ids[0], "owl", "history").unwrap();

    f.spawner.push_result(ok_result(planner_output(r#"[{"title": "New"}]"#)));
    let second = f
        .engine
        .plan(PlanParams { prompt: Some("steer it differently".into()), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(second.task_ids.len(), 1);
    let tasks = f.engine.store.all_tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "New");
    // old progress notes survive the wipe
    assert!(f.engine.store.read_progress(first.task_ids[0]).is_some());
    // the steering prompt landed in the Notes section
    let progress =
        pim_store::read_string(&f.engine.store.paths().planning_progress_path()).unwrap();
    assert!(progress.contains("steering: steer it differently"));
}

#[tokio::test(flavor = "multi_thread")]
async fn replan_rejected_while_tasks_run() {
    let mut config = CrewConfig::default();
    config.planning.max_passes = 1;
    let f = engine_with_config(config);
    write_prd(&f, "PRD.md", "spec");
    f.spawner.push_result(ok_result(planner_output(r#"[{"title": "One"}]"#)));
    let outcome = f.engine.plan(PlanParams::default()).await.unwrap();
    f.engine.store.start_task(outcome.task_ids[0], "owl").unwrap();

    let err = f
        .engine
        .plan(PlanParams { prompt: Some("again".into()), ..Default::default() })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::TasksInProgress));
}

#[tokio::test(flavor = "multi_thread")]
async fn pass_one_failure_deletes_plan() {
    let mut config = CrewConfig::default();
    config.planning.max_passes = 2;
    let f = engine_with_config(config);
    write_prd(&f, "PRD.md", "spec");
    f.spawner.push_result(AgentResult { exit_code: 1, ..Default::default() });

    let err = f.engine.plan(PlanParams::default()).await.unwrap_err();
    assert!(matches!(err, EngineError::PlannerFailed(_)));
    assert!(!f.engine.store.has_plan());
    assert!(f.engine.store.all_tasks().is_empty());
    let kinds: Vec<FeedEventKind> =
        f.engine.feed.read(100).into_iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&FeedEventKind::PlanFailed));
    assert!(f.notifier.contains("planning failed"));
    assert!(f
        .notifier
        .events()
        .iter()
        .any(|(severity, _)| *severity == pim_core::Severity::Error));
}

#[tokio::test(flavor = "multi_thread")]
async fn later_pass_failure_keeps_previous_output() {
    let mut config = CrewConfig::default();
    config.planning.max_passes = 2;
    let f = engine_with_config(config);
    write_prd(&f, "PRD.md", "spec");
    f.spawner.push_result(ok_result(planner_output(r#"[{"title": "Kept"}]"#)));
    f.spawner.push_result(ok_result("NEEDS_WORK\n".to_string()));
    f.spawner.push_result(AgentResult { exit_code: 1, ..Default::default() });

    let outcome = f.engine.plan(PlanParams::default()).await.unwrap();
    // pass 2 failed: the pass-1 output still materializes
    assert_eq!(outcome.task_ids.len(), 1);
    assert_eq!(f.engine.store.all_tasks()[0].title, "Kept");
    assert!(f.engine.store.has_plan());
}

#[tokio::test(flavor = "multi_thread")]
async fn review_disabled_stops_after_one_pass() {
    let mut config = CrewConfig::default();
    config.planning.max_passes = 3;
    config.review.enabled = false;
    let f = engine_with_config(config);
    write_prd(&f, "PRD.md", "spec");
    f.spawner.push_result(ok_result(planner_output(r#"[{"title": "Kept"}]"#)));

    let outcome = f.engine.plan(PlanParams::default()).await.unwrap();
    assert_eq!(outcome.passes_run, 1);
    assert_eq!(f.spawner.call_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn ship_verdict_stops_the_pass_loop() {
    let mut config = CrewConfig::default();
    config.planning.max_passes = 3;
    let f = engine_with_config(config);
    write_prd(&f, "PRD.md", "spec");
    // pass 1 output, then reviewer says SHIP
    f.spawner.push_result(ok_result(planner_output(r#"[{"title": "One"}]"#)));
    f.spawner.push_result(ok_result("Solid plan.\n\nSHIP\n".to_string()));

    let outcome = f.engine.plan(PlanParams::default()).await.unwrap();
    assert_eq!(outcome.passes_run, 1);
    assert_eq!(f.spawner.call_count(), 2);
    let progress =
        pim_store::read_string(&f.engine.store.paths().planning_progress_path()).unwrap();
    assert!(progress.contains("### Pass 1"));
    assert!(progress.contains("### Review 1 — SHIP"));
}

#[tokio::test(flavor = "multi_thread")]
async fn needs_work_drives_a_second_pass() {
    let mut config = CrewConfig::default();
    config.planning.max_passes = 2;
    let f = engine_with_config(config);
    write_prd(&f, "PRD.md", "spec");
    f.spawner.push_result(ok_result(planner_output(r#"[{"title": "Draft"}]"#)));
    f.spawner.push_result(ok_result("Split the work.\nNEEDS_WORK\n".to_string()));
    f.spawner.push_result(ok_result(planner_output(r#"[{"title": "Refined"}]"#)));

    let outcome = f.engine.plan(PlanParams::default()).await.unwrap();
    assert_eq!(outcome.passes_run, 2);
    assert_eq!(f.engine.store.all_tasks()[0].title, "Refined");
}

#[tokio::test(flavor = "multi_thread")]
async fn unparseable_output_keeps_spec_with_warning() {
    let mut config = CrewConfig::default();
    config.planning.max_passes = 1;
    let f = engine_with_config(config);
    write_prd(&f, "PRD.md", "spec");
    f.spawner.push_result(ok_result("prose with no task list at all".to_string()));

    let outcome = f.engine.plan(PlanParams::default()).await.unwrap();
    assert!(outcome.parse_warning);
    assert!(outcome.task_ids.is_empty());
    assert!(f.engine.store.has_plan());
    let spec = pim_store::read_string(&f.engine.store.paths().plan_spec_path()).unwrap();
    assert!(spec.contains("prose with no task list"));
    assert!(f.notifier.contains("create tasks manually"));
}

#[tokio::test(flavor = "multi_thread")]
async fn successful_plan_queues_auto_work() {
    let mut config = CrewConfig::default();
    config.planning.max_passes = 1;
    let f = engine_with_config(config);
    write_prd(&f, "PRD.md", "spec");
    f.spawner.push_result(ok_result(planner_output(r#"[{"title": "One"}]"#)));

    f.engine.plan(PlanParams::default()).await.unwrap();
    assert!(f.engine.coordinator.take_pending_auto_work().is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn auto_work_false_skips_the_queue() {
    let mut config = CrewConfig::default();
    config.planning.max_passes = 1;
    let f = engine_with_config(config);
    write_prd(&f, "PRD.md", "spec");
    f.spawner.push_result(ok_result(planner_output(r#"[{"title": "One"}]"#)));

    f.engine
        .plan(PlanParams { auto_work: Some(false), ..Default::default() })
        .await
        .unwrap();
    assert!(f.engine.coordinator.take_pending_auto_work().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn markdown_fallback_materializes_tasks() {
    let mut config = CrewConfig::default();
    config.planning.max_passes = 1;
    let f = engine_with_config(config);
    write_prd(&f, "PRD.md", "spec");
    let output = "## 1. A\n\n## 2. B\n\n## 3. C\n\n## 4. D\n\n\
                  ### Task 1: First thing\nBody\n\n### Task 2: Second thing\nDependencies: First thing\n";
    f.spawner.push_result(ok_result(output.to_string()));

    let outcome = f.engine.plan(PlanParams::default()).await.unwrap();
    assert_eq!(outcome.task_ids.len(), 2);
    let tasks = f.engine.store.all_tasks();
    assert_eq!(tasks[1].depends_on, vec![tasks[0].id]);
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pim_core::FakeClock;

fn store(dir: &tempfile::TempDir) -> TaskStore<FakeClock> {
    TaskStore::with_clock(dir.path(), FakeClock::new())
}

#[test]
fn plan_crud() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    assert!(!store.has_plan());

    store.create_plan("PRD.md", None).unwrap();
    assert!(store.has_plan());
    let plan = store.load_plan().unwrap();
    assert_eq!(plan.prd, "PRD.md");
    assert_eq!(plan.task_count, 0);

    store.update_plan(|p| p.task_count = 5).unwrap();
    assert_eq!(store.load_plan().unwrap().task_count, 5);
}

#[test]
fn update_plan_without_plan_errors() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    assert!(matches!(store.update_plan(|_| {}), Err(StoreError::NoPlan)));
}

#[test]
fn delete_plan_cascades_to_tasks_and_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    store.create_plan("(prompt)", Some("spec")).unwrap();
    let task = store.create_task("a", Some("desc"), &[]).unwrap();
    store.start_task(task.id, "owl").unwrap();
    store.block_task(task.id, "stuck on io").unwrap();
    assert!(store.paths().block_path(task.id).exists());

    store.delete_plan().unwrap();
    assert!(!store.has_plan());
    assert!(store.all_tasks().is_empty());
    assert!(!store.paths().block_path(task.id).exists());
}

#[test]
fn prompt_plan_keeps_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let plan = store.create_plan(pim_core::PROMPT_SENTINEL, Some("build a cli")).unwrap();
    assert!(plan.is_prompt_only());
    assert_eq!(store.load_plan().unwrap().prompt.as_deref(), Some("build a cli"));
}

#[test]
fn progress_lines_carry_iso_and_agent() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let task = store.create_task("a", None, &[]).unwrap();
    store.append_progress(task.id, "amber-owl", "started work").unwrap();
    store.append_progress(task.id, "amber-owl", "finished").unwrap();
    let progress = store.read_progress(task.id).unwrap();
    let lines: Vec<&str> = progress.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("(amber-owl) started work"));
    assert!(lines[0].starts_with('['));
}

#[test]
fn spec_pending_counts_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let task = store.create_task("a", None, &[]).unwrap();
    assert!(store.spec_is_empty(task.id));
    store.write_spec(task.id, "## Do the thing").unwrap();
    assert!(!store.spec_is_empty(task.id));
}

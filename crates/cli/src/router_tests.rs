// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::context::Session;
use pim_core::FakeClock;
use pim_engine::{AgentProfile, AgentRoster};
use pim_runner::FakeSpawner;
use pim_store::BasePaths;
use std::sync::Arc;

struct Fixture {
    _dir: tempfile::TempDir,
    session: Session<FakeSpawner, FakeClock>,
    spawner: Arc<FakeSpawner>,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("project");
    std::fs::create_dir_all(project.join(".pi/messenger/crew")).unwrap();
    // single planning pass, no reviewer round: router tests script exactly
    // one planner result
    std::fs::write(
        project.join(".pi/messenger/crew/config.json"),
        r#"{"planning": {"maxPasses": 1}, "review": {"enabled": false}}"#,
    )
    .unwrap();
    let spawner = Arc::new(FakeSpawner::new());
    let roster = AgentRoster {
        planner: Some(AgentProfile::new("pi")),
        worker: Some(AgentProfile::new("pi")),
        reviewer: Some(AgentProfile::new("pi")),
    };
    let session = Session::assemble(
        &project,
        BasePaths::new(dir.path().join("base")),
        FakeClock::new(),
        Arc::clone(&spawner),
        roster,
    );
    Fixture { _dir: dir, session, spawner }
}

fn request(json: &str) -> ActionRequest {
    serde_json::from_str(json).unwrap()
}

async fn run(fixture: &mut Fixture, json: &str) -> ActionResponse {
    execute_crew_action(&request(json), &mut fixture.session).await
}

#[tokio::test(flavor = "multi_thread")]
async fn unregistered_sessions_are_gated() {
    let mut f = fixture();
    let response = run(&mut f, r#"{"action": "task.list"}"#).await;
    assert_eq!(response.details.error.as_deref(), Some("not_registered"));
}

#[tokio::test(flavor = "multi_thread")]
async fn join_registers_and_unlocks_actions() {
    let mut f = fixture();
    let response = run(&mut f, r#"{"action": "join", "name": "amber-owl"}"#).await;
    assert!(!response.is_error(), "{response:?}");
    assert_eq!(f.session.registered.as_deref(), Some("amber-owl"));
    assert!(f.session.engine.registry.load("amber-owl").is_some());

    let response = run(&mut f, r#"{"action": "task.list"}"#).await;
    assert!(!response.is_error());
    assert_eq!(response.text, "no tasks");
}

#[tokio::test(flavor = "multi_thread")]
async fn join_twice_is_idempotent() {
    let mut f = fixture();
    run(&mut f, r#"{"action": "join", "name": "amber-owl"}"#).await;
    let response = run(&mut f, r#"{"action": "join"}"#).await;
    assert!(response.text.contains("already registered"));
}

#[tokio::test(flavor = "multi_thread")]
async fn task_lifecycle_through_the_router() {
    let mut f = fixture();
    run(&mut f, r#"{"action": "join", "name": "amber-owl"}"#).await;
    f.session.engine.store.create_plan("PRD.md", None).unwrap();

    let created =
        run(&mut f, r#"{"action": "task.create", "title": "build parser"}"#).await;
    assert!(!created.is_error());
    assert_eq!(created.details.extra["id"], "task-1");

    let started = run(&mut f, r#"{"action": "task.start", "id": "task-1"}"#).await;
    assert!(!started.is_error());

    let done = run(
        &mut f,
        r#"{"action": "task.done", "id": "task-1", "summary": "parser built"}"#,
    )
    .await;
    assert!(!done.is_error());
    assert_eq!(f.session.engine.store.load_plan().unwrap().completed_count, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_transition_maps_to_invalid_status() {
    let mut f = fixture();
    run(&mut f, r#"{"action": "join", "name": "amber-owl"}"#).await;
    f.session.engine.store.create_plan("PRD.md", None).unwrap();
    run(&mut f, r#"{"action": "task.create", "title": "a"}"#).await;

    let response = run(
        &mut f,
        r#"{"action": "task.done", "id": "task-1", "summary": "nope"}"#,
    )
    .await;
    assert_eq!(response.details.error.as_deref(), Some("invalid_status"));
}

#[tokio::test(flavor = "multi_thread")]
async fn work_without_plan_returns_no_plan() {
    let mut f = fixture();
    run(&mut f, r#"{"action": "join", "name": "amber-owl"}"#).await;
    let response = run(&mut f, r#"{"action": "work"}"#).await;
    assert_eq!(response.details.error.as_deref(), Some("no_plan"));
}

#[tokio::test(flavor = "multi_thread")]
async fn send_and_reserve_roundtrip() {
    let mut f = fixture();
    run(&mut f, r#"{"action": "join", "name": "amber-owl"}"#).await;

    let reserve =
        run(&mut f, r#"{"action": "reserve", "paths": ["src/api"], "reason": "rewiring"}"#).await;
    assert!(!reserve.is_error());
    let registration = f.session.engine.registry.load("amber-owl").unwrap();
    assert_eq!(registration.reservations.len(), 1);

    let release = run(&mut f, r#"{"action": "release"}"#).await;
    assert!(!release.is_error());
    assert!(f.session.engine.registry.load("amber-owl").unwrap().reservations.is_empty());

    // message to ourselves lands in our inbox
    let send = run(
        &mut f,
        r#"{"action": "send", "to": "amber-owl", "message": "note to self"}"#,
    )
    .await;
    assert!(!send.is_error());
    let drained = f.session.engine.inbox.drain("amber-owl");
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].text, "note to self");
}

#[tokio::test(flavor = "multi_thread")]
async fn split_via_router() {
    let mut f = fixture();
    run(&mut f, r#"{"action": "join", "name": "amber-owl"}"#).await;
    f.session.engine.store.create_plan("PRD.md", None).unwrap();
    run(&mut f, r#"{"action": "task.create", "title": "big"}"#).await;

    let response = run(
        &mut f,
        r#"{"action": "task.split", "id": "task-1", "subtasks": ["left half", "right half"]}"#,
    )
    .await;
    assert!(!response.is_error());
    let parent = f.session.engine.store.load_task(pim_core::TaskId::new(1)).unwrap();
    assert!(parent.milestone);

    let single = run(
        &mut f,
        r#"{"action": "task.split", "id": "task-2", "subtasks": ["only"]}"#,
    )
    .await;
    assert_eq!(single.details.error.as_deref(), Some("insufficient_subtasks"));
}

#[tokio::test(flavor = "multi_thread")]
async fn plan_through_router_uses_fake_planner() {
    let mut f = fixture();
    run(&mut f, r#"{"action": "join", "name": "amber-owl"}"#).await;
    std::fs::write(f.session.engine.store.paths().root().join("PRD.md"), "the spec").unwrap();
    f.spawner.push_result(pim_runner::AgentResult {
        exit_code: 0,
        output: "## 1. a\n\n## 2. b\n\n## 3. c\n\n## 4. d\n\n```tasks-json\n[{\"title\": \"One\"}]\n```"
            .to_string(),
        ..Default::default()
    });

    let response = run(&mut f, r#"{"action": "plan", "autoWork": false}"#).await;
    assert!(!response.is_error(), "{response:?}");
    assert_eq!(response.details.extra["taskCount"], 1);
    assert_eq!(f.session.engine.store.all_tasks().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn plan_cancel_without_run_errors() {
    let mut f = fixture();
    run(&mut f, r#"{"action": "join", "name": "amber-owl"}"#).await;
    let response = run(&mut f, r#"{"action": "plan.cancel"}"#).await;
    assert!(response.is_error());
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_action_surfaces_code() {
    let mut f = fixture();
    run(&mut f, r#"{"action": "join", "name": "amber-owl"}"#).await;
    let response = run(&mut f, r#"{"action": "definitely.not.real"}"#).await;
    assert_eq!(response.details.error.as_deref(), Some("unknown_action"));
}

#[tokio::test(flavor = "multi_thread")]
async fn check_conflict_names_the_reserving_peer() {
    let mut f = fixture();
    run(&mut f, r#"{"action": "join", "name": "amber-owl"}"#).await;

    let mut peer = pim_core::RegistrationBuilder::default()
        .name("rusty-vole")
        .pid(std::process::id())
        .git_branch("main")
        .build();
    peer.reservations
        .push(pim_core::Reservation::new("src/api").reason("rewiring routes"));
    f.session.engine.registry.register(&peer).unwrap();

    let blocked =
        run(&mut f, r#"{"action": "check_conflict", "target": "src/api/handler.rs"}"#).await;
    assert!(!blocked.is_error());
    assert_eq!(blocked.details.extra["blocked"], true);
    assert_eq!(blocked.details.extra["peer"], "rusty-vole");
    assert!(blocked.text.contains("rusty-vole"));
    assert!(blocked.text.contains("branch main"));
    assert!(blocked.text.contains("rewiring routes"));

    let clear = run(&mut f, r#"{"action": "check_conflict", "paths": ["docs/notes.md"]}"#).await;
    assert_eq!(clear.details.extra["blocked"], false);

    let missing = run(&mut f, r#"{"action": "check_conflict"}"#).await;
    assert_eq!(missing.details.error.as_deref(), Some("missing_paths"));
}

#[tokio::test(flavor = "multi_thread")]
async fn reserve_notes_overlapping_peers() {
    let mut f = fixture();
    run(&mut f, r#"{"action": "join", "name": "amber-owl"}"#).await;

    let mut peer = pim_core::RegistrationBuilder::default()
        .name("rusty-vole")
        .pid(std::process::id())
        .build();
    peer.reservations.push(pim_core::Reservation::new("src"));
    f.session.engine.registry.register(&peer).unwrap();

    let response = run(&mut f, r#"{"action": "reserve", "paths": ["src/api"]}"#).await;
    assert!(!response.is_error());
    assert!(response.text.contains("note: overlaps rusty-vole holds src"));
}

#[tokio::test(flavor = "multi_thread")]
async fn check_mail_drains_the_inbox_once() {
    let mut f = fixture();
    run(&mut f, r#"{"action": "join", "name": "amber-owl"}"#).await;
    run(
        &mut f,
        r#"{"action": "send", "to": "amber-owl", "message": "ping yourself"}"#,
    )
    .await;

    // status reports the unread message without consuming it
    let status = run(&mut f, r#"{"action": "status"}"#).await;
    assert_eq!(status.details.extra["unread"], 1);
    assert!(status.text.contains("unread"));

    let mail = run(&mut f, r#"{"action": "check_mail"}"#).await;
    assert!(!mail.is_error());
    assert_eq!(mail.details.extra["count"], 1);
    assert!(mail.text.contains("[amber-owl] ping yourself"));

    let empty = run(&mut f, r#"{"action": "check_mail"}"#).await;
    assert_eq!(empty.details.extra["count"], 0);
    assert_eq!(run(&mut f, r#"{"action": "status"}"#).await.details.extra["unread"], 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn crew_spawn_runs_one_task_to_completion() {
    let mut f = fixture();
    run(&mut f, r#"{"action": "join", "name": "amber-owl"}"#).await;
    f.session.engine.store.create_plan("PRD.md", None).unwrap();
    run(&mut f, r#"{"action": "task.create", "title": "solo run"}"#).await;

    let store = f.session.engine.store.clone();
    f.spawner.set_handler(move |request| {
        let id = request.task_id.unwrap();
        store.complete_task(id, "done directly", None).unwrap();
        pim_runner::AgentResult { exit_code: 0, ..Default::default() }
    });

    let response = run(&mut f, r#"{"action": "crew.spawn", "id": "task-1"}"#).await;
    assert!(!response.is_error(), "{response:?}");
    assert_eq!(response.details.extra["status"], "done");
}

#[tokio::test(flavor = "multi_thread")]
async fn housekeeping_flags_stuck_peers_once() {
    let mut f = fixture();
    run(&mut f, r#"{"action": "join", "name": "amber-owl"}"#).await;

    // a live peer in this project, holding a reservation, silent forever
    let mut peer = pim_core::RegistrationBuilder::default()
        .name("silent-yak")
        .pid(std::process::id())
        .cwd(f.session.engine.store.paths().root())
        .build();
    peer.reservations.push(pim_core::Reservation::new("src"));
    peer.activity.last_activity_at = 0;
    f.session.engine.registry.register(&peer).unwrap();

    run(&mut f, r#"{"action": "status"}"#).await;
    let stuck: Vec<_> = f
        .session
        .engine
        .feed
        .read(100)
        .into_iter()
        .filter(|e| e.kind == pim_core::FeedEventKind::Stuck)
        .collect();
    assert_eq!(stuck.len(), 1);
    assert_eq!(stuck[0].target.as_deref(), Some("silent-yak"));

    // still stuck on the next action: no duplicate event
    run(&mut f, r#"{"action": "status"}"#).await;
    let stuck_count = f
        .session
        .engine
        .feed
        .read(100)
        .into_iter()
        .filter(|e| e.kind == pim_core::FeedEventKind::Stuck)
        .count();
    assert_eq!(stuck_count, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn housekeeping_refreshes_own_activity() {
    let mut f = fixture();
    run(&mut f, r#"{"action": "join", "name": "amber-owl"}"#).await;
    f.session.engine.store.clock().set_epoch_ms(5_000_000);
    run(&mut f, r#"{"action": "status"}"#).await;
    let registration = f.session.engine.registry.load("amber-owl").unwrap();
    assert_eq!(registration.activity.last_activity_at, 5_000_000);
    assert!(registration.session.tool_calls >= 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn rename_moves_identity() {
    let mut f = fixture();
    run(&mut f, r#"{"action": "join", "name": "old-name"}"#).await;
    let response = run(&mut f, r#"{"action": "rename", "name": "new-name"}"#).await;
    assert!(!response.is_error());
    assert_eq!(f.session.registered.as_deref(), Some("new-name"));
    assert!(f.session.engine.registry.load("new-name").is_some());
    assert!(f.session.engine.registry.load("old-name").is_none());
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pim_mesh::Registry;
use pim_store::BasePaths;
use std::os::unix::fs::PermissionsExt;

fn write_script(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn spawner(dir: &tempfile::TempDir) -> LocalSpawner {
    let registry = Registry::new(BasePaths::new(dir.path().join("base")));
    LocalSpawner::new(Inbox::new(registry), LiveAgents::new())
}

fn request(program: PathBuf, dir: &tempfile::TempDir) -> SpawnRequest {
    let mut invocation = AgentInvocation::new(program.display().to_string(), "prompt", dir.path());
    invocation.agent_name = "test-worker".to_string();
    SpawnRequest {
        invocation,
        task_id: None,
        grace_period_ms: 500,
        truncation: TruncationLimits::default(),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn collects_stream_progress_and_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        &dir,
        "agent.sh",
        r#"echo '{"type":"tool_execution_start","toolName":"bash"}'
echo '{"type":"tool_execution_end"}'
echo '{"type":"message_end","message":{"usage":{"input":7,"output":3}}}'"#,
    );
    let spawner = spawner(&dir);
    let result = spawner.run(request(script, &dir), CancellationToken::new()).await.unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.progress.tokens, 10);
    assert_eq!(result.progress.tool_count, 1);
    assert!(!result.was_gracefully_shutdown);
    assert!(result.output.contains("message_end"));
}

#[tokio::test(flavor = "multi_thread")]
async fn nonzero_exit_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(&dir, "agent.sh", "exit 3");
    let spawner = spawner(&dir);
    let result = spawner.run(request(script, &dir), CancellationToken::new()).await.unwrap();
    assert_eq!(result.exit_code, 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_escalates_and_flags_graceful() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(&dir, "agent.sh", "sleep 60");
    let spawner = spawner(&dir);

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        cancel_clone.cancel();
    });

    let result = spawner.run(request(script, &dir), cancel).await.unwrap();
    assert!(result.was_gracefully_shutdown);
    assert_ne!(result.exit_code, 0);

    // the worker got a shutdown message in its inbox
    let inbox_dir = dir.path().join("base/inbox/test-worker");
    let delivered: Vec<_> = std::fs::read_dir(&inbox_dir).unwrap().flatten().collect();
    assert_eq!(delivered.len(), 1);
    let body = std::fs::read_to_string(delivered[0].path()).unwrap();
    assert!(body.contains("SHUTDOWN REQUESTED"));
}

#[tokio::test(flavor = "multi_thread")]
async fn live_registry_tracks_and_clears() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(&dir, "agent.sh", "sleep 0.2");
    let spawner = spawner(&dir);
    let live = spawner.live().clone();

    let handle = tokio::spawn(async move {
        spawner.run(request(script, &dir), CancellationToken::new()).await
    });
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(live.contains("test-worker"));
    handle.await.unwrap().unwrap();
    assert!(!live.contains("test-worker"));
}

#[tokio::test(flavor = "multi_thread")]
async fn fake_spawner_returns_scripted_results() {
    let fake = FakeSpawner::new();
    fake.push_result(AgentResult { exit_code: 2, ..Default::default() });
    let dir = tempfile::tempdir().unwrap();
    let result = fake
        .run(request(PathBuf::from("unused"), &dir), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result.exit_code, 2);
    assert_eq!(fake.call_count(), 1);
}

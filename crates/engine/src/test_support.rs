// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test fixture: an engine wired to a fake spawner in a temp dir.

use crate::agents::{AgentProfile, AgentRoster};
use crate::coord::Coordinator;
use crate::engine::Engine;
use pim_core::{CrewConfig, FakeClock, RecordingNotifier};
use pim_mesh::{Inbox, Registry};
use pim_runner::{FakeSpawner, LiveAgents, WorkerPool};
use pim_store::{BasePaths, Feed, TaskStore};
use std::sync::Arc;

pub struct TestEngine {
    pub _dir: tempfile::TempDir,
    pub engine: Engine<FakeSpawner, FakeClock>,
    pub spawner: Arc<FakeSpawner>,
    pub clock: FakeClock,
    pub notifier: RecordingNotifier,
}

pub fn engine_fixture() -> TestEngine {
    engine_with_config(CrewConfig::default())
}

pub fn engine_with_config(config: CrewConfig) -> TestEngine {
    let dir = tempfile::tempdir().expect("tempdir");
    let project = dir.path().join("project");
    std::fs::create_dir_all(&project).expect("project dir");

    let clock = FakeClock::new();
    let store = TaskStore::with_clock(&project, clock.clone());
    let feed = Feed::new(store.paths().feed_path());
    let registry = Registry::new(BasePaths::new(dir.path().join("base")));
    let inbox = Inbox::new(registry.clone());
    let live = LiveAgents::new();
    let pool = WorkerPool::new(
        store.clone(),
        registry.clone(),
        inbox.clone(),
        live.clone(),
        config.work.max_attempts_per_task,
    );
    let spawner = Arc::new(FakeSpawner::new());
    let notifier = RecordingNotifier::new();

    let roster = AgentRoster {
        planner: Some(AgentProfile::new("pi")),
        worker: Some(AgentProfile::new("pi")),
        reviewer: Some(AgentProfile::new("pi")),
    };

    let engine = Engine {
        store,
        feed,
        coordinator: Coordinator::with_notifier(clock.clone(), Arc::new(notifier.clone())),
        pool,
        spawner: Arc::clone(&spawner),
        registry,
        inbox,
        live,
        config,
        roster,
        agent_name: "orchestrator".to_string(),
        notifier: Arc::new(notifier.clone()),
    };
    TestEngine { _dir: dir, engine, spawner, clock, notifier }
}

/// Planner output with four sections and a tasks-json block.
pub fn planner_output(tasks_json: &str) -> String {
    format!(
        "## 1. Understanding\nu\n\n## 2. Current state\nc\n\n## 3. Gaps\ng\n\n\
         ## 4. Plan\np\n\n```tasks-json\n{tasks_json}\n```\n",
    )
}

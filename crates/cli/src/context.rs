// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session context: one registered (or not-yet-registered) agent in one
//! project, with the engine and mesh handles wired up.

use pim_core::{
    Clock, CrewConfig, MessengerConfig, MessengerOverlay, Notifier, NullNotifier, Severity,
    SharedNotifier, SystemClock,
};
use pim_engine::{AgentProfile, AgentRoster, Coordinator, Engine};
use pim_mesh::{Inbox, Registry, Reservations, StuckDetector};
use pim_runner::{AgentSpawner, LiveAgents, LocalSpawner, WorkerPool};
use pim_store::{read_json, BasePaths, Feed, ProjectPaths, TaskStore};
use std::path::Path;
use std::sync::Arc;

/// Notifier for plain terminal hosts: one line per notification on stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        eprintln!("[pim {severity}] {message}");
    }
}

/// Load the layered messenger config for a project.
///
/// Precedence, highest first: project `.pi/pi-messenger.json`, user
/// `pi-messenger.json`, user `settings.json["messenger"]`, defaults.
pub fn load_messenger_config(paths: &ProjectPaths) -> MessengerConfig {
    let mut overlays: Vec<MessengerOverlay> = Vec::new();
    if let Some(home) = dirs::home_dir() {
        if let Some(settings) = read_json::<serde_json::Value>(&home.join(".pi/settings.json")) {
            if let Some(messenger) = settings.get("messenger") {
                if let Ok(overlay) = serde_json::from_value(messenger.clone()) {
                    overlays.push(overlay);
                }
            }
        }
        if let Some(overlay) = read_json::<MessengerOverlay>(&home.join(".pi/pi-messenger.json")) {
            overlays.push(overlay);
        }
    }
    if let Some(overlay) = read_json::<MessengerOverlay>(&paths.project_config_path()) {
        overlays.push(overlay);
    }
    MessengerConfig::resolve(overlays)
}

/// Load the project crew config, defaults when absent.
pub fn load_crew_config(paths: &ProjectPaths) -> CrewConfig {
    read_json(&paths.crew_config_path()).unwrap_or_default()
}

/// One agent session against one project.
pub struct Session<S: AgentSpawner, C: Clock + 'static = SystemClock> {
    pub engine: Engine<S, C>,
    pub messenger: MessengerConfig,
    pub reservations: Reservations,
    pub stuck: StuckDetector,
    /// Our mesh name once `join` has run
    pub registered: Option<String>,
    pub session_id: String,
}

impl<S: AgentSpawner, C: Clock + 'static> Session<S, C> {
    /// Assemble a session from parts (tests inject a fake spawner here).
    pub fn assemble(
        project_root: &Path,
        base: BasePaths,
        clock: C,
        spawner: Arc<S>,
        roster: AgentRoster,
    ) -> Self {
        Self::assemble_with_live(
            project_root,
            base,
            clock,
            spawner,
            roster,
            LiveAgents::new(),
            Arc::new(NullNotifier),
        )
    }

    /// Like [`Session::assemble`], sharing a [`LiveAgents`] registry that the
    /// spawner already writes into, and the host's notification callback.
    pub fn assemble_with_live(
        project_root: &Path,
        base: BasePaths,
        clock: C,
        spawner: Arc<S>,
        roster: AgentRoster,
        live: LiveAgents,
        notifier: SharedNotifier,
    ) -> Self {
        let store = TaskStore::with_clock(project_root, clock.clone());
        let messenger = load_messenger_config(store.paths());
        let config = load_crew_config(store.paths());
        let feed = Feed::new(store.paths().feed_path());
        let registry = Registry::new(base);
        let inbox = Inbox::new(registry.clone());
        let pool = WorkerPool::new(
            store.clone(),
            registry.clone(),
            inbox.clone(),
            live.clone(),
            config.work.max_attempts_per_task,
        );
        let engine = Engine {
            store,
            feed,
            coordinator: Coordinator::with_notifier(clock, Arc::clone(&notifier)),
            pool,
            spawner,
            registry,
            inbox,
            live,
            config,
            roster,
            agent_name: String::new(),
            notifier,
        };
        let reservations = Reservations::new(engine.registry.clone());
        Self {
            engine,
            messenger,
            reservations,
            stuck: StuckDetector::new(),
            registered: None,
            session_id: pim_core::run_id(),
        }
    }

    /// Our registered name, or a placeholder for feed entries before join.
    pub fn agent_name(&self) -> &str {
        self.registered.as_deref().unwrap_or("(unregistered)")
    }
}

impl Session<LocalSpawner, SystemClock> {
    /// Production session: local subprocesses, system clock, discovered base
    /// root, `pi` binary for every role.
    pub fn open(project_root: &Path) -> Self {
        let base = BasePaths::discover();
        let registry = Registry::new(base.clone());
        let inbox = Inbox::new(registry);
        let live = LiveAgents::new();
        let spawner = Arc::new(LocalSpawner::new(inbox, live.clone()));
        let profile = AgentProfile::new("pi");
        let roster = AgentRoster {
            planner: Some(profile.clone()),
            worker: Some(profile.clone()),
            reviewer: Some(profile),
        };
        Self::assemble_with_live(
            project_root,
            base,
            SystemClock,
            spawner,
            roster,
            live,
            Arc::new(StderrNotifier),
        )
    }
}

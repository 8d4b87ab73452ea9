// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared engine state handed into the planner, wave, and revise pipelines.

use crate::agents::AgentRoster;
use crate::coord::Coordinator;
use pim_core::{Clock, CrewConfig, FeedEvent, FeedEventKind, SharedNotifier, SystemClock, TaskId};
use pim_mesh::{Inbox, Registry};
use pim_runner::{AgentSpawner, LiveAgents, SpawnRequest, WorkerPool};
use pim_store::{Feed, TaskStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Errors from the planning, wave, and revise pipelines.
///
/// These are values at the API boundary: the router maps each variant onto
/// its wire error code.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("a plan already exists; pass a prompt to re-plan or delete the plan first")]
    PlanExists,
    #[error("a planning run is already active for this project")]
    PlanningActive,
    #[error("tasks are in progress; stop workers before re-planning")]
    TasksInProgress,
    #[error("no plan exists for this project")]
    NoPlan,
    #[error("no PRD found and no prompt supplied")]
    NoPrd,
    #[error("PRD not found: {0}")]
    PrdNotFound(String),
    #[error("no planner agent is available")]
    NoPlanner,
    #[error("no worker agent is available")]
    NoWorker,
    #[error("planner failed: {0}")]
    PlannerFailed(String),
    #[error("planner output could not be parsed into tasks")]
    ParserFailed,
    #[error("planning was cancelled")]
    Cancelled,
    #[error("{0} has an active worker")]
    ActiveWorker(TaskId),
    #[error("autonomous work is running; stop it before revising")]
    AutonomousActive,
    #[error("revision failed: {0}")]
    RevisionFailed(String),
    #[error(transparent)]
    Store(#[from] pim_store::StoreError),
    #[error(transparent)]
    Runner(#[from] pim_runner::RunnerError),
    #[error(transparent)]
    Write(#[from] pim_store::WriteError),
}

/// The orchestration engine for one project.
pub struct Engine<S: AgentSpawner, C: Clock + 'static = SystemClock> {
    pub store: TaskStore<C>,
    pub feed: Feed,
    pub coordinator: Coordinator<C>,
    pub pool: WorkerPool<C>,
    pub spawner: Arc<S>,
    pub registry: Registry,
    pub inbox: Inbox,
    pub live: LiveAgents,
    pub config: CrewConfig,
    pub roster: AgentRoster,
    /// Mesh name of this orchestrator
    pub agent_name: String,
    /// UI collaborator callback; the core never renders notifications itself
    pub notifier: SharedNotifier,
}

impl<S: AgentSpawner, C: Clock + 'static> Engine<S, C> {
    /// Append a feed event from this orchestrator, best effort.
    pub(crate) fn feed_event(&self, kind: FeedEventKind, target: Option<&str>, preview: Option<&str>) {
        let mut event =
            FeedEvent::new(self.store.clock().epoch_ms(), self.agent_name.as_str(), kind);
        event.target = target.map(str::to_string);
        event.preview = preview.map(str::to_string);
        if let Err(error) = self.feed.append(&event) {
            tracing::debug!(error = %error, "feed append failed");
        }
    }

    /// Run a role subprocess synchronously and return its result.
    pub(crate) async fn run_agent(
        &self,
        request: SpawnRequest,
        cancel: CancellationToken,
    ) -> Result<pim_runner::AgentResult, EngineError> {
        Ok(self.spawner.run(request, cancel).await?)
    }

    /// Whether any task currently has a live worker subprocess.
    pub(crate) fn has_live_workers(&self) -> bool {
        self.store.all_tasks().iter().any(|task| {
            task.assigned_to.as_deref().is_some_and(|name| self.live.contains(name))
        })
    }

    /// Build a spawn request for a role with its configured truncation caps.
    pub fn spawn_request(
        &self,
        invocation: pim_runner::AgentInvocation,
        task_id: Option<TaskId>,
    ) -> SpawnRequest {
        let truncation = self.config.truncation_for(&invocation.role);
        SpawnRequest {
            invocation,
            task_id,
            grace_period_ms: self.config.work.shutdown_grace_period_ms,
            truncation,
        }
    }
}

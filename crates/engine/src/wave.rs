// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wave scheduler: one synchronous round of worker execution.
//!
//! Lobby binds happen before fresh spawns, the set of tasks moving to
//! `in_progress` is chosen before any subprocess starts, and classification
//! distinguishes graceful shutdowns from crashes.

use crate::engine::{Engine, EngineError};
use crate::prompts;
use pim_core::{Clock, FeedEventKind, Severity, StopReason, Task, TaskId, TaskStatus, WaveResult};
use pim_runner::{AgentResult, AgentSpawner};
use tokio_util::sync::CancellationToken;

/// Wave request.
#[derive(Debug, Clone, Default)]
pub struct WorkParams {
    pub autonomous: bool,
    pub concurrency: Option<f64>,
    pub model: Option<String>,
}

/// What the caller should do after this wave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// All tasks done; autonomous stopped with `completed`
    Complete,
    /// Nothing further can run; autonomous stopped with `blocked`
    Blocked { blocked_tasks: Vec<TaskId> },
    /// More ready work exists; the post-agent hook drives the next wave
    Continue { next_ready: Vec<TaskId> },
    /// The wave ran nothing; human attention or waiting is needed
    Idle { diagnostic: String },
}

/// Outcome of one wave.
#[derive(Debug, Clone)]
pub struct WaveOutcome {
    pub wave: u32,
    pub succeeded: Vec<TaskId>,
    pub failed: Vec<TaskId>,
    pub blocked: Vec<TaskId>,
    pub continuation: Continuation,
}

impl<S: AgentSpawner, C: Clock + 'static> Engine<S, C> {
    /// Run one wave. `abort` interrupts workers through the graceful
    /// shutdown protocol.
    pub async fn work(
        &self,
        params: WorkParams,
        abort: CancellationToken,
    ) -> Result<WaveOutcome, EngineError> {
        let paths = self.store.paths().clone();
        if !self.store.has_plan() {
            return Err(EngineError::NoPlan);
        }
        let worker = self.roster.worker.clone().ok_or(EngineError::NoWorker)?;

        // Reconcile milestone and count state before selecting.
        self.store.auto_complete_milestones()?;
        self.store.reconcile_completed_count()?;

        // Build the ready set; attempt caps are enforced before any worker spawns.
        let max_attempts = self.config.work.max_attempts_per_task;
        let mut ready = Vec::new();
        for task in self.store.ready_tasks(self.config.dependencies) {
            if task.attempt_count >= max_attempts {
                self.store.block_exhausted_task(task.id, "Max attempts reached")?;
                self.feed_event(FeedEventKind::TaskBlock, Some(&task.id.to_string()), Some("Max attempts reached"));
            } else {
                ready.push(task);
            }
        }
        if ready.is_empty() {
            let diagnostic = self.idle_diagnostic();
            return Ok(WaveOutcome {
                wave: self.wave_number(),
                succeeded: Vec::new(),
                failed: Vec::new(),
                blocked: Vec::new(),
                continuation: Continuation::Idle { diagnostic },
            });
        }

        // Effective concurrency, then the autonomous stamp.
        let config_max = self.config.concurrency.max;
        let concurrency = match params.concurrency {
            Some(requested) => crate::coord::clamp_concurrency(requested, config_max),
            None => match self.coordinator.autonomous_concurrency(paths.root()) {
                Some(value) => value,
                None => crate::coord::clamp_concurrency(
                    f64::from(self.config.concurrency.workers),
                    config_max,
                ),
            },
        };
        if params.autonomous && !self.coordinator.is_autonomous_for(paths.root()) {
            self.coordinator.start_autonomous(paths.root(), concurrency);
        }
        let wave = self.wave_number();
        ready.truncate(concurrency as usize);

        // Lobby bind phase. Over-budget idle lobbies die first.
        self.pool.enforce_token_budgets(&self.config.message_budgets, self.config.coordination);
        let mut assigned: Vec<TaskId> = Vec::new();
        for lobby_name in self.pool.unassigned() {
            let Some(task) = ready.iter().find(|t| !assigned.contains(&t.id)) else { break };
            let task_id = task.id;
            self.store.start_task(task_id, &lobby_name)?;
            let started = self.store.require_task(task_id)?;
            let spec = self.store.read_spec(task_id).unwrap_or_default();
            if self.pool.assign_task_to_lobby_worker(&lobby_name, &started, &spec)? {
                self.feed_event(FeedEventKind::TaskStart, Some(&task_id.to_string()), Some(&started.title));
                self.store.append_progress(task_id, &lobby_name, "Assigned to lobby worker")?;
                assigned.push(task_id);
            } else {
                // Inbox write failed: revert the transition.
                self.store.reset_task(task_id, false)?;
            }
        }
        self.pool.sweep_stray_keepalives();

        // Fresh spawns for the rest; every transition lands before any spawn.
        let fresh: Vec<Task> =
            ready.iter().filter(|t| !assigned.contains(&t.id)).cloned().collect();
        let mut handles = Vec::new();
        for task in &fresh {
            let spec = self.store.read_spec(task.id).unwrap_or_default();
            let dep_summaries = self.dependency_summaries(task);
            let prompt =
                prompts::worker_prompt(task, &spec, self.config.dependencies, &dep_summaries);
            let model = task
                .model
                .clone()
                .or_else(|| params.model.clone());
            let name = format!("worker-{}", task.id);
            let invocation = worker.invocation(
                "worker",
                prompt,
                paths.root().to_path_buf(),
                name.clone(),
                &self.config,
                model.as_deref(),
            );
            self.store.start_task(task.id, &name)?;
            self.feed_event(FeedEventKind::TaskStart, Some(&task.id.to_string()), Some(&task.title));
            self.store.append_progress(task.id, &name, "Worker spawned for wave")?;
            let request = self.spawn_request(invocation, Some(task.id));
            let spawner = std::sync::Arc::clone(&self.spawner);
            let cancel = abort.clone();
            handles.push(tokio::spawn(async move { spawner.run(request, cancel).await }));
        }

        let mut results: Vec<AgentResult> = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(error)) => tracing::warn!(error = %error, "worker run failed"),
                Err(error) => tracing::warn!(error = %error, "worker task join failed"),
            }
        }

        // Classify results.
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        let mut blocked = Vec::new();
        for result in &results {
            let Some(task_id) = result.task_id else { continue };
            match self.classify(result, task_id, params.autonomous)? {
                Outcome::Succeeded => succeeded.push(task_id),
                Outcome::Blocked => blocked.push(task_id),
                Outcome::Failed => failed.push(task_id),
            }
        }
        self.store.auto_complete_milestones()?;
        self.store.reconcile_completed_count()?;

        // Wave accounting.
        if self.coordinator.is_autonomous_for(paths.root()) {
            self.coordinator.push_wave_result(WaveResult {
                wave,
                succeeded: succeeded.iter().map(|id| id.to_string()).collect(),
                failed: failed.iter().map(|id| id.to_string()).collect(),
                blocked: blocked.iter().map(|id| id.to_string()).collect(),
            });
        }

        // Continuation.
        let continuation = self.decide_continuation(&abort, &blocked);
        Ok(WaveOutcome { wave, succeeded, failed, blocked, continuation })
    }

    fn wave_number(&self) -> u32 {
        self.coordinator.autonomous_state().map(|s| s.wave_number).unwrap_or(1)
    }

    /// Summaries of a task's done dependencies, for the worker prompt.
    fn dependency_summaries(&self, task: &Task) -> Vec<(String, String)> {
        task.depends_on
            .iter()
            .filter_map(|dep| self.store.load_task(*dep))
            .map(|dep| {
                let summary = dep
                    .summary
                    .clone()
                    .unwrap_or_else(|| format!("{} ({})", dep.title, dep.status));
                (dep.id.to_string(), summary)
            })
            .collect()
    }

    fn idle_diagnostic(&self) -> String {
        let tasks = self.store.all_tasks();
        if tasks.is_empty() {
            return "no tasks exist; run plan first".to_string();
        }
        if tasks.iter().all(|t| t.status == TaskStatus::Done) {
            return "all tasks are done".to_string();
        }
        if tasks.iter().any(|t| t.status == TaskStatus::InProgress) {
            return "tasks are in progress; wait for workers to finish".to_string();
        }
        let blocked: Vec<String> = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Blocked)
            .map(|t| t.id.to_string())
            .collect();
        if !blocked.is_empty() {
            return format!("blocked: {}", blocked.join(", "));
        }
        "dependencies unmet; no task is ready".to_string()
    }

    fn classify(
        &self,
        result: &AgentResult,
        task_id: TaskId,
        autonomous: bool,
    ) -> Result<Outcome, EngineError> {
        let Some(task) = self.store.load_task(task_id) else {
            return Ok(Outcome::Failed);
        };
        let outcome = match (result.exit_code, result.was_gracefully_shutdown, task.status) {
            (_, _, TaskStatus::Done) => Outcome::Succeeded,
            (_, _, TaskStatus::Blocked) => Outcome::Blocked,
            (0, _, TaskStatus::InProgress) => {
                self.store.reset_task(task_id, false)?;
                self.store.append_progress(
                    task_id,
                    &self.agent_name,
                    "Worker exited without completing task, reset to todo",
                )?;
                Outcome::Failed
            }
            (_, true, TaskStatus::InProgress) => {
                self.store.reset_task(task_id, false)?;
                self.store.append_progress(
                    task_id,
                    &self.agent_name,
                    "Task interrupted (shutdown), reset to todo",
                )?;
                Outcome::Failed
            }
            (code, false, TaskStatus::InProgress) if code != 0 && autonomous => {
                self.store.block_task(
                    task_id,
                    &format!("Worker crashed with exit code {code}"),
                )?;
                self.feed_event(FeedEventKind::TaskBlock, Some(&task_id.to_string()), Some("worker crash"));
                self.notifier.notify(
                    Severity::Warning,
                    &format!("{task_id} blocked: worker crashed with exit code {code}"),
                );
                Outcome::Blocked
            }
            _ => {
                self.store.reset_task(task_id, false)?;
                Outcome::Failed
            }
        };
        if outcome == Outcome::Succeeded {
            self.feed_event(FeedEventKind::TaskDone, Some(&task_id.to_string()), None);
        }
        Ok(outcome)
    }

    fn decide_continuation(
        &self,
        abort: &CancellationToken,
        wave_blocked: &[TaskId],
    ) -> Continuation {
        let paths_root = self.store.paths().root().to_path_buf();
        let autonomous = self.coordinator.is_autonomous_for(&paths_root);
        if abort.is_cancelled() {
            self.coordinator.stop_autonomous(StopReason::Manual);
            if autonomous {
                self.notifier.notify(Severity::Info, "autonomous run stopped (manual)");
            }
            return Continuation::Idle { diagnostic: "aborted".to_string() };
        }
        let tasks = self.store.all_tasks();
        if !tasks.is_empty() && tasks.iter().all(|t| t.status == TaskStatus::Done) {
            self.coordinator.stop_autonomous(StopReason::Completed);
            if autonomous {
                self.notifier.notify(Severity::Info, "autonomous run complete: all tasks done");
            }
            return Continuation::Complete;
        }
        let next_ready: Vec<TaskId> = self
            .store
            .ready_tasks(self.config.dependencies)
            .iter()
            .filter(|t| t.attempt_count < self.config.work.max_attempts_per_task)
            .map(|t| t.id)
            .collect();
        let in_progress = tasks.iter().any(|t| t.status == TaskStatus::InProgress);
        if next_ready.is_empty() && !in_progress {
            if autonomous {
                self.coordinator.stop_autonomous(StopReason::Blocked);
                self.notifier
                    .notify(Severity::Warning, "autonomous run stopped: no task can run");
            }
            let blocked_tasks = if wave_blocked.is_empty() {
                tasks
                    .iter()
                    .filter(|t| t.status == TaskStatus::Blocked)
                    .map(|t| t.id)
                    .collect()
            } else {
                wave_blocked.to_vec()
            };
            return Continuation::Blocked { blocked_tasks };
        }
        Continuation::Continue { next_ready }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Succeeded,
    Failed,
    Blocked,
}

#[cfg(test)]
#[path = "wave_tests.rs"]
mod tests;

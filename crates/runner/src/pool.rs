// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lobby worker pool.
//!
//! A lobby worker is pre-spawned with a lobby prompt, joins the mesh, and
//! waits. A keep-alive file `lobby-<id>.alive` exists exactly while the
//! worker is unassigned; assignment is a three-step handoff (delete
//! keep-alive, inbox steer message, bind task id) that restores the
//! keep-alive on failure.

use crate::spawner::{AgentResult, AgentSpawner, LiveAgents, RunnerError, SpawnRequest};
use parking_lot::Mutex;
use pim_core::{Clock, CoordinationLevel, MessageBudgets, SystemClock, Task, TaskId, TaskStatus};
use pim_mesh::{Inbox, Registry};
use pim_store::TaskStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Header of the assignment steer message.
pub const ASSIGNMENT_HEADER: &str = "TASK ASSIGNMENT";

/// One lobby worker's pool-side state.
#[derive(Debug, Clone)]
pub struct LobbyWorker {
    /// Short id used in the keep-alive filename
    pub id: String,
    /// Mesh name the worker registered under
    pub name: String,
    pub assigned_task_id: Option<TaskId>,
    /// Cancelling kills the worker through the graceful path
    pub cancel: CancellationToken,
}

/// Pool of lobby workers for one project.
pub struct WorkerPool<C: Clock = SystemClock> {
    store: TaskStore<C>,
    registry: Registry,
    inbox: Inbox,
    live: LiveAgents,
    lobby: Arc<Mutex<Vec<LobbyWorker>>>,
    max_attempts_per_task: u32,
}

impl<C: Clock + 'static> WorkerPool<C> {
    pub fn new(
        store: TaskStore<C>,
        registry: Registry,
        inbox: Inbox,
        live: LiveAgents,
        max_attempts_per_task: u32,
    ) -> Self {
        Self {
            store,
            registry,
            inbox,
            live,
            lobby: Arc::new(Mutex::new(Vec::new())),
            max_attempts_per_task,
        }
    }

    pub fn live(&self) -> &LiveAgents {
        &self.live
    }

    /// Snapshot of current lobby workers.
    pub fn lobby_workers(&self) -> Vec<LobbyWorker> {
        self.lobby.lock().clone()
    }

    /// Names of lobby workers with no task bound, in spawn order.
    pub fn unassigned(&self) -> Vec<String> {
        self.lobby
            .lock()
            .iter()
            .filter(|w| w.assigned_task_id.is_none())
            .map(|w| w.name.clone())
            .collect()
    }

    /// Pre-spawn a lobby worker. The subprocess runs detached; on exit the
    /// pool applies the exit rules and cleans up.
    pub fn spawn_lobby_worker<S: AgentSpawner>(
        &self,
        spawner: Arc<S>,
        request: SpawnRequest,
    ) -> Result<LobbyWorker, RunnerError> {
        let id = lobby_id();
        let name = request.invocation.agent_name.clone();
        let keepalive = self.store.paths().lobby_keepalive_path(&id);
        pim_store::write_atomic(&keepalive, name.as_bytes())?;

        let worker = LobbyWorker {
            id: id.clone(),
            name: name.clone(),
            assigned_task_id: None,
            cancel: CancellationToken::new(),
        };
        self.lobby.lock().push(worker.clone());

        let pool = self.clone_handles();
        let cancel = worker.cancel.clone();
        tokio::spawn(async move {
            let result = spawner.run(request, cancel).await;
            if let Err(error) = &result {
                tracing::warn!(worker = %name, error = %error, "lobby worker failed to run");
            }
            pool.handle_worker_exit(&name);
        });
        Ok(worker)
    }

    fn clone_handles(&self) -> WorkerPool<C> {
        WorkerPool {
            store: self.store.clone(),
            registry: self.registry.clone(),
            inbox: self.inbox.clone(),
            live: self.live.clone(),
            lobby: Arc::clone(&self.lobby),
            max_attempts_per_task: self.max_attempts_per_task,
        }
    }

    /// Atomic three-step assignment handoff.
    ///
    /// Returns false (with the keep-alive restored) when the steer message
    /// could not be written; the caller then reverts the task transition.
    pub fn assign_task_to_lobby_worker(
        &self,
        lobby_name: &str,
        task: &Task,
        spec: &str,
    ) -> Result<bool, RunnerError> {
        let (id, keepalive) = {
            let lobby = self.lobby.lock();
            let Some(worker) =
                lobby.iter().find(|w| w.name == lobby_name && w.assigned_task_id.is_none())
            else {
                return Ok(false);
            };
            (worker.id.clone(), self.store.paths().lobby_keepalive_path(&worker.id))
        };

        // Step 1: the keep-alive disappears so the pool stops counting this
        // worker as idle.
        pim_store::remove_if_exists(&keepalive)?;

        // Step 2: steer message. Failure restores the keep-alive.
        let text = assignment_message(task, spec);
        let now = self.store.clock().epoch_ms();
        if let Err(error) = self.inbox.send_text("orchestrator", lobby_name, &text, now, None) {
            tracing::warn!(worker = lobby_name, error = %error, "assignment message failed, restoring keep-alive");
            let _ = pim_store::write_atomic(&keepalive, lobby_name.as_bytes());
            return Ok(false);
        }

        // Step 3: bind.
        let mut lobby = self.lobby.lock();
        if let Some(worker) = lobby.iter_mut().find(|w| w.id == id) {
            worker.assigned_task_id = Some(task.id);
        }
        Ok(true)
    }

    /// Exit rules: an assigned task still `in_progress` under this worker is
    /// blocked at the attempt cap, otherwise reset to todo. The worker's
    /// registry entry is removed either way.
    pub fn handle_worker_exit(&self, name: &str) {
        let worker = {
            let mut lobby = self.lobby.lock();
            match lobby.iter().position(|w| w.name == name) {
                Some(at) => Some(lobby.remove(at)),
                None => None,
            }
        };

        if let Some(worker) = &worker {
            let _ = pim_store::remove_if_exists(&self.store.paths().lobby_keepalive_path(&worker.id));
        }

        if let Some(task_id) = worker.as_ref().and_then(|w| w.assigned_task_id) {
            if let Some(task) = self.store.load_task(task_id) {
                if task.status == TaskStatus::InProgress
                    && task.assigned_to.as_deref() == Some(name)
                {
                    if task.attempt_count >= self.max_attempts_per_task {
                        if let Err(error) = self.store.block_task(task_id, "Max attempts reached") {
                            tracing::warn!(task = %task_id, error = %error, "failed to block task");
                        }
                    } else {
                        let _ = self.store.reset_task(task_id, false);
                        let _ = self.store.append_progress(
                            task_id,
                            name,
                            "Worker exited without completing task, reset to todo",
                        );
                    }
                }
            }
        }

        if let Err(error) = self.registry.deregister(name) {
            tracing::debug!(worker = name, error = %error, "registry cleanup failed");
        }
    }

    /// Kill lobby workers that are still unassigned but spent past their
    /// coordination-level token budget.
    pub fn enforce_token_budgets(&self, budgets: &MessageBudgets, level: CoordinationLevel) {
        let budget = budgets.for_level(level);
        for worker in self.lobby.lock().iter() {
            if worker.assigned_task_id.is_none() && self.live.tokens(&worker.name) > budget {
                tracing::info!(worker = %worker.name, budget, "lobby worker over token budget, terminating");
                worker.cancel.cancel();
            }
        }
    }

    /// Kill the nth unassigned lobby worker. Returns its name.
    pub fn remove_lobby_worker_by_index(&self, index: usize) -> Option<String> {
        let lobby = self.lobby.lock();
        let worker = lobby.iter().filter(|w| w.assigned_task_id.is_none()).nth(index)?;
        worker.cancel.cancel();
        Some(worker.name.clone())
    }

    /// Kill the lobby worker bound to a task. Returns true if one was found.
    pub fn kill_lobby_worker_for_task(&self, task_id: TaskId) -> bool {
        let lobby = self.lobby.lock();
        match lobby.iter().find(|w| w.assigned_task_id == Some(task_id)) {
            Some(worker) => {
                worker.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Kill every lobby worker and sweep stray keep-alive files.
    pub fn shutdown_lobby_workers(&self) {
        for worker in self.lobby.lock().iter() {
            worker.cancel.cancel();
        }
        self.sweep_stray_keepalives();
    }

    /// Remove keep-alive files with no matching unassigned lobby worker.
    pub fn sweep_stray_keepalives(&self) {
        let crew_dir = self.store.paths().crew_dir();
        let live_ids: Vec<String> = self
            .lobby
            .lock()
            .iter()
            .filter(|w| w.assigned_task_id.is_none())
            .map(|w| w.id.clone())
            .collect();
        let Ok(entries) = std::fs::read_dir(&crew_dir) else {
            return;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(id) = name.strip_prefix("lobby-").and_then(|n| n.strip_suffix(".alive")) else {
                continue;
            };
            if !live_ids.iter().any(|live| live == id) {
                let _ = std::fs::remove_file(entry.path());
            }
        }
    }

    /// Direct spawn: start the task (new attempt), run a worker with the
    /// task prompt, and await its result. The caller classifies the outcome.
    pub async fn spawn_worker_for_task<S: AgentSpawner>(
        &self,
        spawner: Arc<S>,
        mut request: SpawnRequest,
        task_id: TaskId,
        cancel: CancellationToken,
    ) -> Result<AgentResult, RunnerError> {
        let name = request.invocation.agent_name.clone();
        self.store.start_task(task_id, &name)?;
        self.store.append_progress(task_id, &name, "Worker spawned for task")?;
        request.task_id = Some(task_id);
        let result = spawner.run(request, cancel).await;
        if result.is_err() {
            // Spawn never happened; put the task back.
            let _ = self.store.reset_task(task_id, false);
        }
        result
    }
}

/// Steer message for a lobby handoff. The task is already started on the
/// worker's behalf, so it must not call `task.start`.
pub fn assignment_message(task: &Task, spec: &str) -> String {
    format!(
        "{ASSIGNMENT_HEADER}\n\nYou are assigned {id}: {title}\n\n{spec}\n\n\
         The task has already been started on your behalf — do NOT call \
         task.start. Work the task, then call task.done with a summary \
         (or task.block with a reason if you cannot proceed).",
        id = task.id,
        title = task.title,
    )
}

/// Lobby prompt, toned by coordination level.
pub fn lobby_prompt(level: CoordinationLevel, prd_excerpt: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are a crew worker in the lobby. Join the mesh, then wait for a \
         task assignment message in your inbox.\n",
    );
    match level {
        CoordinationLevel::None => {
            prompt.push_str("Do not send any messages while you wait.\n");
        }
        CoordinationLevel::Minimal => {
            prompt.push_str("Keep chatter to a minimum; a single short greeting is fine.\n");
        }
        CoordinationLevel::Moderate => {
            prompt.push_str(
                "Greet the team briefly and mention what you see in the project layout.\n",
            );
        }
        CoordinationLevel::Chatty => {
            prompt.push_str(
                "Greet the team, skim the project, and share anything useful you notice \
                 while you wait.\n",
            );
        }
    }
    if let Some(prd) = prd_excerpt {
        prompt.push_str("\nProduct context:\n");
        prompt.push_str(prd);
        prompt.push('\n');
    }
    prompt.push_str("\nWhen an assignment arrives, follow it exactly.");
    prompt
}

/// Short random id for keep-alive filenames within one project.
fn lobby_id() -> String {
    pim_core::message_id()[..8].to_string()
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;

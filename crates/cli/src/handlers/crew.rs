// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crew pool handlers: lobby workers and swarm pre-warming.

use crate::context::Session;
use crate::response::ActionResponse;
use pim_core::Clock;
use pim_runner::{lobby_prompt, AgentSpawner};
use std::collections::HashSet;
use std::sync::Arc;

fn spawn_lobby<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    prompt_override: Option<&str>,
) -> Result<String, ActionResponse> {
    let Some(worker) = session.engine.roster.worker.clone() else {
        return Err(ActionResponse::error("crew", "no_worker", "no worker agent is available"));
    };
    let taken: HashSet<String> = session.engine.registry.taken_names();
    let name = pim_mesh::names::generate(&session.messenger, &taken);
    let prd_excerpt = session
        .engine
        .store
        .load_plan()
        .filter(|plan| plan.is_prompt_only())
        .and_then(|plan| plan.prompt);
    let prompt = match prompt_override {
        Some(prompt) => prompt.to_string(),
        None => lobby_prompt(session.engine.config.coordination, prd_excerpt.as_deref()),
    };
    let invocation = worker.invocation(
        "worker",
        prompt,
        session.engine.store.paths().root().to_path_buf(),
        name.clone(),
        &session.engine.config,
        None,
    );
    let request = session.engine.spawn_request(invocation, None);
    match session.engine.pool.spawn_lobby_worker(Arc::clone(&session.engine.spawner), request) {
        Ok(_) => Ok(name),
        Err(error) => Err(ActionResponse::error("crew", "handler_error", error.to_string())),
    }
}

pub fn status<S: AgentSpawner, C: Clock + 'static>(session: &Session<S, C>) -> ActionResponse {
    let workers = session.engine.pool.lobby_workers();
    let mut lines = Vec::new();
    for worker in &workers {
        let state = match worker.assigned_task_id {
            Some(id) => format!("on {id}"),
            None => "idle".to_string(),
        };
        let tokens = session.engine.live.tokens(&worker.name);
        lines.push(format!("{} — {state} ({tokens} tokens)", worker.name));
    }
    if lines.is_empty() {
        lines.push("no lobby workers".to_string());
    }
    if let Some(state) = session.engine.coordinator.autonomous_state() {
        if state.active {
            lines.push(format!("autonomous: wave {}", state.wave_number));
        }
    }
    ActionResponse::ok("crew.status", lines.join("\n")).with("lobbyCount", workers.len())
}

pub fn add<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    count: u32,
) -> ActionResponse {
    let mut names = Vec::new();
    for _ in 0..count.clamp(1, 10) {
        match spawn_lobby(session, None) {
            Ok(name) => names.push(name),
            Err(response) => return response,
        }
    }
    ActionResponse::ok("crew.add", format!("pre-warmed {}", names.join(", ")))
        .with("spawned", names)
}

pub fn remove<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    count: u32,
) -> ActionResponse {
    let mut removed = Vec::new();
    // Cancellation drains asynchronously, so walk distinct indexes rather
    // than re-asking for index 0.
    for index in 0..count.max(1) as usize {
        match session.engine.pool.remove_lobby_worker_by_index(index) {
            Some(name) if !removed.contains(&name) => removed.push(name),
            _ => break,
        }
    }
    if removed.is_empty() {
        return ActionResponse::ok("crew.remove", "no unassigned lobby workers to remove");
    }
    ActionResponse::ok("crew.remove", format!("removing {}", removed.join(", ")))
        .with("removed", removed)
}

/// Direct spawn: run a worker against one task and wait for it.
pub async fn spawn_for_task<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    id: pim_core::TaskId,
) -> ActionResponse {
    let Some(worker) = session.engine.roster.worker.clone() else {
        return ActionResponse::error("crew.spawn", "no_worker", "no worker agent is available");
    };
    let Some(task) = session.engine.store.load_task(id) else {
        return ActionResponse::error("crew.spawn", "missing_id", format!("no such task: {id}"));
    };
    let spec = session.engine.store.read_spec(id).unwrap_or_default();
    let prompt = pim_engine::prompts::worker_prompt(
        &task,
        &spec,
        session.engine.config.dependencies,
        &[],
    );
    let name = format!("worker-{id}");
    let invocation = worker.invocation(
        "worker",
        prompt,
        session.engine.store.paths().root().to_path_buf(),
        name,
        &session.engine.config,
        task.model.as_deref(),
    );
    let request = session.engine.spawn_request(invocation, Some(id));
    let run = session
        .engine
        .pool
        .spawn_worker_for_task(
            Arc::clone(&session.engine.spawner),
            request,
            id,
            tokio_util::sync::CancellationToken::new(),
        )
        .await;
    match run {
        Ok(result) => {
            let status = session
                .engine
                .store
                .load_task(id)
                .map(|t| t.status.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            ActionResponse::ok(
                "crew.spawn",
                format!("worker exited with code {}; {id} is {status}", result.exit_code),
            )
            .with("exitCode", result.exit_code)
            .with("status", status)
        }
        Err(error) => ActionResponse::error("crew.spawn", "start_failed", error.to_string()),
    }
}

pub fn shutdown<S: AgentSpawner, C: Clock + 'static>(session: &Session<S, C>) -> ActionResponse {
    session.engine.pool.shutdown_lobby_workers();
    ActionResponse::ok("crew.shutdown", "lobby workers shutting down")
}

/// Pre-warm a set of lobby workers in one go.
pub fn swarm<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    count: u32,
    prompt: Option<&str>,
) -> ActionResponse {
    let mut names = Vec::new();
    for _ in 0..count.clamp(1, 10) {
        match spawn_lobby(session, prompt) {
            Ok(name) => names.push(name),
            Err(response) => return response,
        }
    }
    ActionResponse::ok("swarm", format!("swarm of {} ready: {}", names.len(), names.join(", ")))
        .with("spawned", names)
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Planning, wave, review, sync, and revise handlers.

use crate::context::Session;
use crate::response::ActionResponse;
use crate::router::engine_code;
use pim_core::{Clock, FeedEventKind, TaskId, TaskStatus};
use pim_engine::{Continuation, PlanParams, WorkParams};
use pim_runner::AgentSpawner;
use tokio_util::sync::CancellationToken;

pub async fn plan<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    prd: Option<String>,
    prompt: Option<String>,
    auto_work: Option<bool>,
) -> ActionResponse {
    let params = PlanParams { prd, prompt, auto_work };
    match session.engine.plan(params).await {
        Ok(outcome) if outcome.parse_warning => ActionResponse::ok(
            "plan",
            "planner output kept as plan spec, but no tasks could be parsed; \
             create tasks manually with task.create",
        )
        .with("warning", "parser_failed")
        .with("taskCount", 0),
        Ok(outcome) => ActionResponse::ok(
            "plan",
            format!(
                "planned {} tasks from {} in {} pass(es)",
                outcome.task_ids.len(),
                outcome.prd,
                outcome.passes_run
            ),
        )
        .with("taskCount", outcome.task_ids.len())
        .with("prd", outcome.prd),
        Err(error) => ActionResponse::error("plan", engine_code(&error), error.to_string()),
    }
}

pub fn cancel<S: AgentSpawner, C: Clock + 'static>(session: &Session<S, C>) -> ActionResponse {
    if !session.engine.coordinator.is_planning_active() {
        return ActionResponse::error("plan.cancel", "no_plan", "no planning run is active");
    }
    session.engine.coordinator.cancel_planning();
    let mut event = pim_core::FeedEvent::new(
        session.engine.store.clock().epoch_ms(),
        session.agent_name(),
        FeedEventKind::PlanCancel,
    );
    event.preview = None;
    let _ = session.engine.feed.append(&event);
    ActionResponse::ok("plan.cancel", "planning cancellation requested")
}

pub async fn work<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    autonomous: bool,
    concurrency: Option<f64>,
    model: Option<String>,
) -> ActionResponse {
    let params = WorkParams { autonomous, concurrency, model };
    match session.engine.work(params, CancellationToken::new()).await {
        Ok(outcome) => {
            let text = match &outcome.continuation {
                Continuation::Complete => "all tasks done".to_string(),
                Continuation::Blocked { blocked_tasks } => format!(
                    "wave {} finished; blocked: {}",
                    outcome.wave,
                    blocked_tasks
                        .iter()
                        .map(|id| id.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                Continuation::Continue { next_ready } => format!(
                    "wave {} finished; next ready: {}",
                    outcome.wave,
                    next_ready.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
                ),
                Continuation::Idle { diagnostic } => diagnostic.clone(),
            };
            let signal = match &outcome.continuation {
                Continuation::Complete => "crew_wave_complete",
                Continuation::Blocked { .. } => "crew_wave_blocked",
                Continuation::Continue { .. } => "crew_wave_continue",
                Continuation::Idle { .. } => "crew_wave_idle",
            };
            ActionResponse::ok("work", text)
                .with("signal", signal)
                .with("wave", outcome.wave)
                .with(
                    "succeeded",
                    outcome.succeeded.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
                )
                .with(
                    "failed",
                    outcome.failed.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
                )
                .with(
                    "blocked",
                    outcome.blocked.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
                )
        }
        Err(error) => ActionResponse::error("work", engine_code(&error), error.to_string()),
    }
}

/// Spawn the reviewer against a completed task and record the verdict.
pub async fn review<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    id: TaskId,
) -> ActionResponse {
    match session.engine.review_task(id).await {
        Ok(review) => ActionResponse::ok("review", review),
        Err(error) => ActionResponse::error("review", engine_code(&error), error.to_string()),
    }
}

/// Reconcile milestones and counts, then report validation state.
pub fn sync<S: AgentSpawner, C: Clock + 'static>(session: &Session<S, C>) -> ActionResponse {
    let store = &session.engine.store;
    if !store.has_plan() {
        return ActionResponse::error("sync", "no_plan", "no plan exists");
    }
    let promoted = store.auto_complete_milestones().unwrap_or_default();
    if let Err(error) = store.reconcile_completed_count() {
        return ActionResponse::error("sync", "handler_error", error.to_string());
    }
    let report = store.validate();
    let tasks = store.all_tasks();
    let done = tasks.iter().filter(|t| t.status == TaskStatus::Done).count();
    let mut text = format!("{done}/{} tasks done", tasks.len());
    if !promoted.is_empty() {
        text.push_str(&format!(
            "; milestones completed: {}",
            promoted.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
        ));
    }
    for warning in &report.warnings {
        text.push_str(&format!("\nwarning: {warning}"));
    }
    for error in &report.errors {
        text.push_str(&format!("\nerror: {error}"));
    }
    ActionResponse::ok("sync", text)
        .with("errors", report.errors.len())
        .with("warnings", report.warnings.len())
}

pub async fn revise<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    id: TaskId,
    prompt: Option<&str>,
) -> ActionResponse {
    match session.engine.revise_task(id, prompt).await {
        Ok(_) => ActionResponse::ok("task.revise", format!("revised {id}")),
        Err(error) => ActionResponse::error("task.revise", engine_code(&error), error.to_string()),
    }
}

pub async fn revise_tree<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    id: TaskId,
    prompt: Option<&str>,
) -> ActionResponse {
    match session.engine.revise_tree(id, prompt).await {
        Ok(outcome) => {
            let fmt = |ids: &[TaskId]| {
                ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
            };
            ActionResponse::ok(
                "task.revise-tree",
                format!(
                    "revised subtree of {id}: updated [{}], created [{}], reset [{}]",
                    fmt(&outcome.updated),
                    fmt(&outcome.created),
                    fmt(&outcome.reset)
                ),
            )
            .with("created", outcome.created.iter().map(|i| i.to_string()).collect::<Vec<_>>())
        }
        Err(error) => {
            ActionResponse::error("task.revise-tree", engine_code(&error), error.to_string())
        }
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action router.
//!
//! One entry point takes a tagged request, enforces the registration gate,
//! and dispatches to the handler for the parsed operation. Handlers return
//! values; nothing here panics or throws.

use crate::context::Session;
use crate::request::{parse_action, ActionRequest, CrewAction};
use crate::response::ActionResponse;
use pim_core::Clock;
use pim_engine::EngineError;
use pim_runner::AgentSpawner;
use pim_store::StoreError;

/// Map an engine error onto its wire code.
pub fn engine_code(error: &EngineError) -> &'static str {
    match error {
        EngineError::PlanExists => "plan_exists",
        EngineError::PlanningActive => "planning_active",
        EngineError::TasksInProgress => "tasks_in_progress",
        EngineError::NoPlan => "no_plan",
        EngineError::NoPrd => "no_prd",
        EngineError::PrdNotFound(_) => "prd_not_found",
        EngineError::NoPlanner => "no_planner",
        EngineError::NoWorker => "no_worker",
        EngineError::PlannerFailed(_) => "planner_failed",
        EngineError::ParserFailed => "parser_failed",
        EngineError::Cancelled => "cancelled",
        EngineError::ActiveWorker(_) => "active_worker",
        EngineError::AutonomousActive => "active_worker",
        EngineError::RevisionFailed(_) => "revision_failed",
        EngineError::Store(error) => store_code(error),
        EngineError::Runner(_) | EngineError::Write(_) => "handler_error",
    }
}

/// Map a store error onto its wire code.
pub fn store_code(error: &StoreError) -> &'static str {
    match error {
        StoreError::NoPlan => "no_plan",
        StoreError::TaskNotFound(_) => "missing_id",
        StoreError::InvalidStatus { .. } => "invalid_status",
        StoreError::MilestoneNotStartable(_) => "milestone_not_startable",
        StoreError::DependencyNotFound(_) => "dependency_not_found",
        StoreError::AlreadyDone(_) => "already_done",
        StoreError::AlreadyMilestone(_) => "already_milestone",
        StoreError::InsufficientSubtasks => "insufficient_subtasks",
        StoreError::InvalidSubtaskTitle => "invalid_subtask_title",
        StoreError::Write(_) => "handler_error",
    }
}

/// Post-dispatch housekeeping: refresh our own activity stamp, flag newly
/// stuck peers, and keep the feed within its retention bound.
fn housekeeping<S: AgentSpawner, C: Clock + 'static>(session: &mut Session<S, C>) {
    let Some(name) = session.registered.clone() else { return };
    let now = session.engine.store.clock().epoch_ms();
    let _ = session.engine.registry.update(&name, |registration| {
        registration.activity.last_activity_at = now;
        registration.session.tool_calls += 1;
    });

    if session.messenger.stuck_notify {
        let scope = session
            .messenger
            .scope_to_folder
            .then(|| session.engine.store.paths().root().to_path_buf());
        let peers = session.engine.registry.active_peers(scope.as_deref());
        let threshold = session.messenger.stuck_threshold;
        for peer in session.stuck.check(&peers, threshold, now) {
            let mut event = pim_core::FeedEvent::new(now, name.as_str(), pim_core::FeedEventKind::Stuck);
            event.target = Some(peer);
            let _ = session.engine.feed.append(&event);
        }
    }

    let _ = session.engine.feed.prune(session.messenger.feed_retention as usize);
}

/// Execute one crew action against the session.
pub async fn execute_crew_action<S: AgentSpawner, C: Clock + 'static>(
    request: &ActionRequest,
    session: &mut Session<S, C>,
) -> ActionResponse {
    let action = match parse_action(request) {
        Ok(action) => action,
        Err(error) => {
            return ActionResponse::error("router", error.code(), error.to_string());
        }
    };
    tracing::debug!(action = %request.action, registered = session.registered.is_some(), "dispatch");

    // Registration gate: everything except join and the auto-register-path
    // config command requires a registered agent.
    if !action.allowed_unregistered() && session.registered.is_none() {
        return ActionResponse::error(
            "router",
            "not_registered",
            "not registered on the mesh; run join first",
        );
    }

    let response = match action {
        CrewAction::Join { name } => crate::handlers::peers::join(session, name),
        CrewAction::AddAutoRegisterPath { path } => {
            crate::handlers::peers::add_auto_register_path(session, &path)
        }

        CrewAction::TaskCreate { title, description, depends_on } => {
            crate::handlers::tasks::create(session, &title, description.as_deref(), &depends_on)
        }
        CrewAction::TaskStart { id } => crate::handlers::tasks::start(session, id),
        CrewAction::TaskDone { id, summary, evidence } => {
            crate::handlers::tasks::done(session, id, &summary, evidence.as_deref())
        }
        CrewAction::TaskBlock { id, reason } => {
            crate::handlers::tasks::block(session, id, &reason)
        }
        CrewAction::TaskUnblock { id } => crate::handlers::tasks::unblock(session, id),
        CrewAction::TaskReset { id, cascade } => {
            crate::handlers::tasks::reset(session, id, cascade)
        }
        CrewAction::TaskDelete { id } => crate::handlers::tasks::delete(session, id),
        CrewAction::TaskSplit { id, subtasks } => {
            crate::handlers::tasks::split(session, id, &subtasks)
        }
        CrewAction::TaskRevise { id, prompt } => {
            crate::handlers::plan::revise(session, id, prompt.as_deref()).await
        }
        CrewAction::TaskReviseTree { id, prompt } => {
            crate::handlers::plan::revise_tree(session, id, prompt.as_deref()).await
        }
        CrewAction::TaskSpec { id, content } => {
            crate::handlers::tasks::spec(session, id, content.as_deref())
        }
        CrewAction::TaskList => crate::handlers::tasks::list(session),
        CrewAction::TaskShow { id } => crate::handlers::tasks::show(session, id),

        CrewAction::Plan { prd, prompt, auto_work } => {
            crate::handlers::plan::plan(session, prd, prompt, auto_work).await
        }
        CrewAction::PlanCancel => crate::handlers::plan::cancel(session),
        CrewAction::Work { autonomous, concurrency, model } => {
            crate::handlers::plan::work(session, autonomous, concurrency, model).await
        }
        CrewAction::Review { id } => crate::handlers::plan::review(session, id).await,
        CrewAction::Sync => crate::handlers::plan::sync(session),

        CrewAction::CrewStatus => crate::handlers::crew::status(session),
        CrewAction::CrewAdd { count } => crate::handlers::crew::add(session, count),
        CrewAction::CrewRemove { count } => crate::handlers::crew::remove(session, count),
        CrewAction::CrewSpawn { id } => crate::handlers::crew::spawn_for_task(session, id).await,
        CrewAction::CrewShutdown => crate::handlers::crew::shutdown(session),

        CrewAction::Status => crate::handlers::peers::status(session),
        CrewAction::List => crate::handlers::peers::list(session),
        CrewAction::Whois { name } => crate::handlers::peers::whois(session, &name),
        CrewAction::SetStatus { message } => {
            crate::handlers::peers::set_status(session, &message)
        }
        CrewAction::Feed { limit } => crate::handlers::peers::feed(session, limit),
        CrewAction::Spec { spec } => crate::handlers::peers::spec(session, spec.as_deref()),
        CrewAction::Send { to, message, reply_to } => {
            crate::handlers::peers::send(session, &to, &message, reply_to.as_deref())
        }
        CrewAction::Broadcast { message } => {
            crate::handlers::peers::broadcast(session, &message)
        }
        CrewAction::Reserve { paths, reason } => {
            crate::handlers::peers::reserve(session, &paths, reason.as_deref())
        }
        CrewAction::Release { paths } => crate::handlers::peers::release(session, paths),
        CrewAction::CheckConflict { path } => {
            crate::handlers::peers::check_conflict(session, &path)
        }
        CrewAction::CheckMail => crate::handlers::peers::check_mail(session),
        CrewAction::Rename { name } => crate::handlers::peers::rename(session, &name),
        CrewAction::Swarm { count, prompt } => {
            crate::handlers::crew::swarm(session, count, prompt.as_deref())
        }
        CrewAction::Claim { id } => crate::handlers::tasks::claim(session, id),
        CrewAction::Unclaim { id } => crate::handlers::tasks::unclaim(session, id),
        CrewAction::Complete { id, summary, evidence } => {
            crate::handlers::tasks::done(session, id, &summary, evidence.as_deref())
        }
    };
    housekeeping(session);
    response
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;

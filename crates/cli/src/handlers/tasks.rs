// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task CRUD and lifecycle handlers.

use crate::context::Session;
use crate::response::ActionResponse;
use crate::router::store_code;
use pim_core::{Clock, DependencyMode, FeedEventKind, TaskId, TaskStatus};
use pim_runner::AgentSpawner;

fn feed<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    kind: FeedEventKind,
    target: TaskId,
    preview: Option<&str>,
) {
    if !session.messenger.crew_events_in_feed {
        return;
    }
    let mut event = pim_core::FeedEvent::new(
        session.engine.store.clock().epoch_ms(),
        session.agent_name(),
        kind,
    );
    event.target = Some(target.to_string());
    event.preview = preview.map(str::to_string);
    let _ = session.engine.feed.append(&event);
}

pub fn create<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    title: &str,
    description: Option<&str>,
    depends_on: &[String],
) -> ActionResponse {
    let mut deps: Vec<TaskId> = Vec::new();
    for raw in depends_on {
        match raw.parse() {
            Ok(id) => deps.push(id),
            Err(_) => {
                return ActionResponse::error(
                    "task.create",
                    "dependency_not_found",
                    format!("unknown dependency: {raw}"),
                );
            }
        }
    }
    match session.engine.store.create_task(title, description, &deps) {
        Ok(task) => ActionResponse::ok("task.create", format!("created {}: {}", task.id, title))
            .with("id", task.id.to_string()),
        Err(error) => ActionResponse::error("task.create", store_code(&error), error.to_string()),
    }
}

pub fn start<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    id: TaskId,
) -> ActionResponse {
    match session.engine.store.start_task(id, session.agent_name()) {
        Ok(task) => {
            feed(session, FeedEventKind::TaskStart, id, Some(&task.title));
            ActionResponse::ok("task.start", format!("started {id} (attempt {})", task.attempt_count))
        }
        Err(error) => ActionResponse::error("task.start", store_code(&error), error.to_string()),
    }
}

pub fn done<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    id: TaskId,
    summary: &str,
    evidence: Option<&str>,
) -> ActionResponse {
    match session.engine.store.complete_task(id, summary, evidence) {
        Ok(_) => {
            feed(session, FeedEventKind::TaskDone, id, Some(summary));
            ActionResponse::ok("task.done", format!("{id} done: {summary}"))
        }
        Err(error) => ActionResponse::error("task.done", store_code(&error), error.to_string()),
    }
}

pub fn block<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    id: TaskId,
    reason: &str,
) -> ActionResponse {
    match session.engine.store.block_task(id, reason) {
        Ok(_) => {
            feed(session, FeedEventKind::TaskBlock, id, Some(reason));
            ActionResponse::ok("task.block", format!("{id} blocked: {reason}"))
        }
        Err(error) => ActionResponse::error("task.block", store_code(&error), error.to_string()),
    }
}

pub fn unblock<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    id: TaskId,
) -> ActionResponse {
    match session.engine.store.unblock_task(id) {
        Ok(_) => {
            feed(session, FeedEventKind::TaskUnblock, id, None);
            ActionResponse::ok("task.unblock", format!("{id} back to todo"))
        }
        Err(error) => ActionResponse::error("task.unblock", store_code(&error), error.to_string()),
    }
}

pub fn reset<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    id: TaskId,
    cascade: bool,
) -> ActionResponse {
    match session.engine.store.reset_task(id, cascade) {
        Ok(reset_ids) => {
            feed(session, FeedEventKind::TaskReset, id, None);
            let listed: Vec<String> = reset_ids.iter().map(|r| r.to_string()).collect();
            ActionResponse::ok("task.reset", format!("reset {}", listed.join(", ")))
                .with("reset", listed)
        }
        Err(error) => ActionResponse::error("task.reset", store_code(&error), error.to_string()),
    }
}

pub fn delete<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    id: TaskId,
) -> ActionResponse {
    match session.engine.store.delete_task(id) {
        Ok(()) => {
            feed(session, FeedEventKind::TaskDelete, id, None);
            ActionResponse::ok("task.delete", format!("deleted {id}"))
        }
        Err(error) => ActionResponse::error("task.delete", store_code(&error), error.to_string()),
    }
}

pub fn split<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    id: TaskId,
    subtasks: &[String],
) -> ActionResponse {
    match session.engine.store.split_task(id, subtasks) {
        Ok(created) => {
            feed(session, FeedEventKind::TaskSplit, id, None);
            let ids: Vec<String> = created.iter().map(|t| t.id.to_string()).collect();
            ActionResponse::ok(
                "task.split",
                format!("split {id} into {}", ids.join(", ")),
            )
            .with("created", ids)
        }
        Err(error) => ActionResponse::error("task.split", store_code(&error), error.to_string()),
    }
}

pub fn spec<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    id: TaskId,
    content: Option<&str>,
) -> ActionResponse {
    match content {
        Some(content) => match session.engine.store.write_spec(id, content) {
            Ok(()) => ActionResponse::ok("task.spec", format!("spec updated for {id}")),
            Err(error) => {
                ActionResponse::error("task.spec", store_code(&error), error.to_string())
            }
        },
        None => match session.engine.store.read_spec(id) {
            Some(spec) => ActionResponse::ok("task.spec", spec),
            None => ActionResponse::error("task.spec", "missing_id", format!("no spec for {id}")),
        },
    }
}

pub fn list<S: AgentSpawner, C: Clock + 'static>(session: &Session<S, C>) -> ActionResponse {
    let tasks = session.engine.store.all_tasks();
    if tasks.is_empty() {
        return ActionResponse::ok("task.list", "no tasks");
    }
    let mut lines = Vec::with_capacity(tasks.len());
    for task in &tasks {
        let deps = if task.depends_on.is_empty() {
            String::new()
        } else {
            format!(
                " <- {}",
                task.depends_on.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
            )
        };
        let marker = if task.milestone { " [milestone]" } else { "" };
        lines.push(format!("{} [{}]{} {}{}", task.id, task.status, marker, task.title, deps));
    }
    let done = tasks.iter().filter(|t| t.status == TaskStatus::Done).count();
    ActionResponse::ok("task.list", lines.join("\n"))
        .with("total", tasks.len())
        .with("done", done)
}

pub fn show<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    id: TaskId,
) -> ActionResponse {
    let Some(task) = session.engine.store.load_task(id) else {
        return ActionResponse::error("task.show", "missing_id", format!("no such task: {id}"));
    };
    let spec = session.engine.store.read_spec(id).unwrap_or_default();
    let mut text = format!("{} [{}] {}\n\n{}", task.id, task.status, task.title, spec);
    if let Some(progress) = session.engine.store.read_progress(id) {
        text.push_str(&format!("\n\nProgress:\n{progress}"));
    }
    if let Some(block) = session.engine.store.read_block_context(id) {
        text.push_str(&format!("\n\nBlock context:\n{block}"));
    }
    ActionResponse::ok("task.show", text).with("status", task.status.to_string())
}

/// Claim: start a task as the registered agent, honoring strict-mode gates.
pub fn claim<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    id: TaskId,
) -> ActionResponse {
    if session.engine.config.dependencies == DependencyMode::Strict {
        let ready = session.engine.store.ready_tasks(DependencyMode::Strict);
        let task_exists = session.engine.store.load_task(id).is_some();
        if task_exists && !ready.iter().any(|t| t.id == id) {
            if let Some(task) = session.engine.store.load_task(id) {
                if task.status == TaskStatus::Todo && !task.milestone {
                    return ActionResponse::error(
                        "claim",
                        "unmet_dependencies",
                        format!("{id} has unmet dependencies"),
                    );
                }
            }
        }
    }
    start(session, id)
}

/// Unclaim: give a task back if it is ours.
pub fn unclaim<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    id: TaskId,
) -> ActionResponse {
    let Some(task) = session.engine.store.load_task(id) else {
        return ActionResponse::error("unclaim", "missing_id", format!("no such task: {id}"));
    };
    if task.assigned_to.as_deref() != Some(session.agent_name()) {
        return ActionResponse::error(
            "unclaim",
            "invalid_status",
            format!("{id} is not claimed by you"),
        );
    }
    match session.engine.store.reset_task(id, false) {
        Ok(_) => {
            feed(session, FeedEventKind::TaskReset, id, None);
            ActionResponse::ok("unclaim", format!("released {id}"))
        }
        Err(error) => ActionResponse::error("unclaim", store_code(&error), error.to_string()),
    }
}

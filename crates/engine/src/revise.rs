// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-task and subtree revisions.
//!
//! Guard rails: never revise while the task (or subtree) has a live worker,
//! while planning is active, or while autonomous work is running.

use crate::engine::{Engine, EngineError};
use crate::parse;
use crate::prompts;
use pim_core::{Clock, FeedEventKind, TaskId, TaskStatus};
use pim_runner::AgentSpawner;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Outcome of a subtree revision.
#[derive(Debug, Clone, Default)]
pub struct ReviseTreeOutcome {
    pub updated: Vec<TaskId>,
    pub created: Vec<TaskId>,
    pub reset: Vec<TaskId>,
}

impl<S: AgentSpawner, C: Clock + 'static> Engine<S, C> {
    fn revise_guards(&self, ids: &[TaskId]) -> Result<(), EngineError> {
        if self.coordinator.is_planning_active() {
            return Err(EngineError::PlanningActive);
        }
        if self.coordinator.is_autonomous_for(self.store.paths().root()) {
            return Err(EngineError::AutonomousActive);
        }
        for id in ids {
            let task = self.store.require_task(*id)?;
            if task.status == TaskStatus::InProgress {
                return Err(EngineError::ActiveWorker(*id));
            }
            if task.assigned_to.as_deref().is_some_and(|name| self.live.contains(name)) {
                return Err(EngineError::ActiveWorker(*id));
            }
        }
        Ok(())
    }

    /// Revise one task's spec (and optionally title) through the planner.
    pub async fn revise_task(
        &self,
        task_id: TaskId,
        instructions: Option<&str>,
    ) -> Result<TaskId, EngineError> {
        self.revise_guards(&[task_id])?;
        // The reviser sentinel: only one revision runs at a time per project.
        let sentinel = format!("reviser-{task_id}");
        if self.live.contains(&sentinel) {
            return Err(EngineError::ActiveWorker(task_id));
        }
        let planner = self.roster.planner.clone().ok_or(EngineError::NoPlanner)?;

        let task = self.store.require_task(task_id)?;
        let spec = self.store.read_spec(task_id).unwrap_or_default();
        let progress = self.store.read_progress(task_id);
        let block = self.store.read_block_context(task_id);
        let prd_excerpt = self.prd_excerpt();
        let prompt = prompts::revise_prompt(
            &task,
            &spec,
            progress.as_deref(),
            block.as_deref(),
            prd_excerpt.as_deref(),
            instructions,
        );

        let invocation = planner.invocation(
            "planner",
            prompt,
            self.store.paths().root().to_path_buf(),
            sentinel,
            &self.config,
            None,
        );
        let result = self
            .run_agent(self.spawn_request(invocation, Some(task_id)), CancellationToken::new())
            .await?;
        if result.exit_code != 0 {
            return Err(EngineError::RevisionFailed(format!(
                "reviser exited with code {}",
                result.exit_code
            )));
        }
        let revised = parse::parse_revised_task(&result.output)
            .ok_or_else(|| EngineError::RevisionFailed("no revised-task block".to_string()))?;

        self.store.write_spec(task_id, &revised.spec)?;
        if let Some(title) = &revised.title {
            self.store.update_task(task_id, |t| t.title = title.clone())?;
        }
        self.store.append_progress(
            task_id,
            &self.agent_name,
            &format!(
                "Spec revised{}",
                instructions.map(|i| format!(": {i}")).unwrap_or_default()
            ),
        )?;
        self.feed_event(FeedEventKind::TaskRevise, Some(&task_id.to_string()), None);
        Ok(task_id)
    }

    /// Revise a task and all its transitive dependents as one unit.
    pub async fn revise_tree(
        &self,
        root_id: TaskId,
        instructions: Option<&str>,
    ) -> Result<ReviseTreeOutcome, EngineError> {
        let mut subtree_ids = vec![root_id];
        subtree_ids.extend(self.store.transitive_dependents(root_id));
        self.revise_guards(&subtree_ids)?;
        let planner = self.roster.planner.clone().ok_or(EngineError::NoPlanner)?;

        let subtree: Vec<(pim_core::Task, String)> = subtree_ids
            .iter()
            .map(|id| {
                let task = self.store.require_task(*id)?;
                let spec = self.store.read_spec(*id).unwrap_or_default();
                Ok((task, spec))
            })
            .collect::<Result<_, EngineError>>()?;

        let prompt = prompts::revise_tree_prompt(&subtree, instructions);
        let invocation = planner.invocation(
            "planner",
            prompt,
            self.store.paths().root().to_path_buf(),
            format!("reviser-tree-{root_id}"),
            &self.config,
            None,
        );
        let result = self
            .run_agent(self.spawn_request(invocation, Some(root_id)), CancellationToken::new())
            .await?;
        if result.exit_code != 0 {
            return Err(EngineError::RevisionFailed(format!(
                "reviser exited with code {}",
                result.exit_code
            )));
        }
        let entries = parse::parse_tasks_json(&result.output)
            .ok_or_else(|| EngineError::RevisionFailed("no tasks-json block".to_string()))?;

        // Named entries must stay inside the subtree; new entries are bounded.
        let new_count = entries.iter().filter(|e| e.id.is_none()).count();
        let bound = (2 * subtree_ids.len()).max(5);
        if new_count > bound {
            return Err(EngineError::RevisionFailed(format!(
                "revision creates {new_count} tasks, bound is {bound}"
            )));
        }
        for entry in entries.iter().filter(|e| e.id.is_some()) {
            let id: TaskId = entry
                .id
                .as_deref()
                .and_then(|raw| raw.parse().ok())
                .ok_or_else(|| {
                    EngineError::RevisionFailed(format!("bad task id {:?}", entry.id))
                })?;
            if !subtree_ids.contains(&id) {
                return Err(EngineError::RevisionFailed(format!(
                    "{id} is not part of the revised subtree"
                )));
            }
        }

        let mut outcome = ReviseTreeOutcome::default();

        // Apply updates to named tasks.
        for entry in entries.iter().filter(|e| e.id.is_some()) {
            let id: TaskId = entry.id.as_deref().unwrap_or_default().parse().map_err(|_| {
                EngineError::RevisionFailed(format!("bad task id {:?}", entry.id))
            })?;
            self.store.update_task(id, |t| t.title = entry.title.clone())?;
            if let Some(description) = &entry.description {
                self.store.write_spec(id, description)?;
            }
            outcome.updated.push(id);
        }

        // Create new tasks.
        let mut created_by_title: HashMap<String, TaskId> = HashMap::new();
        for entry in entries.iter().filter(|e| e.id.is_none()) {
            let created =
                self.store.create_task(&entry.title, entry.description.as_deref(), &[])?;
            created_by_title.insert(entry.title.trim().to_ascii_lowercase(), created.id);
            outcome.created.push(created.id);
        }

        // Resolve dependsOn across the whole store, never self-depending.
        let title_map: HashMap<String, TaskId> = self
            .store
            .all_tasks()
            .into_iter()
            .map(|t| (t.title.trim().to_ascii_lowercase(), t.id))
            .collect();
        for entry in &entries {
            let target: TaskId = match &entry.id {
                Some(raw) => raw.parse().map_err(|_| {
                    EngineError::RevisionFailed(format!("bad task id {raw:?}"))
                })?,
                None => match created_by_title.get(entry.title.trim().to_ascii_lowercase().as_str())
                {
                    Some(id) => *id,
                    None => continue,
                },
            };
            if entry.depends_on.is_empty() {
                continue;
            }
            let resolved: Vec<TaskId> = entry
                .depends_on
                .iter()
                .filter_map(|reference| {
                    let key = reference.trim().to_ascii_lowercase();
                    key.parse::<TaskId>().ok().or_else(|| title_map.get(&key).copied())
                })
                .filter(|dep| *dep != target)
                .collect();
            self.store.update_task(target, |t| t.depends_on = resolved)?;
        }

        // Reset every non-done subtree member so revised work re-runs.
        for id in &subtree_ids {
            let task = self.store.require_task(*id)?;
            if task.status != TaskStatus::Done {
                self.store.reset_task(*id, false)?;
                outcome.reset.push(*id);
            }
        }
        self.feed_event(FeedEventKind::TaskReviseTree, Some(&root_id.to_string()), None);
        Ok(outcome)
    }

    /// First stretch of the plan's PRD for revision context.
    fn prd_excerpt(&self) -> Option<String> {
        let plan = self.store.load_plan()?;
        let content = if plan.is_prompt_only() {
            plan.prompt.clone()?
        } else {
            std::fs::read_to_string(self.store.paths().root().join(&plan.prd)).ok()?
        };
        let mut end = 4_000.min(content.len());
        while !content.is_char_boundary(end) {
            end -= 1;
        }
        Some(content[..end].to_string())
    }
}

#[cfg(test)]
#[path = "revise_tests.rs"]
mod tests;

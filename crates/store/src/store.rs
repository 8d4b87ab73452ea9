// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task store: exclusive owner of plan, task, and block files.
//!
//! All mutations happen through this type and are synchronous — callers on
//! the event loop observe consistent pre/post states without yielding.

use crate::atomic::{read_json, read_string, write_json_atomic, WriteError};
use crate::paths::ProjectPaths;
use pim_core::{Clock, Plan, SystemClock, Task, TaskId};
use std::path::Path;

/// Placeholder content for a task spec that has not been written yet.
pub const SPEC_PENDING: &str = "*Spec pending*";

/// Errors from task store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Write(#[from] WriteError),
    #[error("no plan exists for this project")]
    NoPlan,
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    #[error("{action} requires status {expected}, but {id} is {actual}")]
    InvalidStatus {
        id: TaskId,
        action: &'static str,
        expected: &'static str,
        actual: pim_core::TaskStatus,
    },
    #[error("{0} is a milestone and never starts directly")]
    MilestoneNotStartable(TaskId),
    #[error("dependency not found: {0}")]
    DependencyNotFound(TaskId),
    #[error("{0} is already done")]
    AlreadyDone(TaskId),
    #[error("{0} is already a milestone")]
    AlreadyMilestone(TaskId),
    #[error("need at least two subtasks to split")]
    InsufficientSubtasks,
    #[error("subtask title must not be empty")]
    InvalidSubtaskTitle,
}

/// Per-project task store.
#[derive(Debug, Clone)]
pub struct TaskStore<C: Clock = SystemClock> {
    paths: ProjectPaths,
    clock: C,
}

impl TaskStore<SystemClock> {
    pub fn open(project_root: &Path) -> Self {
        Self::with_clock(project_root, SystemClock)
    }
}

impl<C: Clock> TaskStore<C> {
    pub fn with_clock(project_root: &Path, clock: C) -> Self {
        Self { paths: ProjectPaths::new(project_root), clock }
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // ---- plan CRUD ----

    pub fn has_plan(&self) -> bool {
        self.paths.plan_path().exists()
    }

    pub fn load_plan(&self) -> Option<Plan> {
        read_json(&self.paths.plan_path())
    }

    /// Create (or replace) the plan file.
    pub fn create_plan(&self, prd: &str, prompt: Option<&str>) -> Result<Plan, StoreError> {
        let mut plan = Plan::new(prd, self.clock.now_iso());
        plan.prompt = prompt.map(str::to_string);
        write_json_atomic(&self.paths.plan_path(), &plan)?;
        Ok(plan)
    }

    /// Read-modify-write the plan. Errors if no plan exists.
    pub fn update_plan(&self, mutate: impl FnOnce(&mut Plan)) -> Result<Plan, StoreError> {
        let mut plan = self.load_plan().ok_or(StoreError::NoPlan)?;
        mutate(&mut plan);
        plan.updated_at = self.clock.now_iso();
        write_json_atomic(&self.paths.plan_path(), &plan)?;
        Ok(plan)
    }

    /// Delete the plan and everything it owns: plan spec, outline, all task
    /// files, and all block files.
    pub fn delete_plan(&self) -> Result<(), StoreError> {
        crate::atomic::remove_if_exists(&self.paths.plan_path())?;
        crate::atomic::remove_if_exists(&self.paths.plan_spec_path())?;
        crate::atomic::remove_if_exists(&self.paths.planning_outline_path())?;
        for dir in [self.paths.tasks_dir(), self.paths.blocks_dir()] {
            if dir.is_dir() {
                if let Ok(entries) = std::fs::read_dir(&dir) {
                    for entry in entries.flatten() {
                        let _ = std::fs::remove_file(entry.path());
                    }
                }
            }
        }
        Ok(())
    }

    // ---- task records ----

    pub fn load_task(&self, id: TaskId) -> Option<Task> {
        read_json(&self.paths.task_path(id))
    }

    pub fn require_task(&self, id: TaskId) -> Result<Task, StoreError> {
        self.load_task(id).ok_or(StoreError::TaskNotFound(id))
    }

    pub(crate) fn save_task(&self, task: &Task) -> Result<(), StoreError> {
        write_json_atomic(&self.paths.task_path(task.id), task)?;
        Ok(())
    }

    /// All task records, ordered by numeric id.
    pub fn all_tasks(&self) -> Vec<Task> {
        let mut ids: Vec<TaskId> = Vec::new();
        if let Ok(entries) = std::fs::read_dir(self.paths.tasks_dir()) {
            for entry in entries.flatten() {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if let Some(stem) = name.strip_suffix(".json") {
                    if let Ok(id) = stem.parse::<TaskId>() {
                        ids.push(id);
                    }
                }
            }
        }
        ids.sort();
        ids.into_iter().filter_map(|id| self.load_task(id)).collect()
    }

    /// Read-modify-write a task, stamping `updated_at`.
    pub fn update_task(&self, id: TaskId, mutate: impl FnOnce(&mut Task)) -> Result<Task, StoreError> {
        let mut task = self.require_task(id)?;
        mutate(&mut task);
        task.updated_at = self.clock.now_iso();
        self.save_task(&task)?;
        Ok(task)
    }

    // ---- specs, progress, blocks ----

    pub fn read_spec(&self, id: TaskId) -> Option<String> {
        read_string(&self.paths.task_spec_path(id))
    }

    pub fn write_spec(&self, id: TaskId, spec: &str) -> Result<(), StoreError> {
        crate::atomic::write_atomic(&self.paths.task_spec_path(id), spec.as_bytes())?;
        Ok(())
    }

    /// Whether the spec is missing or still the pending placeholder.
    pub fn spec_is_empty(&self, id: TaskId) -> bool {
        match self.read_spec(id) {
            Some(spec) => {
                let trimmed = spec.trim();
                trimmed.is_empty() || trimmed == SPEC_PENDING
            }
            None => true,
        }
    }

    /// Append a `[ISO] (agent) message` line to the task's progress log.
    pub fn append_progress(&self, id: TaskId, agent: &str, message: &str) -> Result<(), StoreError> {
        let line = format!("[{}] ({}) {}", self.clock.now_iso(), agent, message);
        crate::atomic::append_line(&self.paths.task_progress_path(id), &line)?;
        Ok(())
    }

    pub fn read_progress(&self, id: TaskId) -> Option<String> {
        read_string(&self.paths.task_progress_path(id))
    }

    pub fn read_block_context(&self, id: TaskId) -> Option<String> {
        read_string(&self.paths.block_path(id))
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task creation, deletion, and splitting.

use crate::store::{StoreError, TaskStore, SPEC_PENDING};
use pim_core::{Clock, Task, TaskId, TaskStatus};

impl<C: Clock> TaskStore<C> {
    /// Next task id: `max(existing) + 1`, at least 1. Gaps from deletions are
    /// tolerated and never reused downward.
    pub fn next_task_id(&self) -> TaskId {
        let max = self.all_tasks().iter().map(|t| t.id.number()).max().unwrap_or(0);
        TaskId::new(max + 1)
    }

    /// Create a task, write its record and spec file, bump `task_count`.
    pub fn create_task(
        &self,
        title: &str,
        description: Option<&str>,
        depends_on: &[TaskId],
    ) -> Result<Task, StoreError> {
        for dep in depends_on {
            if self.load_task(*dep).is_none() {
                return Err(StoreError::DependencyNotFound(*dep));
            }
        }
        let id = self.next_task_id();
        let mut task = Task::new(id, title, self.clock().now_iso());
        task.depends_on = depends_on.to_vec();
        self.save_task(&task)?;
        self.write_spec(id, description.filter(|d| !d.trim().is_empty()).unwrap_or(SPEC_PENDING))?;
        if self.has_plan() {
            self.update_plan(|plan| plan.task_count += 1)?;
        }
        Ok(task)
    }

    /// Delete a task: all its files, plus the id stripped from every other
    /// task's `depends_on`.
    pub fn delete_task(&self, id: TaskId) -> Result<(), StoreError> {
        let task = self.require_task(id)?;
        crate::atomic::remove_if_exists(&self.paths().task_path(id))?;
        crate::atomic::remove_if_exists(&self.paths().task_spec_path(id))?;
        crate::atomic::remove_if_exists(&self.paths().task_progress_path(id))?;
        crate::atomic::remove_if_exists(&self.paths().block_path(id))?;
        for other in self.all_tasks() {
            if other.depends_on.contains(&id) {
                self.update_task(other.id, |t| t.depends_on.retain(|d| *d != id))?;
            }
        }
        if self.has_plan() {
            let was_done = task.status == TaskStatus::Done;
            self.update_plan(|plan| {
                plan.task_count = plan.task_count.saturating_sub(1);
                if was_done {
                    plan.completed_count = plan.completed_count.saturating_sub(1);
                }
            })?;
        }
        Ok(())
    }

    /// Remove every task record, spec, and block file, keeping progress
    /// notes on disk. Plan counts reset to zero.
    ///
    /// Used by re-planning: the new plan allocates fresh ids, while the old
    /// progress history stays readable.
    pub fn wipe_tasks(&self) -> Result<(), StoreError> {
        for task in self.all_tasks() {
            crate::atomic::remove_if_exists(&self.paths().task_path(task.id))?;
            crate::atomic::remove_if_exists(&self.paths().task_spec_path(task.id))?;
            crate::atomic::remove_if_exists(&self.paths().block_path(task.id))?;
        }
        if self.has_plan() {
            self.update_plan(|plan| {
                plan.task_count = 0;
                plan.completed_count = 0;
            })?;
        }
        Ok(())
    }

    /// Split a todo task into subtasks.
    ///
    /// Each subtask inherits the parent's dependencies; the parent becomes a
    /// milestone depending on the new subtasks, so it auto-completes when
    /// they all finish.
    pub fn split_task(&self, id: TaskId, subtasks: &[String]) -> Result<Vec<Task>, StoreError> {
        let parent = self.require_task(id)?;
        if parent.status == TaskStatus::Done {
            return Err(StoreError::AlreadyDone(id));
        }
        if parent.milestone {
            return Err(StoreError::AlreadyMilestone(id));
        }
        let titles: Vec<&str> =
            subtasks.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
        if titles.len() != subtasks.len() {
            return Err(StoreError::InvalidSubtaskTitle);
        }
        if titles.len() < 2 {
            return Err(StoreError::InsufficientSubtasks);
        }

        let mut created = Vec::with_capacity(titles.len());
        for title in titles {
            created.push(self.create_task(title, None, &parent.depends_on)?);
        }
        let child_ids: Vec<TaskId> = created.iter().map(|t| t.id).collect();
        self.update_task(id, |t| {
            t.milestone = true;
            t.depends_on = child_ids;
        })?;
        Ok(created)
    }
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;

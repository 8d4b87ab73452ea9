// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task lifecycle transitions.
//!
//! ```text
//!            start (todo → in_progress)      complete (in_progress → done)
//!   todo ─────────────────────────────► in_progress ────────────────────► done
//!     ▲                                      │                             │
//!     │ unblock (blocked → todo)             │ block                       │
//!     │                                      ▼                             │
//!     └────────────────────────────────── blocked ◄────────── reset ◄──────┘
//!                 reset (any → todo, clears lifecycle fields, keeps attempts)
//! ```

use crate::store::{StoreError, TaskStore};
use pim_core::{Clock, Task, TaskId, TaskStatus};
use std::path::Path;

/// Best-effort VCS HEAD of the project (None when not a repository).
fn git_head(dir: &Path) -> Option<String> {
    let output = std::process::Command::new("git")
        .arg("rev-parse")
        .arg("HEAD")
        .current_dir(dir)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let head = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!head.is_empty()).then_some(head)
}

impl<C: Clock> TaskStore<C> {
    /// `todo → in_progress`. Stamps start time, base commit, assignee, and a
    /// new attempt.
    pub fn start_task(&self, id: TaskId, assigned_to: &str) -> Result<Task, StoreError> {
        let task = self.require_task(id)?;
        if task.milestone {
            return Err(StoreError::MilestoneNotStartable(id));
        }
        if task.status != TaskStatus::Todo {
            return Err(StoreError::InvalidStatus {
                id,
                action: "start",
                expected: "todo",
                actual: task.status,
            });
        }
        let now = self.clock().now_iso();
        let base_commit = git_head(self.paths().root());
        self.update_task(id, |t| {
            t.status = TaskStatus::InProgress;
            t.started_at = Some(now);
            t.base_commit = base_commit;
            t.assigned_to = Some(assigned_to.to_string());
            t.attempt_count += 1;
        })
    }

    /// `in_progress → done`. Requires a summary; reconciles the plan count
    /// and auto-completes any milestones that became satisfiable.
    pub fn complete_task(
        &self,
        id: TaskId,
        summary: &str,
        evidence: Option<&str>,
    ) -> Result<Task, StoreError> {
        let task = self.require_task(id)?;
        if task.status != TaskStatus::InProgress {
            return Err(StoreError::InvalidStatus {
                id,
                action: "complete",
                expected: "in_progress",
                actual: task.status,
            });
        }
        let now = self.clock().now_iso();
        let task = self.update_task(id, |t| {
            t.status = TaskStatus::Done;
            t.completed_at = Some(now);
            t.summary = Some(summary.to_string());
            t.evidence = evidence.map(str::to_string);
            t.assigned_to = None;
        })?;
        self.auto_complete_milestones()?;
        self.reconcile_completed_count()?;
        Ok(task)
    }

    /// `in_progress → blocked`. Writes the block context file.
    pub fn block_task(&self, id: TaskId, reason: &str) -> Result<Task, StoreError> {
        let task = self.require_task(id)?;
        if task.status != TaskStatus::InProgress {
            return Err(StoreError::InvalidStatus {
                id,
                action: "block",
                expected: "in_progress",
                actual: task.status,
            });
        }
        self.write_block(id, reason)?;
        self.update_task(id, |t| {
            t.status = TaskStatus::Blocked;
            t.blocked_reason = Some(reason.to_string());
            t.assigned_to = None;
        })
    }

    /// Scheduler-only transition for tasks that exhausted their attempts
    /// before a wave could run them: `todo → blocked`.
    pub fn block_exhausted_task(&self, id: TaskId, reason: &str) -> Result<Task, StoreError> {
        let task = self.require_task(id)?;
        if task.status != TaskStatus::Todo {
            return Err(StoreError::InvalidStatus {
                id,
                action: "block_exhausted",
                expected: "todo",
                actual: task.status,
            });
        }
        self.write_block(id, reason)?;
        self.update_task(id, |t| {
            t.status = TaskStatus::Blocked;
            t.blocked_reason = Some(reason.to_string());
        })
    }

    fn write_block(&self, id: TaskId, reason: &str) -> Result<(), StoreError> {
        let content = format!("# Blocked: {}\n\n{}\n\nBlocked at: {}\n", id, reason, self.clock().now_iso());
        crate::atomic::write_atomic(&self.paths().block_path(id), content.as_bytes())?;
        Ok(())
    }

    /// `blocked → todo`. Removes the block context file.
    pub fn unblock_task(&self, id: TaskId) -> Result<Task, StoreError> {
        let task = self.require_task(id)?;
        if task.status != TaskStatus::Blocked {
            return Err(StoreError::InvalidStatus {
                id,
                action: "unblock",
                expected: "blocked",
                actual: task.status,
            });
        }
        crate::atomic::remove_if_exists(&self.paths().block_path(id))?;
        self.update_task(id, |t| {
            t.status = TaskStatus::Todo;
            t.blocked_reason = None;
        })
    }

    /// Any state → `todo`, clearing lifecycle fields but keeping
    /// `attempt_count`. With `cascade`, every task that transitively depends
    /// on this one is reset as well.
    pub fn reset_task(&self, id: TaskId, cascade: bool) -> Result<Vec<TaskId>, StoreError> {
        let mut targets = vec![id];
        if cascade {
            targets.extend(self.transitive_dependents(id));
        }
        let mut reset = Vec::with_capacity(targets.len());
        for target in targets {
            self.require_task(target)?;
            crate::atomic::remove_if_exists(&self.paths().block_path(target))?;
            self.update_task(target, |t| {
                t.status = TaskStatus::Todo;
                t.clear_lifecycle_fields();
            })?;
            reset.push(target);
        }
        self.reconcile_completed_count()?;
        Ok(reset)
    }

    /// Ids of every task that transitively depends on `id` (excluding `id`).
    pub fn transitive_dependents(&self, id: TaskId) -> Vec<TaskId> {
        let tasks = self.all_tasks();
        let mut out: Vec<TaskId> = Vec::new();
        let mut frontier = vec![id];
        while let Some(current) = frontier.pop() {
            for task in &tasks {
                if task.depends_on.contains(&current)
                    && task.id != id
                    && !out.contains(&task.id)
                {
                    out.push(task.id);
                    frontier.push(task.id);
                }
            }
        }
        out.sort();
        out
    }

    /// Promote milestones whose dependencies are all done, repeating until a
    /// full pass makes no changes.
    pub fn auto_complete_milestones(&self) -> Result<Vec<TaskId>, StoreError> {
        let mut promoted = Vec::new();
        loop {
            let tasks = self.all_tasks();
            let done: std::collections::HashSet<TaskId> = tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Done)
                .map(|t| t.id)
                .collect();
            let mut changed = false;
            for task in &tasks {
                if task.milestone
                    && task.status != TaskStatus::Done
                    && task.depends_on.iter().all(|d| done.contains(d))
                {
                    let now = self.clock().now_iso();
                    self.update_task(task.id, |t| {
                        t.status = TaskStatus::Done;
                        t.completed_at = Some(now);
                        t.summary = Some("All subtasks completed".to_string());
                    })?;
                    promoted.push(task.id);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        if !promoted.is_empty() {
            self.reconcile_completed_count()?;
        }
        Ok(promoted)
    }

    /// Make `completed_count` equal the number of done tasks.
    pub fn reconcile_completed_count(&self) -> Result<(), StoreError> {
        if !self.has_plan() {
            return Ok(());
        }
        let done = self.all_tasks().iter().filter(|t| t.status == TaskStatus::Done).count() as u32;
        self.update_plan(|plan| plan.completed_count = done)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;

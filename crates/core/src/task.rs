// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task record and status machine.

use crate::id::TaskId;
use serde::{Deserialize, Serialize};

/// Status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting to be picked up
    Todo,
    /// A worker is on it
    InProgress,
    /// Completed with a summary
    Done,
    /// Needs intervention before it can run again
    Blocked,
}

impl TaskStatus {
    /// Whether this status is terminal for scheduling purposes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

crate::simple_display! {
    TaskStatus {
        Todo => "todo",
        InProgress => "in_progress",
        Done => "done",
        Blocked => "blocked",
    }
}

/// A task record, stored one file per task under `crew/tasks/<id>.json`.
///
/// The markdown specification lives beside it in `<id>.md`; this record holds
/// lifecycle state only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub depends_on: Vec<TaskId>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub attempt_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    /// VCS HEAD at the moment the task was started (best effort)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    /// Milestones never run directly; they auto-complete when all
    /// dependencies are done.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub milestone: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_review: Option<String>,
    /// Per-task model override for the worker that runs it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Task {
    /// Create a fresh todo task.
    pub fn new(id: TaskId, title: impl Into<String>, now_iso: impl Into<String>) -> Self {
        let now = now_iso.into();
        Self {
            id,
            title: title.into(),
            status: TaskStatus::Todo,
            depends_on: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
            attempt_count: 0,
            started_at: None,
            completed_at: None,
            base_commit: None,
            assigned_to: None,
            summary: None,
            evidence: None,
            blocked_reason: None,
            milestone: false,
            last_review: None,
            model: None,
        }
    }

    /// Clear per-attempt lifecycle fields, keeping `attempt_count`.
    ///
    /// Used by reset transitions: the task returns to `todo` as if never
    /// started, but retry accounting survives.
    pub fn clear_lifecycle_fields(&mut self) {
        self.started_at = None;
        self.completed_at = None;
        self.base_commit = None;
        self.assigned_to = None;
        self.summary = None;
        self.evidence = None;
        self.blocked_reason = None;
    }
}

crate::builder! {
    pub struct TaskBuilder => Task {
        into {
            title: String = "test task",
            created_at: String = "2026-01-01T00:00:00.000Z",
            updated_at: String = "2026-01-01T00:00:00.000Z",
        }
        set {
            id: TaskId = TaskId::new(1),
            status: TaskStatus = TaskStatus::Todo,
            depends_on: Vec<TaskId> = Vec::new(),
            attempt_count: u32 = 0,
            milestone: bool = false,
        }
        option {
            started_at: String = None,
            completed_at: String = None,
            base_commit: String = None,
            assigned_to: String = None,
            summary: String = None,
            evidence: String = None,
            blocked_reason: String = None,
            last_review: String = None,
            model: String = None,
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;

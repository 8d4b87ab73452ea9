// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity feed events.
//!
//! One event per line in the project's `feed.jsonl`. The kind set is closed;
//! overlay renderers dim the routine system kinds and highlight the rest.

use serde::{Deserialize, Serialize};

/// Kind of a feed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedEventKind {
    #[serde(rename = "join")]
    Join,
    #[serde(rename = "leave")]
    Leave,
    #[serde(rename = "edit")]
    Edit,
    #[serde(rename = "commit")]
    Commit,
    #[serde(rename = "test")]
    Test,
    #[serde(rename = "message")]
    Message,
    #[serde(rename = "reserve")]
    Reserve,
    #[serde(rename = "release")]
    Release,
    #[serde(rename = "stuck")]
    Stuck,
    #[serde(rename = "task.start")]
    TaskStart,
    #[serde(rename = "task.done")]
    TaskDone,
    #[serde(rename = "task.block")]
    TaskBlock,
    #[serde(rename = "task.unblock")]
    TaskUnblock,
    #[serde(rename = "task.reset")]
    TaskReset,
    #[serde(rename = "task.split")]
    TaskSplit,
    #[serde(rename = "task.revise")]
    TaskRevise,
    #[serde(rename = "task.revise-tree")]
    TaskReviseTree,
    #[serde(rename = "task.delete")]
    TaskDelete,
    #[serde(rename = "plan.start")]
    PlanStart,
    #[serde(rename = "plan.pass.start")]
    PlanPassStart,
    #[serde(rename = "plan.pass.done")]
    PlanPassDone,
    #[serde(rename = "plan.review.start")]
    PlanReviewStart,
    #[serde(rename = "plan.review.done")]
    PlanReviewDone,
    #[serde(rename = "plan.done")]
    PlanDone,
    #[serde(rename = "plan.failed")]
    PlanFailed,
    #[serde(rename = "plan.cancel")]
    PlanCancel,
}

impl FeedEventKind {
    /// Routine mesh/planning chatter, dimmed by renderers.
    pub fn is_system(&self) -> bool {
        matches!(
            self,
            FeedEventKind::Join
                | FeedEventKind::Leave
                | FeedEventKind::Reserve
                | FeedEventKind::Release
                | FeedEventKind::PlanPassStart
                | FeedEventKind::PlanPassDone
                | FeedEventKind::PlanReviewStart
                | FeedEventKind::PlanReviewDone
        )
    }
}

crate::simple_display! {
    FeedEventKind {
        Join => "join",
        Leave => "leave",
        Edit => "edit",
        Commit => "commit",
        Test => "test",
        Message => "message",
        Reserve => "reserve",
        Release => "release",
        Stuck => "stuck",
        TaskStart => "task.start",
        TaskDone => "task.done",
        TaskBlock => "task.block",
        TaskUnblock => "task.unblock",
        TaskReset => "task.reset",
        TaskSplit => "task.split",
        TaskRevise => "task.revise",
        TaskReviseTree => "task.revise-tree",
        TaskDelete => "task.delete",
        PlanStart => "plan.start",
        PlanPassStart => "plan.pass.start",
        PlanPassDone => "plan.pass.done",
        PlanReviewStart => "plan.review.start",
        PlanReviewDone => "plan.review.done",
        PlanDone => "plan.done",
        PlanFailed => "plan.failed",
        PlanCancel => "plan.cancel",
    }
}

/// One line of the activity feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEvent {
    /// Epoch milliseconds at append time
    pub ts: u64,
    /// Agent that produced the event
    pub agent: String,
    #[serde(rename = "type")]
    pub kind: FeedEventKind,
    /// What the event is about (task id, file path, peer name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Short human preview (message excerpt, task title)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl FeedEvent {
    pub fn new(ts: u64, agent: impl Into<String>, kind: FeedEventKind) -> Self {
        Self { ts, agent: agent.into(), kind, target: None, preview: None }
    }

    crate::setters! {
        option {
            target: String,
            preview: String,
        }
    }
}

#[cfg(test)]
#[path = "feed_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plan record.
//!
//! Exactly one plan exists per project, at `crew/plan.json`. It tracks which
//! PRD it was planned from and aggregate task counts.

use serde::{Deserialize, Serialize};

/// Sentinel PRD path marking a prompt-only plan.
pub const PROMPT_SENTINEL: &str = "(prompt)";

/// The per-project plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Path of the PRD the plan was built from, or [`PROMPT_SENTINEL`]
    pub prd: String,
    /// Inline spec text when the plan is prompt-only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub task_count: u32,
    #[serde(default)]
    pub completed_count: u32,
}

impl Plan {
    pub fn new(prd: impl Into<String>, now_iso: impl Into<String>) -> Self {
        let now = now_iso.into();
        Self {
            prd: prd.into(),
            prompt: None,
            created_at: now.clone(),
            updated_at: now,
            task_count: 0,
            completed_count: 0,
        }
    }

    /// Whether the plan was built from an inline prompt rather than a file.
    pub fn is_prompt_only(&self) -> bool {
        self.prd == PROMPT_SENTINEL
    }
}

crate::builder! {
    pub struct PlanBuilder => Plan {
        into {
            prd: String = "PRD.md",
            created_at: String = "2026-01-01T00:00:00.000Z",
            updated_at: String = "2026-01-01T00:00:00.000Z",
        }
        set {
            task_count: u32 = 0,
            completed_count: u32 = 0,
        }
        option {
            prompt: String = None,
        }
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;

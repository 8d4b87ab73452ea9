// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted coordination state: autonomous runs and planning runs.
//!
//! Both are process-wide singletons owned by the coordinator and written to
//! disk on every change so a restarted process can pick them back up (or
//! detect that the writer died).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Why an autonomous run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every task reached `done`
    Completed,
    /// Nothing further can run
    Blocked,
    /// Operator stopped the run or the abort signal fired
    Manual,
}

crate::simple_display! {
    StopReason {
        Completed => "completed",
        Blocked => "blocked",
        Manual => "manual",
    }
}

/// Outcome of one wave, appended to the autonomous history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveResult {
    pub wave: u32,
    #[serde(default)]
    pub succeeded: Vec<String>,
    #[serde(default)]
    pub failed: Vec<String>,
    #[serde(default)]
    pub blocked: Vec<String>,
}

/// State of the autonomous continuation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutonomousState {
    pub active: bool,
    /// Canonicalized project the run belongs to
    pub cwd: PathBuf,
    pub wave_number: u32,
    #[serde(default)]
    pub wave_history: Vec<WaveResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
    pub concurrency: u32,
    /// Overlay should auto-open on the next tick
    #[serde(default)]
    pub auto_overlay_pending: bool,
}

impl AutonomousState {
    /// Inactive state pinned to no project.
    pub fn idle() -> Self {
        Self {
            active: false,
            cwd: PathBuf::new(),
            wave_number: 0,
            wave_history: Vec::new(),
            started_at: None,
            stopped_at: None,
            stop_reason: None,
            concurrency: 1,
            auto_overlay_pending: false,
        }
    }
}

/// Phase of a planning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanningPhase {
    Idle,
    ReadPrd,
    ScanCode,
    GapAnalysis,
    ReviewPass,
    BuildTaskGraph,
    BuildSteps,
    Finalizing,
    Completed,
}

crate::simple_display! {
    PlanningPhase {
        Idle => "idle",
        ReadPrd => "read-prd",
        ScanCode => "scan-code",
        GapAnalysis => "gap-analysis",
        ReviewPass => "review-pass",
        BuildTaskGraph => "build-task-graph",
        BuildSteps => "build-steps",
        Finalizing => "finalizing",
        Completed => "completed",
    }
}

/// Persisted planning-run state (`crew/planning-state.json`).
///
/// `pid` pins the run to its owning process: a reader that finds a dead pid
/// treats the run as stale and clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningState {
    pub active: bool,
    pub cwd: PathBuf,
    pub run_id: String,
    pub pass: u32,
    pub max_passes: u32,
    pub phase: PlanningPhase,
    /// Epoch milliseconds of the last phase change
    pub updated_at: u64,
    pub pid: u32,
}

impl PlanningState {
    pub fn idle() -> Self {
        Self {
            active: false,
            cwd: PathBuf::new(),
            run_id: String::new(),
            pass: 0,
            max_passes: 0,
            phase: PlanningPhase::Idle,
            updated_at: 0,
            pid: 0,
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;

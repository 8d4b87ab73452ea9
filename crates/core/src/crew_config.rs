// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crew configuration (project-scoped `crew/config.json`, inheriting from the
//! messenger layers when absent).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Whether `depends_on` gates readiness or is purely informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyMode {
    Advisory,
    Strict,
}

crate::simple_display! {
    DependencyMode {
        Advisory => "advisory",
        Strict => "strict",
    }
}

/// How chatty crew workers are on the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinationLevel {
    None,
    Minimal,
    Moderate,
    Chatty,
}

crate::simple_display! {
    CoordinationLevel {
        None => "none",
        Minimal => "minimal",
        Moderate => "moderate",
        Chatty => "chatty",
    }
}

/// Lobby-worker token budgets per coordination level.
///
/// Strictly increasing: none < minimal < moderate < chatty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageBudgets {
    pub none: u64,
    pub minimal: u64,
    pub moderate: u64,
    pub chatty: u64,
}

impl Default for MessageBudgets {
    fn default() -> Self {
        Self { none: 5_000, minimal: 15_000, moderate: 40_000, chatty: 80_000 }
    }
}

impl MessageBudgets {
    pub fn for_level(&self, level: CoordinationLevel) -> u64 {
        match level {
            CoordinationLevel::None => self.none,
            CoordinationLevel::Minimal => self.minimal,
            CoordinationLevel::Moderate => self.moderate,
            CoordinationLevel::Chatty => self.chatty,
        }
    }
}

/// Worker-count bounds for wave scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConcurrencyConfig {
    /// Default workers per wave
    pub workers: u32,
    /// Hard cap on any requested concurrency
    pub max: u32,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self { workers: 2, max: 10 }
    }
}

/// Model assignment per agent role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelsConfig {
    pub planner: Option<String>,
    pub worker: Option<String>,
    pub reviewer: Option<String>,
    pub analyst: Option<String>,
}

/// Review settings for the planner loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewConfig {
    pub enabled: bool,
    pub max_iterations: u32,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self { enabled: true, max_iterations: 2 }
    }
}

/// Planner pass bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanningConfig {
    pub max_passes: u32,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self { max_passes: 3 }
    }
}

/// Wave execution settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkConfig {
    pub max_attempts_per_task: u32,
    pub max_waves: u32,
    pub stop_on_block: bool,
    pub shutdown_grace_period_ms: u64,
    /// Extra environment for spawned workers
    pub env: HashMap<String, String>,
}

impl Default for WorkConfig {
    fn default() -> Self {
        Self {
            max_attempts_per_task: 3,
            max_waves: 20,
            stop_on_block: false,
            shutdown_grace_period_ms: 15_000,
            env: HashMap::new(),
        }
    }
}

/// Output caps for one subprocess role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TruncationLimits {
    pub bytes: usize,
    pub lines: usize,
}

impl Default for TruncationLimits {
    fn default() -> Self {
        Self { bytes: 262_144, lines: 2_000 }
    }
}

/// Resolved crew configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrewConfig {
    pub concurrency: ConcurrencyConfig,
    pub dependencies: DependencyMode,
    pub coordination: CoordinationLevel,
    pub message_budgets: MessageBudgets,
    pub models: ModelsConfig,
    /// Per-role thinking level, applied when the model string carries none
    pub thinking: HashMap<String, String>,
    pub review: ReviewConfig,
    pub planning: PlanningConfig,
    pub work: WorkConfig,
    /// Per-role output caps; roles not listed use [`TruncationLimits::default`]
    pub truncation: HashMap<String, TruncationLimits>,
}

impl Default for DependencyMode {
    fn default() -> Self {
        DependencyMode::Advisory
    }
}

impl Default for CoordinationLevel {
    fn default() -> Self {
        CoordinationLevel::Minimal
    }
}

impl CrewConfig {
    /// Output caps for a role.
    pub fn truncation_for(&self, role: &str) -> TruncationLimits {
        self.truncation.get(role).copied().unwrap_or_default()
    }

    /// Thinking level for a role, if configured.
    pub fn thinking_for(&self, role: &str) -> Option<&str> {
        self.thinking.get(role).map(String::as_str)
    }
}

#[cfg(test)]
#[path = "crew_config_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical path resolution for project and shared mesh state.
//!
//! Project identity is the canonicalized absolute path, so a project reached
//! through a symlink is the same project as its real location.

use pim_core::TaskId;
use std::path::{Path, PathBuf};

/// Env var overriding the shared base root (used by tests and nested workers).
pub const BASE_ROOT_ENV: &str = "PI_MESSENGER_HOME";

/// Canonicalize a path, falling back to the input when resolution fails
/// (e.g. the path does not exist yet).
pub fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Shared base root for cross-project mesh state: registry and inboxes.
///
/// `<home>/.pi/agent/messenger`, overridable via [`BASE_ROOT_ENV`].
pub fn base_root() -> PathBuf {
    if let Ok(overridden) = std::env::var(BASE_ROOT_ENV) {
        if !overridden.is_empty() {
            return PathBuf::from(overridden);
        }
    }
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".pi/agent/messenger")
}

/// Mesh-level directories under the shared base root.
#[derive(Debug, Clone)]
pub struct BasePaths {
    root: PathBuf,
}

impl BasePaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Resolve from the environment/home.
    pub fn discover() -> Self {
        Self::new(base_root())
    }

    pub fn registry_dir(&self) -> PathBuf {
        self.root.join("registry")
    }

    pub fn registration_path(&self, name: &str) -> PathBuf {
        self.registry_dir().join(format!("{name}.json"))
    }

    pub fn inbox_dir(&self, name: &str) -> PathBuf {
        self.root.join("inbox").join(name)
    }
}

/// Per-project state layout under `<project>/.pi/messenger`.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    /// Canonicalized project root
    root: PathBuf,
}

impl ProjectPaths {
    pub fn new(project_root: &Path) -> Self {
        Self { root: canonical(project_root) }
    }

    /// The canonicalized project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn messenger_dir(&self) -> PathBuf {
        self.root.join(".pi/messenger")
    }

    pub fn feed_path(&self) -> PathBuf {
        self.messenger_dir().join("feed.jsonl")
    }

    pub fn crew_dir(&self) -> PathBuf {
        self.messenger_dir().join("crew")
    }

    pub fn plan_path(&self) -> PathBuf {
        self.crew_dir().join("plan.json")
    }

    /// Last planner output, stored as the plan spec.
    pub fn plan_spec_path(&self) -> PathBuf {
        self.crew_dir().join("plan.md")
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.crew_dir().join("tasks")
    }

    pub fn task_path(&self, id: TaskId) -> PathBuf {
        self.tasks_dir().join(format!("{id}.json"))
    }

    pub fn task_spec_path(&self, id: TaskId) -> PathBuf {
        self.tasks_dir().join(format!("{id}.md"))
    }

    pub fn task_progress_path(&self, id: TaskId) -> PathBuf {
        self.tasks_dir().join(format!("{id}.progress.md"))
    }

    pub fn blocks_dir(&self) -> PathBuf {
        self.crew_dir().join("blocks")
    }

    pub fn block_path(&self, id: TaskId) -> PathBuf {
        self.blocks_dir().join(format!("{id}.md"))
    }

    pub fn planning_progress_path(&self) -> PathBuf {
        self.crew_dir().join("planning-progress.md")
    }

    pub fn planning_outline_path(&self) -> PathBuf {
        self.crew_dir().join("planning-outline.md")
    }

    pub fn planning_state_path(&self) -> PathBuf {
        self.crew_dir().join("planning-state.json")
    }

    pub fn crew_config_path(&self) -> PathBuf {
        self.crew_dir().join("config.json")
    }

    pub fn lobby_keepalive_path(&self, lobby_id: &str) -> PathBuf {
        self.crew_dir().join(format!("lobby-{lobby_id}.alive"))
    }

    /// Project-level messenger config override.
    pub fn project_config_path(&self) -> PathBuf {
        self.root.join(".pi/pi-messenger.json")
    }
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;

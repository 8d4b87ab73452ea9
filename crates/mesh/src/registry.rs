// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peer registry over the shared base root.
//!
//! Each agent owns exactly one registration file and its own inbox directory;
//! everything else is read-only. Dead entries (pid gone) are pruned best
//! effort by whoever notices them.

use crate::liveness::pid_alive;
use pim_core::AgentRegistration;
use pim_store::{canonical, read_json, write_json_atomic, BasePaths};
use std::path::Path;

/// Errors from registry and inbox operations.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error(transparent)]
    Write(#[from] pim_store::WriteError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("agent not registered: {0}")]
    NotRegistered(String),
    #[error("name already taken: {0}")]
    NameTaken(String),
}

/// Handle to the registry directory.
#[derive(Debug, Clone)]
pub struct Registry {
    base: BasePaths,
}

impl Registry {
    pub fn new(base: BasePaths) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &BasePaths {
        &self.base
    }

    /// Write our registration and create our inbox directory.
    pub fn register(&self, registration: &AgentRegistration) -> Result<(), MeshError> {
        write_json_atomic(&self.base.registration_path(&registration.name), registration)?;
        std::fs::create_dir_all(self.base.inbox_dir(&registration.name))?;
        Ok(())
    }

    pub fn load(&self, name: &str) -> Option<AgentRegistration> {
        read_json(&self.base.registration_path(name))
    }

    /// Read-modify-write our own registration.
    pub fn update(
        &self,
        name: &str,
        mutate: impl FnOnce(&mut AgentRegistration),
    ) -> Result<AgentRegistration, MeshError> {
        let mut registration =
            self.load(name).ok_or_else(|| MeshError::NotRegistered(name.to_string()))?;
        mutate(&mut registration);
        write_json_atomic(&self.base.registration_path(name), &registration)?;
        Ok(registration)
    }

    /// Clean shutdown: delete the registration (releasing all reservations)
    /// and sweep the inbox directory.
    pub fn deregister(&self, name: &str) -> Result<(), MeshError> {
        pim_store::remove_if_exists(&self.base.registration_path(name))?;
        let inbox = self.base.inbox_dir(name);
        if inbox.is_dir() {
            let _ = std::fs::remove_dir_all(&inbox);
        }
        Ok(())
    }

    /// Enumerate live peers. Entries whose pid is dead are pruned (best
    /// effort). With `scope`, only peers whose canonicalized cwd equals the
    /// given canonicalized project are returned.
    pub fn active_peers(&self, scope: Option<&Path>) -> Vec<AgentRegistration> {
        let scope = scope.map(canonical);
        let mut peers = Vec::new();
        let Ok(entries) = std::fs::read_dir(self.base.registry_dir()) else {
            return peers;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            let Some(registration) = read_json::<AgentRegistration>(&path) else {
                continue;
            };
            if !pid_alive(registration.pid) {
                tracing::debug!(peer = %registration.name, pid = registration.pid, "pruning dead registration");
                let _ = std::fs::remove_file(&path);
                continue;
            }
            if let Some(scope) = &scope {
                if &canonical(&registration.cwd) != scope {
                    continue;
                }
            }
            peers.push(registration);
        }
        peers.sort_by(|a, b| a.name.cmp(&b.name));
        peers
    }

    /// Names currently present in the registry, dead or alive.
    pub fn taken_names(&self) -> std::collections::HashSet<String> {
        let mut names = std::collections::HashSet::new();
        if let Ok(entries) = std::fs::read_dir(self.base.registry_dir()) {
            for entry in entries.flatten() {
                let name = entry.file_name();
                if let Some(stem) = name.to_string_lossy().strip_suffix(".json") {
                    names.insert(stem.to_string());
                }
            }
        }
        names
    }

    /// Atomic rename: move the registration file and the inbox directory.
    ///
    /// Peers may briefly observe the old name; that is tolerated.
    pub fn rename(&self, old: &str, new: &str) -> Result<AgentRegistration, MeshError> {
        if self.base.registration_path(new).exists() {
            return Err(MeshError::NameTaken(new.to_string()));
        }
        let mut registration =
            self.load(old).ok_or_else(|| MeshError::NotRegistered(old.to_string()))?;
        registration.name = new.to_string();
        write_json_atomic(&self.base.registration_path(new), &registration)?;
        pim_store::remove_if_exists(&self.base.registration_path(old))?;

        let old_inbox = self.base.inbox_dir(old);
        let new_inbox = self.base.inbox_dir(new);
        if old_inbox.is_dir() {
            std::fs::rename(&old_inbox, &new_inbox)?;
        } else {
            std::fs::create_dir_all(&new_inbox)?;
        }
        Ok(registration)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

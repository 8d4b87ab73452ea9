// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path-prefix reservations across peers.
//!
//! Reservations live inside each agent's registration; the engine only ever
//! rewrites its own. Conflict checks read every live peer.

use crate::registry::{MeshError, Registry};
use pim_core::Reservation;
use std::path::{Component, Path};

/// A conflicting reservation held by another peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictInfo {
    pub peer: String,
    pub path: String,
    pub reason: Option<String>,
    pub folder: std::path::PathBuf,
    pub branch: Option<String>,
}

/// Whether two paths conflict: one is a component-wise prefix of the other.
///
/// `src/api` conflicts with `src/api/handler.rs` and with `src`, but not
/// with `src/api2`.
pub fn paths_conflict(a: &str, b: &str) -> bool {
    let a: Vec<Component<'_>> = Path::new(a).components().collect();
    let b: Vec<Component<'_>> = Path::new(b).components().collect();
    let shorter = a.len().min(b.len());
    a[..shorter] == b[..shorter]
}

/// Reservation operations bound to one registry.
#[derive(Debug, Clone)]
pub struct Reservations {
    registry: Registry,
}

impl Reservations {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Add reservations to our own registration.
    pub fn reserve(
        &self,
        name: &str,
        paths: &[String],
        reason: Option<&str>,
    ) -> Result<(), MeshError> {
        self.registry.update(name, |registration| {
            for path in paths {
                if registration.reservations.iter().any(|r| r.path == *path) {
                    continue;
                }
                let mut reservation = Reservation::new(path.clone());
                reservation.reason = reason.map(str::to_string);
                registration.reservations.push(reservation);
            }
        })?;
        Ok(())
    }

    /// Release the given paths, or all reservations when `paths` is `None`.
    pub fn release(&self, name: &str, paths: Option<&[String]>) -> Result<Vec<String>, MeshError> {
        let mut released = Vec::new();
        self.registry.update(name, |registration| match paths {
            None => {
                released = registration.reservations.drain(..).map(|r| r.path).collect();
            }
            Some(paths) => {
                registration.reservations.retain(|r| {
                    if paths.contains(&r.path) {
                        released.push(r.path.clone());
                        false
                    } else {
                        true
                    }
                });
            }
        })?;
        Ok(released)
    }

    /// Reservations held by other live peers that overlap `file`.
    ///
    /// A non-empty result blocks the write-like operation that asked.
    pub fn conflicts(&self, self_name: &str, file: &str) -> Vec<ConflictInfo> {
        let mut conflicts = Vec::new();
        for peer in self.registry.active_peers(None) {
            if peer.name == self_name {
                continue;
            }
            for reservation in &peer.reservations {
                if paths_conflict(&reservation.path, file) {
                    conflicts.push(ConflictInfo {
                        peer: peer.name.clone(),
                        path: reservation.path.clone(),
                        reason: reservation.reason.clone(),
                        folder: peer.cwd.clone(),
                        branch: peer.git_branch.clone(),
                    });
                }
            }
        }
        conflicts
    }
}

#[cfg(test)]
#[path = "reservations_tests.rs"]
mod tests;

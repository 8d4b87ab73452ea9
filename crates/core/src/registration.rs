// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peer registration record.
//!
//! One file per agent under the shared base root's `registry/` directory.
//! Liveness is file presence plus a live `pid` on the local OS; any reader
//! may prune entries whose process is gone.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A path reservation held by a peer.
///
/// Two reservations conflict when one path is a component-wise prefix of the
/// other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Reservation {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), reason: None }
    }

    crate::setters! {
        option {
            reason: String,
        }
    }
}

/// Rolling per-session counters, refreshed with the registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    #[serde(default)]
    pub tool_calls: u64,
    #[serde(default)]
    pub tokens: u64,
    #[serde(default)]
    pub files_modified: Vec<String>,
}

/// Last-seen activity, used for stuck detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityInfo {
    /// Epoch milliseconds of the last observed activity
    #[serde(default)]
    pub last_activity_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_activity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tool_call: Option<String>,
}

/// An agent's registry entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRegistration {
    pub name: String,
    pub pid: u32,
    pub session_id: String,
    pub cwd: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    /// Epoch milliseconds when the agent joined
    pub started_at: u64,
    #[serde(default)]
    pub is_human: bool,
    #[serde(default)]
    pub session: SessionStats,
    #[serde(default)]
    pub activity: ActivityInfo,
    #[serde(default)]
    pub reservations: Vec<Reservation>,
    /// Task spec excerpt for crew workers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    /// Fields written by newer peers are carried through read-modify-write.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AgentRegistration {
    pub fn new(
        name: impl Into<String>,
        pid: u32,
        session_id: impl Into<String>,
        cwd: impl Into<PathBuf>,
        started_at: u64,
    ) -> Self {
        Self {
            name: name.into(),
            pid,
            session_id: session_id.into(),
            cwd: cwd.into(),
            model: None,
            git_branch: None,
            started_at,
            is_human: false,
            session: SessionStats::default(),
            activity: ActivityInfo { last_activity_at: started_at, ..Default::default() },
            reservations: Vec::new(),
            spec: None,
            status_message: None,
            extra: serde_json::Map::new(),
        }
    }
}

crate::builder! {
    pub struct RegistrationBuilder => AgentRegistration {
        into {
            name: String = "amber-owl",
            session_id: String = "sess-1",
            cwd: PathBuf = "/tmp/project",
        }
        set {
            pid: u32 = 1,
            started_at: u64 = 0,
            is_human: bool = false,
            session: SessionStats = SessionStats::default(),
            activity: ActivityInfo = ActivityInfo::default(),
            reservations: Vec<Reservation> = Vec::new(),
            extra: serde_json::Map<String, serde_json::Value> = serde_json::Map::new(),
        }
        option {
            model: String = None,
            git_branch: String = None,
            spec: String = None,
            status_message: String = None,
        }
    }
}

#[cfg(test)]
#[path = "registration_tests.rs"]
mod tests;

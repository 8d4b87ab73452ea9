// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier types.
//!
//! Task ids are *not* random: they are `task-N` with `N` allocated
//! monotonically per project by the task store. Message and planning-run ids
//! are random.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier for a task within a project: `task-N`, `N >= 1`.
///
/// Ordered by the numeric suffix so `task-10` sorts after `task-2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(n: u64) -> Self {
        Self(n)
    }

    /// The numeric suffix.
    pub fn number(&self) -> u64 {
        self.0
    }
}

/// Error parsing a `task-N` identifier.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid task id: {0:?}")]
pub struct ParseTaskIdError(pub String);

impl FromStr for TaskId {
    type Err = ParseTaskIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n = s
            .strip_prefix("task-")
            .and_then(|rest| rest.parse::<u64>().ok())
            .filter(|n| *n >= 1)
            .ok_or_else(|| ParseTaskIdError(s.to_string()))?;
        Ok(Self(n))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

impl Serialize for TaskId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Generate a fresh random message id.
pub fn message_id() -> String {
    nanoid::nanoid!(21)
}

/// Generate a fresh planning-run id.
pub fn run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Filename stem for an inbox delivery: `<millis>-<rand>`.
///
/// Uniqueness comes from the random suffix; the millis prefix keeps directory
/// enumeration roughly send-ordered.
pub fn delivery_stem(epoch_ms: u64) -> String {
    format!("{}-{}", epoch_ms, nanoid::nanoid!(8))
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;

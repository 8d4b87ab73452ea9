// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only activity feed.
//!
//! One JSON object per line. Appends within one process are serial; across
//! processes, interleaving is per-line. Readers skip malformed lines instead
//! of failing, so a torn line from a crashed writer cannot poison the feed.

use crate::atomic::{append_line, write_atomic, WriteError};
use pim_core::FeedEvent;
use std::path::PathBuf;

/// Handle to a project's `feed.jsonl`.
#[derive(Debug, Clone)]
pub struct Feed {
    path: PathBuf,
}

impl Feed {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Append one event.
    pub fn append(&self, event: &FeedEvent) -> Result<(), WriteError> {
        let line = serde_json::to_string(event)?;
        append_line(&self.path, &line)
    }

    /// Read the last `limit` events in append order.
    pub fn read(&self, limit: usize) -> Vec<FeedEvent> {
        let Some(content) = crate::atomic::read_string(&self.path) else {
            return Vec::new();
        };
        let events: Vec<FeedEvent> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        let skip = events.len().saturating_sub(limit);
        events.into_iter().skip(skip).collect()
    }

    /// Keep only the last `max` events.
    pub fn prune(&self, max: usize) -> Result<(), WriteError> {
        let events = self.read(usize::MAX);
        if events.len() <= max {
            return Ok(());
        }
        let keep = &events[events.len() - max..];
        let mut out = String::new();
        for event in keep {
            out.push_str(&serde_json::to_string(event)?);
            out.push('\n');
        }
        write_atomic(&self.path, out.as_bytes())
    }
}

#[cfg(test)]
#[path = "feed_tests.rs"]
mod tests;

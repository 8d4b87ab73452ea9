// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message delivery into peer inbox directories.
//!
//! Each message is one atomically-written file with a unique name, so
//! concurrent senders never clobber each other and the recipient's watcher
//! only ever sees complete files.

use crate::registry::{MeshError, Registry};
use pim_core::{delivery_stem, InboxMessage};
use pim_store::write_json_atomic;
use std::path::{Path, PathBuf};

/// Env var marking a subprocess as a crew worker.
pub const CREW_WORKER_ENV: &str = "PI_CREW_WORKER";

/// Whether the current process is a crew worker.
///
/// Worker broadcasts are logged to the feed but never fanned out to peer
/// inboxes. This is a rule of the core, not a configuration option.
pub fn is_crew_worker() -> bool {
    std::env::var(CREW_WORKER_ENV).is_ok_and(|v| v == "1")
}

/// Sender half of the inbox mesh.
#[derive(Debug, Clone)]
pub struct Inbox {
    registry: Registry,
}

impl Inbox {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Deliver a message into the recipient's inbox directory.
    pub fn send(&self, message: &InboxMessage) -> Result<PathBuf, MeshError> {
        let dir = self.registry.base().inbox_dir(&message.to);
        let path = dir.join(format!("{}.json", delivery_stem(message.timestamp)));
        write_json_atomic(&path, message)?;
        Ok(path)
    }

    /// Build and deliver a message; returns the delivered message.
    pub fn send_text(
        &self,
        from: &str,
        to: &str,
        text: &str,
        timestamp: u64,
        reply_to: Option<&str>,
    ) -> Result<InboxMessage, MeshError> {
        let mut message = InboxMessage::new(from, to, text, timestamp);
        message.reply_to = reply_to.map(str::to_string);
        self.send(&message)?;
        Ok(message)
    }

    /// Deliver a copy to every active peer in scope except the sender.
    ///
    /// Returns the recipients actually delivered to. Broadcasts from crew
    /// workers deliver to nobody — the caller still logs them to the feed.
    pub fn broadcast(
        &self,
        from: &str,
        text: &str,
        timestamp: u64,
        scope: Option<&Path>,
    ) -> Result<Vec<String>, MeshError> {
        if is_crew_worker() {
            return Ok(Vec::new());
        }
        let mut delivered = Vec::new();
        for peer in self.registry.active_peers(scope) {
            if peer.name == from {
                continue;
            }
            self.send_text(from, &peer.name, text, timestamp, None)?;
            delivered.push(peer.name);
        }
        Ok(delivered)
    }

    /// Undelivered message count, without consuming anything.
    pub fn pending(&self, name: &str) -> usize {
        let dir = self.registry.base().inbox_dir(name);
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return 0;
        };
        entries
            .flatten()
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .count()
    }

    /// Poll-drain a peer's inbox: read, sort by filename, delete, return.
    ///
    /// Used as the degraded path when the watcher is down, and by workers
    /// that check mail between tool calls.
    pub fn drain(&self, name: &str) -> Vec<InboxMessage> {
        let dir = self.registry.base().inbox_dir(name);
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut paths: Vec<PathBuf> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|e| e == "json"))
            .collect();
        paths.sort();
        let mut messages = Vec::new();
        for path in paths {
            if let Some(message) = pim_store::read_json::<InboxMessage>(&path) {
                messages.push(message);
            }
            let _ = std::fs::remove_file(&path);
        }
        messages
    }
}

#[cfg(test)]
#[path = "inbox_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stuck-peer detection.
//!
//! A peer is stuck when it holds work (a task spec or a reservation) and its
//! last activity is older than the configured threshold. Each process emits
//! at most one notification per peer until the condition clears.

use pim_core::AgentRegistration;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct StuckDetector {
    notified: HashSet<String>,
}

impl StuckDetector {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_stuck(peer: &AgentRegistration, threshold_secs: u64, now_ms: u64) -> bool {
        let holds_work = peer.spec.is_some() || !peer.reservations.is_empty();
        if !holds_work {
            return false;
        }
        let idle_ms = now_ms.saturating_sub(peer.activity.last_activity_at);
        idle_ms > threshold_secs.saturating_mul(1_000)
    }

    /// Names of peers that just became stuck (first notification only).
    ///
    /// Peers that recovered are forgotten so they can be flagged again later.
    pub fn check(
        &mut self,
        peers: &[AgentRegistration],
        threshold_secs: u64,
        now_ms: u64,
    ) -> Vec<String> {
        let mut newly = Vec::new();
        let mut currently: HashSet<String> = HashSet::new();
        for peer in peers {
            if Self::is_stuck(peer, threshold_secs, now_ms) {
                currently.insert(peer.name.clone());
                if self.notified.insert(peer.name.clone()) {
                    newly.push(peer.name.clone());
                }
            }
        }
        self.notified.retain(|name| currently.contains(name));
        newly
    }
}

#[cfg(test)]
#[path = "stuck_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graceful shutdown protocol.
//!
//! The orchestrator asks nicely first: a structured inbox message headed
//! `SHUTDOWN REQUESTED`, a grace window, SIGTERM, another grace window,
//! SIGKILL. A worker acknowledges by exiting; there is no back-channel.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::future::Future;
use std::time::Duration;

/// First line of the shutdown inbox message.
pub const SHUTDOWN_HEADER: &str = "SHUTDOWN REQUESTED";

/// Body sent to workers when a shutdown is requested.
pub fn shutdown_message(reason: &str) -> String {
    format!(
        "{SHUTDOWN_HEADER}\n\n{reason}\n\nFinish your current step if it is quick, \
         then exit. Do not start new work."
    )
}

/// Race a future against a timeout: true if it settled first, false if the
/// timeout fired.
pub async fn race_timeout<F: Future>(future: F, ms: u64) -> bool {
    tokio::time::timeout(Duration::from_millis(ms), future).await.is_ok()
}

/// Send a signal to a pid, ignoring failures (the process may already be gone).
pub fn signal_pid(pid: u32, signal: Signal) {
    if pid == 0 {
        return;
    }
    let _ = kill(Pid::from_raw(pid as i32), signal);
}

pub fn sigterm(pid: u32) {
    signal_pid(pid, Signal::SIGTERM);
}

pub fn sigkill(pid: u32) {
    signal_pid(pid, Signal::SIGKILL);
}

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod tests;

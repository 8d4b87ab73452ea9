// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process liveness probes.

use nix::sys::signal::kill;
use nix::unistd::Pid;

/// Whether a pid is alive on the local OS.
///
/// Signal 0 probes without delivering. EPERM means the process exists but
/// belongs to someone else, which still counts as alive.
pub fn pid_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(test)]
#[path = "liveness_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide coordination state.
//!
//! One [`Coordinator`] per process, owned by the entry point and handed into
//! the router and engines (no global singletons). Autonomous and planning
//! state persist to disk on every change; a restarted process restores them
//! and detects stale runs through the stored pid.

use parking_lot::Mutex;
use pim_core::{
    AutonomousState, Clock, NullNotifier, PlanningPhase, PlanningState, Severity, SharedNotifier,
    StopReason, SystemClock, WaveResult,
};
use pim_store::{canonical, read_json, write_json_atomic, ProjectPaths};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A planning run whose `updated_at` is older than this is shown as stalled.
/// The subprocess is left alone.
pub const PLANNING_STALE_TIMEOUT_MS: u64 = 10 * 60 * 1_000;

/// Outcome of restoring persisted planning state at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanningRestore {
    /// Nothing persisted
    None,
    /// A live run was restored
    Restored(PlanningState),
    /// The stored pid is dead; state was cleared
    StaleCleared,
}

#[derive(Default)]
struct CoordInner {
    autonomous: Option<AutonomousState>,
    planning: Option<PlanningState>,
    planning_cancelled: bool,
    pending_auto_work: Option<PathBuf>,
    planning_overlay_pending: Option<String>,
    dismissed_runs: HashSet<String>,
}

/// Shared coordination handle.
#[derive(Clone)]
pub struct Coordinator<C: Clock = SystemClock> {
    clock: C,
    inner: Arc<Mutex<CoordInner>>,
    /// Single-slot wake for concurrency adjustments; the most recent waiter
    /// wins.
    wake: Arc<tokio::sync::Notify>,
    notifier: SharedNotifier,
}

/// Clamp a requested concurrency to `[1, min(10, config_max)]`.
///
/// Fractions truncate toward zero; non-finite input clamps to the minimum.
pub fn clamp_concurrency(requested: f64, config_max: u32) -> u32 {
    let ceiling = config_max.clamp(1, 10);
    if !requested.is_finite() {
        return 1;
    }
    let truncated = requested.trunc();
    if truncated < 1.0 {
        1
    } else if truncated >= f64::from(ceiling) {
        ceiling
    } else {
        truncated as u32
    }
}

impl<C: Clock> Coordinator<C> {
    pub fn new(clock: C) -> Self {
        Self::with_notifier(clock, Arc::new(NullNotifier))
    }

    /// Coordinator wired to the host's notification callback.
    pub fn with_notifier(clock: C, notifier: SharedNotifier) -> Self {
        Self {
            clock,
            inner: Arc::new(Mutex::new(CoordInner::default())),
            wake: Arc::new(tokio::sync::Notify::new()),
            notifier,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // ---- autonomous run ----

    pub fn start_autonomous(&self, cwd: &Path, concurrency: u32) {
        let mut state = AutonomousState::idle();
        state.active = true;
        state.cwd = canonical(cwd);
        state.wave_number = 1;
        state.concurrency = concurrency;
        state.started_at = Some(self.clock.epoch_ms());
        state.auto_overlay_pending = true;
        self.inner.lock().autonomous = Some(state);
    }

    pub fn stop_autonomous(&self, reason: StopReason) {
        let mut inner = self.inner.lock();
        if let Some(state) = inner.autonomous.as_mut() {
            state.active = false;
            state.stopped_at = Some(self.clock.epoch_ms());
            state.stop_reason = Some(reason);
        }
    }

    pub fn autonomous_state(&self) -> Option<AutonomousState> {
        self.inner.lock().autonomous.clone()
    }

    /// Whether an autonomous run is active for this (canonicalized) project.
    pub fn is_autonomous_for(&self, cwd: &Path) -> bool {
        let cwd = canonical(cwd);
        self.inner
            .lock()
            .autonomous
            .as_ref()
            .is_some_and(|state| state.active && state.cwd == cwd)
    }

    /// Concurrency of the active autonomous run, if any.
    pub fn autonomous_concurrency(&self, cwd: &Path) -> Option<u32> {
        let cwd = canonical(cwd);
        self.inner
            .lock()
            .autonomous
            .as_ref()
            .filter(|state| state.active && state.cwd == cwd)
            .map(|state| state.concurrency)
    }

    /// Adjust concurrency of the active run and wake one waiter.
    pub fn set_concurrency(&self, requested: f64, config_max: u32) -> u32 {
        let value = clamp_concurrency(requested, config_max);
        if let Some(state) = self.inner.lock().autonomous.as_mut() {
            state.concurrency = value;
        }
        self.wake.notify_one();
        value
    }

    /// Await the next concurrency wake (one waiter at a time).
    pub async fn concurrency_wake(&self) {
        self.wake.notified().await;
    }

    /// Record a wave result and advance the wave counter.
    pub fn push_wave_result(&self, result: WaveResult) {
        let mut inner = self.inner.lock();
        if let Some(state) = inner.autonomous.as_mut() {
            state.wave_history.push(result);
            state.wave_number += 1;
        }
    }

    // ---- planning run ----

    /// Begin a planning run: fresh run id, pid pinned, cancel flag cleared,
    /// state persisted.
    pub fn start_planning_run(&self, paths: &ProjectPaths, max_passes: u32) -> PlanningState {
        let state = PlanningState {
            active: true,
            cwd: paths.root().to_path_buf(),
            run_id: pim_core::run_id(),
            pass: 1,
            max_passes,
            phase: PlanningPhase::Idle,
            updated_at: self.clock.epoch_ms(),
            pid: std::process::id(),
        };
        let mut inner = self.inner.lock();
        inner.planning_cancelled = false;
        inner.planning = Some(state.clone());
        drop(inner);
        self.persist_planning(paths, &state);
        state
    }

    /// Update phase/pass. No-op once cancellation was requested.
    pub fn set_planning_phase(&self, paths: &ProjectPaths, phase: PlanningPhase, pass: u32) {
        let mut inner = self.inner.lock();
        if inner.planning_cancelled {
            return;
        }
        if let Some(state) = inner.planning.as_mut() {
            state.phase = phase;
            state.pass = pass;
            state.updated_at = self.clock.epoch_ms();
            let state = state.clone();
            drop(inner);
            self.persist_planning(paths, &state);
        }
    }

    /// Finish the run. No-op once cancellation was requested.
    pub fn finish_planning_run(&self, paths: &ProjectPaths) {
        let mut inner = self.inner.lock();
        if inner.planning_cancelled {
            return;
        }
        if let Some(state) = inner.planning.as_mut() {
            state.active = false;
            state.phase = PlanningPhase::Completed;
            state.updated_at = self.clock.epoch_ms();
            let state = state.clone();
            inner.planning = None;
            drop(inner);
            self.persist_planning(paths, &state);
        }
    }

    /// Clear planning state entirely (cancel path).
    pub fn clear_planning(&self, paths: &ProjectPaths) {
        self.inner.lock().planning = None;
        let mut idle = PlanningState::idle();
        idle.updated_at = self.clock.epoch_ms();
        self.persist_planning(paths, &idle);
    }

    fn persist_planning(&self, paths: &ProjectPaths, state: &PlanningState) {
        if let Err(error) = write_json_atomic(&paths.planning_state_path(), state) {
            tracing::warn!(error = %error, "failed to persist planning state");
        }
    }

    /// Raise the one-shot cancellation flag. Cleared by the next
    /// `start_planning_run`.
    pub fn cancel_planning(&self) {
        self.inner.lock().planning_cancelled = true;
    }

    pub fn planning_cancelled(&self) -> bool {
        self.inner.lock().planning_cancelled
    }

    pub fn planning_state(&self) -> Option<PlanningState> {
        self.inner.lock().planning.clone()
    }

    pub fn is_planning_active(&self) -> bool {
        self.inner.lock().planning.as_ref().is_some_and(|s| s.active)
    }

    /// Whether a planning run is active for this (canonicalized) project.
    pub fn is_planning_for_cwd(&self, cwd: &Path) -> bool {
        let cwd = canonical(cwd);
        self.inner
            .lock()
            .planning
            .as_ref()
            .is_some_and(|state| state.active && canonical(&state.cwd) == cwd)
    }

    /// Stalled for UI purposes only; the subprocess is not killed.
    pub fn is_planning_stalled(&self) -> bool {
        self.inner.lock().planning.as_ref().is_some_and(|state| {
            state.active
                && self.clock.epoch_ms().saturating_sub(state.updated_at)
                    > PLANNING_STALE_TIMEOUT_MS
        })
    }

    /// Restore persisted planning state at startup.
    ///
    /// A stored pid that is no longer alive means the writer died; the state
    /// is cleared and the caller is told so it can notify the UI.
    pub fn restore_planning_state(&self, paths: &ProjectPaths) -> PlanningRestore {
        let Some(state) = read_json::<PlanningState>(&paths.planning_state_path()) else {
            return PlanningRestore::None;
        };
        if !state.active {
            return PlanningRestore::None;
        }
        if !pim_mesh::pid_alive(state.pid) {
            tracing::info!(pid = state.pid, "clearing stale planning state from dead process");
            self.clear_planning(paths);
            self.notifier.notify(
                Severity::Info,
                "cleared a stale planning run left by a dead process (staleCleared)",
            );
            return PlanningRestore::StaleCleared;
        }
        self.inner.lock().planning = Some(state.clone());
        PlanningRestore::Restored(state)
    }

    // ---- auto-open intents & pending auto-work ----

    /// Queue the planning-overlay intent for a run unless that run id was
    /// already dismissed.
    pub fn queue_planning_overlay(&self, run_id: &str) {
        let mut inner = self.inner.lock();
        if inner.dismissed_runs.contains(run_id) {
            return;
        }
        inner.planning_overlay_pending = Some(run_id.to_string());
    }

    /// Dismiss a run id forever; it can never be queued again.
    pub fn dismiss_planning_overlay(&self, run_id: &str) {
        let mut inner = self.inner.lock();
        inner.dismissed_runs.insert(run_id.to_string());
        if inner.planning_overlay_pending.as_deref() == Some(run_id) {
            inner.planning_overlay_pending = None;
        }
    }

    pub fn take_planning_overlay(&self) -> Option<String> {
        self.inner.lock().planning_overlay_pending.take()
    }

    /// Consume the autonomous-overlay intent.
    pub fn take_autonomous_overlay(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.autonomous.as_mut() {
            Some(state) if state.auto_overlay_pending => {
                state.auto_overlay_pending = false;
                true
            }
            _ => false,
        }
    }

    /// One-slot pending auto-work flag with its project.
    pub fn set_pending_auto_work(&self, cwd: &Path) {
        self.inner.lock().pending_auto_work = Some(canonical(cwd));
    }

    pub fn take_pending_auto_work(&self) -> Option<PathBuf> {
        self.inner.lock().pending_auto_work.take()
    }
}

#[cfg(test)]
#[path = "coord_tests.rs"]
mod tests;

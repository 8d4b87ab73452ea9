// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbox watcher: one reactive source per recipient directory.
//!
//! On create events the file is read, delivered to the agent loop, and
//! deleted. If the native watcher dies it is restarted with exponential
//! backoff; after the retry budget is spent the task degrades to periodic
//! polling so messaging keeps working, just slower.

use notify::{RecursiveMode, Watcher};
use pim_core::InboxMessage;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Restart attempts before degrading to polling.
const MAX_WATCHER_RESTARTS: u32 = 5;

/// Poll cadence in degraded mode.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Retry window for a file that appeared but does not parse yet.
const PARSE_RETRY: Duration = Duration::from_millis(25);
const PARSE_ATTEMPTS: u32 = 3;

enum Signal {
    Created(PathBuf),
    WatcherDown,
}

/// Handle to a running inbox watcher task.
pub struct InboxWatcher {
    task: tokio::task::JoinHandle<()>,
}

impl InboxWatcher {
    /// Watch `inbox_dir`, delivering each message to `delivery` before the
    /// backing file is removed.
    pub fn spawn(inbox_dir: PathBuf, delivery: mpsc::Sender<InboxMessage>) -> Self {
        let task = tokio::spawn(run(inbox_dir, delivery));
        Self { task }
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for InboxWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn make_watcher(
    dir: &Path,
    signals: mpsc::UnboundedSender<Signal>,
) -> Option<notify::RecommendedWatcher> {
    let tx = signals.clone();
    let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
        match result {
            Ok(event) => {
                for path in event.paths {
                    if path.extension().is_some_and(|e| e == "json") {
                        let _ = tx.send(Signal::Created(path));
                    }
                }
            }
            Err(_) => {
                let _ = tx.send(Signal::WatcherDown);
            }
        }
    })
    .ok()?;
    watcher.watch(dir, RecursiveMode::NonRecursive).ok()?;
    Some(watcher)
}

async fn run(inbox_dir: PathBuf, delivery: mpsc::Sender<InboxMessage>) {
    let _ = std::fs::create_dir_all(&inbox_dir);
    let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();

    let mut watcher = make_watcher(&inbox_dir, signal_tx.clone());
    let mut restarts = 0u32;

    // Catch up on deliveries that landed before the watcher existed.
    if drain_dir(&inbox_dir, &delivery).await.is_err() {
        return;
    }

    let mut poll = tokio::time::interval(POLL_INTERVAL);
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            signal = signal_rx.recv() => match signal {
                Some(Signal::Created(path)) => {
                    if deliver_file(&path, &delivery).await.is_err() {
                        return;
                    }
                }
                Some(Signal::WatcherDown) | None => {
                    watcher = None;
                    if restarts < MAX_WATCHER_RESTARTS {
                        restarts += 1;
                        let backoff = Duration::from_millis(100 * (1 << restarts));
                        tracing::warn!(dir = %inbox_dir.display(), restarts, "inbox watcher died, restarting");
                        tokio::time::sleep(backoff).await;
                        watcher = make_watcher(&inbox_dir, signal_tx.clone());
                    } else {
                        tracing::warn!(dir = %inbox_dir.display(), "inbox watcher retry budget spent, polling");
                    }
                }
            },
            _ = poll.tick() => {
                if watcher.is_none() && drain_dir(&inbox_dir, &delivery).await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Deliver every message file currently in the directory, oldest first.
async fn drain_dir(dir: &Path, delivery: &mpsc::Sender<InboxMessage>) -> Result<(), ()> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Ok(());
    };
    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|e| e == "json"))
        .collect();
    paths.sort();
    for path in paths {
        deliver_file(&path, delivery).await?;
    }
    Ok(())
}

/// Read, deliver, delete. Err(()) means the agent loop hung up.
async fn deliver_file(path: &Path, delivery: &mpsc::Sender<InboxMessage>) -> Result<(), ()> {
    let mut message = None;
    for attempt in 0..PARSE_ATTEMPTS {
        if !path.exists() {
            // Already consumed (e.g. by a drain racing the watcher event).
            return Ok(());
        }
        message = pim_store::read_json::<InboxMessage>(path);
        if message.is_some() {
            break;
        }
        if attempt + 1 < PARSE_ATTEMPTS {
            tokio::time::sleep(PARSE_RETRY).await;
        }
    }
    let removed = std::fs::remove_file(path).is_ok();
    match message {
        Some(message) if removed => delivery.send(message).await.map_err(|_| ()),
        Some(_) => Ok(()), // another consumer won the race
        None => {
            tracing::debug!(path = %path.display(), "dropping unparseable inbox file");
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;

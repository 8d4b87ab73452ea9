// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pim-mesh: the file-based coordination mesh.
//!
//! Peer registry with pid liveness, inbox message delivery, path
//! reservations, and stuck detection — all over a shared base directory,
//! with no daemon and no locks.

pub mod inbox;
pub mod liveness;
pub mod names;
pub mod registry;
pub mod reservations;
pub mod stuck;
pub mod watcher;

pub use inbox::{is_crew_worker, Inbox, CREW_WORKER_ENV};
pub use liveness::pid_alive;
pub use registry::{MeshError, Registry};
pub use reservations::{paths_conflict, ConflictInfo, Reservations};
pub use stuck::StuckDetector;
pub use watcher::InboxWatcher;

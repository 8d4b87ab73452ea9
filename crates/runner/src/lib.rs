// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pim-runner: coding-agent subprocesses and the lobby worker pool.

pub mod command;
pub mod pool;
pub mod shutdown;
pub mod spawner;
pub mod stream;
pub mod truncate;

pub use command::{build_args, AgentInvocation, BUILTIN_TOOLS};
pub use pool::{assignment_message, lobby_prompt, LobbyWorker, WorkerPool, ASSIGNMENT_HEADER};
pub use shutdown::{race_timeout, shutdown_message, sigkill, sigterm, SHUTDOWN_HEADER};
#[cfg(any(test, feature = "test-support"))]
pub use spawner::FakeSpawner;
pub use spawner::{AgentResult, AgentSpawner, LiveAgent, LiveAgents, LocalSpawner, RunnerError, SpawnRequest};
pub use stream::StreamProgress;
pub use truncate::{truncate_output, TRUNCATION_MARKER};

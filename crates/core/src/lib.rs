// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pim-core: shared types for the pi-messenger crew orchestrator

pub mod macros;

pub mod clock;
pub mod config;
pub mod crew_config;
pub mod feed;
pub mod id;
pub mod message;
pub mod model;
pub mod notify;
pub mod plan;
pub mod registration;
pub mod state;
pub mod task;

pub use clock::{iso_from_epoch_ms, Clock, FakeClock, SystemClock};
pub use config::{auto_register_matches, ContextMode, MessengerConfig, MessengerOverlay, NameWords};
pub use crew_config::{
    ConcurrencyConfig, CoordinationLevel, CrewConfig, DependencyMode, MessageBudgets, ModelsConfig,
    PlanningConfig, ReviewConfig, TruncationLimits, WorkConfig,
};
pub use feed::{FeedEvent, FeedEventKind};
pub use id::{delivery_stem, message_id, run_id, ParseTaskIdError, TaskId};
pub use message::InboxMessage;
pub use model::ModelSpec;
#[cfg(any(test, feature = "test-support"))]
pub use notify::RecordingNotifier;
pub use notify::{Notifier, NullNotifier, Severity, SharedNotifier};
pub use plan::{Plan, PROMPT_SENTINEL};
#[cfg(any(test, feature = "test-support"))]
pub use registration::RegistrationBuilder;
pub use registration::{ActivityInfo, AgentRegistration, Reservation, SessionStats};
pub use state::{AutonomousState, PlanningPhase, PlanningState, StopReason, WaveResult};
#[cfg(any(test, feature = "test-support"))]
pub use task::TaskBuilder;
pub use task::{Task, TaskStatus};

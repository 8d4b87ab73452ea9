// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification callback to the UI collaborator.
//!
//! The core never renders notifications itself; it calls the host-supplied
//! [`Notifier`] with a severity and a short message. Hosts plug in whatever
//! surface they have (status bar, overlay toast, stderr).

#[cfg(any(test, feature = "test-support"))]
use parking_lot::Mutex;
use std::sync::Arc;

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

crate::simple_display! {
    Severity {
        Info => "info",
        Warning => "warning",
        Error => "error",
    }
}

/// Host callback for user-visible notifications.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, severity: Severity, message: &str);
}

/// Discards every notification. The default for embedders that bring no UI.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _severity: Severity, _message: &str) {}
}

/// Collects notifications for assertions.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<(Severity, String)>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Severity, String)> {
        self.events.lock().clone()
    }

    /// Whether any recorded message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.events.lock().iter().any(|(_, message)| message.contains(needle))
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Notifier for RecordingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        self.events.lock().push((severity, message.to_string()));
    }
}

/// Shared notifier handle as stored by the engines.
pub type SharedNotifier = Arc<dyn Notifier>;

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbox message record.

use serde::{Deserialize, Serialize};

/// A message delivered through a peer's inbox directory.
///
/// One message per file; the recipient's watcher consumes and deletes each
/// file after delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxMessage {
    pub id: String,
    pub from: String,
    pub to: String,
    pub text: String,
    /// Epoch milliseconds at send time
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

impl InboxMessage {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        text: impl Into<String>,
        timestamp: u64,
    ) -> Self {
        Self {
            id: crate::id::message_id(),
            from: from.into(),
            to: to.into(),
            text: text.into(),
            timestamp,
            reply_to: None,
        }
    }

    crate::setters! {
        option {
            reply_to: String,
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handler responses: a human string plus a machine object.
//!
//! Errors are values carried in `details.error`, never exceptions.

use serde::Serialize;
use serde_json::{Map, Value};

/// Structured half of a response.
#[derive(Debug, Clone, Serialize)]
pub struct Details {
    /// Which handler produced the response
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What every handler returns.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse {
    pub text: String,
    pub details: Details,
}

impl ActionResponse {
    pub fn ok(mode: &str, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            details: Details { mode: mode.to_string(), error: None, extra: Map::new() },
        }
    }

    pub fn error(mode: &str, code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            details: Details { mode: mode.to_string(), error: Some(code.into()), extra: Map::new() },
        }
    }

    /// Attach one machine-readable detail.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.extra.insert(key.to_string(), value.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.details.error.is_some()
    }
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;

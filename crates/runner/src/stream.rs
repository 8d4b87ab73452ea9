// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL progress stream parsing.
//!
//! The subprocess emits one JSON event per stdout line. Three kinds drive
//! progress: tool start (current tool + arg preview), tool end (recent-tools
//! ring + counter), and message end (token accounting + error text).
//! Malformed lines are ignored.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Entries kept in the recent-tools ring.
const RECENT_TOOLS: usize = 8;

/// Max characters of the tool-arg preview.
const ARG_PREVIEW_LEN: usize = 80;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum StreamEvent {
    #[serde(rename = "tool_execution_start")]
    ToolStart {
        #[serde(rename = "toolName")]
        tool_name: String,
        #[serde(default)]
        args: Option<serde_json::Value>,
    },
    #[serde(rename = "tool_execution_end")]
    ToolEnd,
    #[serde(rename = "message_end")]
    MessageEnd {
        #[serde(default)]
        message: Option<MessagePayload>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(rename = "errorMessage", default)]
    error_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    input: u64,
    #[serde(default)]
    output: u64,
}

/// Rolling progress extracted from the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamProgress {
    pub current_tool: Option<String>,
    pub current_args: Option<String>,
    pub recent_tools: VecDeque<String>,
    pub tool_count: u64,
    pub tokens: u64,
    pub error: Option<String>,
}

impl StreamProgress {
    /// Apply one stdout line. Unparseable lines are ignored.
    pub fn apply_line(&mut self, line: &str) {
        let Ok(event) = serde_json::from_str::<StreamEvent>(line) else {
            return;
        };
        match event {
            StreamEvent::ToolStart { tool_name, args } => {
                self.current_args = args.map(|value| {
                    let mut preview = value.to_string();
                    let mut end = ARG_PREVIEW_LEN.min(preview.len());
                    while !preview.is_char_boundary(end) {
                        end -= 1;
                    }
                    preview.truncate(end);
                    preview
                });
                self.current_tool = Some(tool_name);
            }
            StreamEvent::ToolEnd => {
                if let Some(tool) = self.current_tool.take() {
                    if self.recent_tools.len() == RECENT_TOOLS {
                        self.recent_tools.pop_front();
                    }
                    self.recent_tools.push_back(tool);
                }
                self.current_args = None;
                self.tool_count += 1;
            }
            StreamEvent::MessageEnd { message } => {
                if let Some(message) = message {
                    if let Some(usage) = message.usage {
                        self.tokens += usage.input + usage.output;
                    }
                    if let Some(error) = message.error_message {
                        self.error = Some(error);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coding-agent command-line construction.
//!
//! The subprocess contract: `--mode streaming-json --no-session -p <prompt>`,
//! optional `--model` / `--thinking`, `--tools` restricted to the builtin
//! set, repeated `--extension`, and `--append-system-prompt <file>` whose
//! file lives in a per-spawn temp directory with restricted mode.

use pim_core::ModelSpec;
use std::path::{Path, PathBuf};

/// Built-in tools a subprocess may be granted.
pub const BUILTIN_TOOLS: &[&str] = &["read", "bash", "edit", "write", "grep", "find", "ls"];

/// Everything needed to invoke one coding-agent subprocess.
#[derive(Debug, Clone)]
pub struct AgentInvocation {
    /// Agent binary
    pub program: String,
    pub prompt: String,
    /// Raw model string; may carry a `:level` thinking suffix
    pub model: Option<String>,
    /// Role-level thinking, suppressed when the model encodes its own
    pub thinking: Option<String>,
    pub tools: Vec<String>,
    pub extensions: Vec<PathBuf>,
    pub system_prompt: Option<String>,
    /// Overrides merged atop the inherited environment
    pub env: Vec<(String, String)>,
    pub cwd: PathBuf,
    /// Mesh identity the subprocess registers under
    pub agent_name: String,
    /// Role for truncation/model lookup (planner, worker, reviewer, analyst)
    pub role: String,
    /// Marks the subprocess as a crew worker on the mesh
    pub is_worker: bool,
}

impl AgentInvocation {
    pub fn new(program: impl Into<String>, prompt: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            prompt: prompt.into(),
            model: None,
            thinking: None,
            tools: BUILTIN_TOOLS.iter().map(|t| t.to_string()).collect(),
            extensions: Vec::new(),
            system_prompt: None,
            env: Vec::new(),
            cwd: cwd.into(),
            agent_name: String::new(),
            role: "worker".to_string(),
            is_worker: false,
        }
    }

    pim_core::setters! {
        into {
            agent_name: String,
            role: String,
        }
        set {
            tools: Vec<String>,
            extensions: Vec<PathBuf>,
            env: Vec<(String, String)>,
            is_worker: bool,
        }
        option {
            model: String,
            thinking: String,
            system_prompt: String,
        }
    }
}

/// Build the argv (after the program) for an invocation.
///
/// `system_prompt_path` is the already-written temp file, present only when
/// the invocation carries a system prompt.
pub fn build_args(invocation: &AgentInvocation, system_prompt_path: Option<&Path>) -> Vec<String> {
    let mut args = vec![
        "--mode".to_string(),
        "streaming-json".to_string(),
        "--no-session".to_string(),
        "-p".to_string(),
        invocation.prompt.clone(),
    ];

    if let Some(raw) = &invocation.model {
        let spec = ModelSpec::parse(raw);
        args.push("--model".to_string());
        args.push(raw.clone());
        // A :level suffix on the model wins over the role-level flag.
        if !spec.has_inline_thinking() {
            if let Some(level) = &invocation.thinking {
                args.push("--thinking".to_string());
                args.push(level.clone());
            }
        }
    } else if let Some(level) = &invocation.thinking {
        args.push("--thinking".to_string());
        args.push(level.clone());
    }

    let tools: Vec<&str> = invocation
        .tools
        .iter()
        .map(String::as_str)
        .filter(|t| BUILTIN_TOOLS.contains(t))
        .collect();
    if !tools.is_empty() {
        args.push("--tools".to_string());
        args.push(tools.join(","));
    }

    for extension in &invocation.extensions {
        args.push("--extension".to_string());
        args.push(extension.display().to_string());
    }

    if let Some(path) = system_prompt_path {
        args.push("--append-system-prompt".to_string());
        args.push(path.display().to_string());
    }

    args
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;

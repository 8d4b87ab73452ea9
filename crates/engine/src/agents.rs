// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent role profiles.
//!
//! A profile describes how to invoke the coding-agent binary for one role.
//! The roster is resolved by the caller (binary discovery + config) and
//! handed to the engines; a missing role surfaces as `no_planner` /
//! `no_worker` at the API boundary.

use pim_core::{CrewConfig, ModelSpec};
use pim_runner::AgentInvocation;
use std::path::PathBuf;

/// How to invoke the coding agent for one role.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    /// Agent binary
    pub program: String,
    /// Default model when neither task nor params override it
    pub model: Option<String>,
    pub tools: Vec<String>,
    pub extensions: Vec<PathBuf>,
    pub system_prompt: Option<String>,
}

impl AgentProfile {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            model: None,
            tools: pim_runner::BUILTIN_TOOLS.iter().map(|t| t.to_string()).collect(),
            extensions: Vec::new(),
            system_prompt: None,
        }
    }

    pim_core::setters! {
        set {
            tools: Vec<String>,
            extensions: Vec<PathBuf>,
        }
        option {
            model: String,
            system_prompt: String,
        }
    }

    /// Build an invocation for this profile.
    ///
    /// Model priority: explicit override, then the role model from config,
    /// then the profile's own default. A `:level` suffix on the chosen model
    /// suppresses the config thinking level.
    pub fn invocation(
        &self,
        role: &str,
        prompt: String,
        cwd: PathBuf,
        agent_name: String,
        config: &CrewConfig,
        model_override: Option<&str>,
    ) -> AgentInvocation {
        let role_model = match role {
            "planner" => config.models.planner.as_deref(),
            "worker" => config.models.worker.as_deref(),
            "reviewer" => config.models.reviewer.as_deref(),
            "analyst" => config.models.analyst.as_deref(),
            _ => None,
        };
        let model = model_override
            .map(str::to_string)
            .or_else(|| role_model.map(str::to_string))
            .or_else(|| self.model.clone());
        let thinking = match &model {
            Some(raw) if ModelSpec::parse(raw).has_inline_thinking() => None,
            _ => config.thinking_for(role).map(str::to_string),
        };

        let mut invocation = AgentInvocation::new(self.program.as_str(), prompt, cwd);
        invocation.model = model;
        invocation.thinking = thinking;
        invocation.tools = self.tools.clone();
        invocation.extensions = self.extensions.clone();
        invocation.system_prompt = self.system_prompt.clone();
        invocation.agent_name = agent_name;
        invocation.role = role.to_string();
        invocation.is_worker = role == "worker";
        invocation.env = config
            .work
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        invocation
    }
}

/// The discovered agent profiles per role.
#[derive(Debug, Clone, Default)]
pub struct AgentRoster {
    pub planner: Option<AgentProfile>,
    pub worker: Option<AgentProfile>,
    pub reviewer: Option<AgentProfile>,
}

#[cfg(test)]
#[path = "agents_tests.rs"]
mod tests;

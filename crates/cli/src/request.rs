// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tagged request surface.
//!
//! One request shape with many optional fields arrives at the router; it is
//! parsed into a precise [`CrewAction`] variant per operation so handlers
//! consume exactly the fields they need and unknown operations are an
//! exhaustive match.

use pim_core::TaskId;
use serde::Deserialize;

/// Raw request as delivered by the caller (terminal or overlay key).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    /// Dotted action string, e.g. `task.start`
    #[serde(default)]
    pub action: String,
    pub prd: Option<String>,
    pub prompt: Option<String>,
    pub id: Option<String>,
    pub task_id: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub target: Option<String>,
    pub summary: Option<String>,
    pub evidence: Option<String>,
    pub content: Option<String>,
    pub count: Option<u32>,
    #[serde(default)]
    pub subtasks: Vec<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub auto_work: Option<bool>,
    pub autonomous: Option<bool>,
    pub concurrency: Option<f64>,
    pub model: Option<String>,
    pub cascade: Option<bool>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub paths: Vec<String>,
    pub name: Option<String>,
    pub spec: Option<String>,
    pub notes: Option<String>,
    pub to: Option<String>,
    pub message: Option<String>,
    pub reply_to: Option<String>,
    pub reason: Option<String>,
    pub auto_register_path: Option<String>,
}

/// A request that failed to parse into an action.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("unknown operation: {0}")]
    UnknownOperation(String),
    #[error("missing or invalid field: {0}")]
    Missing(&'static str),
}

impl RequestError {
    /// Wire error code for this failure.
    pub fn code(&self) -> String {
        match self {
            RequestError::UnknownAction(_) => "unknown_action".to_string(),
            RequestError::UnknownOperation(_) => "unknown_operation".to_string(),
            RequestError::Missing(field) => format!("missing_{field}"),
        }
    }
}

/// One operation, fields resolved and typed.
#[derive(Debug, Clone, PartialEq)]
pub enum CrewAction {
    // pre-registration
    Join { name: Option<String> },
    AddAutoRegisterPath { path: String },

    // task group
    TaskCreate { title: String, description: Option<String>, depends_on: Vec<String> },
    TaskStart { id: TaskId },
    TaskDone { id: TaskId, summary: String, evidence: Option<String> },
    TaskBlock { id: TaskId, reason: String },
    TaskUnblock { id: TaskId },
    TaskReset { id: TaskId, cascade: bool },
    TaskDelete { id: TaskId },
    TaskSplit { id: TaskId, subtasks: Vec<String> },
    TaskRevise { id: TaskId, prompt: Option<String> },
    TaskReviseTree { id: TaskId, prompt: Option<String> },
    TaskSpec { id: TaskId, content: Option<String> },
    TaskList,
    TaskShow { id: TaskId },

    // plan / work
    Plan { prd: Option<String>, prompt: Option<String>, auto_work: Option<bool> },
    PlanCancel,
    Work { autonomous: bool, concurrency: Option<f64>, model: Option<String> },
    Review { id: TaskId },
    Sync,

    // crew group
    CrewStatus,
    CrewAdd { count: u32 },
    CrewRemove { count: u32 },
    CrewSpawn { id: TaskId },
    CrewShutdown,

    // bare coordination verbs
    Status,
    List,
    Whois { name: String },
    SetStatus { message: String },
    Feed { limit: usize },
    Spec { spec: Option<String> },
    Send { to: String, message: String, reply_to: Option<String> },
    Broadcast { message: String },
    Reserve { paths: Vec<String>, reason: Option<String> },
    Release { paths: Option<Vec<String>> },
    CheckConflict { path: String },
    CheckMail,
    Rename { name: String },
    Swarm { count: u32, prompt: Option<String> },
    Claim { id: TaskId },
    Unclaim { id: TaskId },
    Complete { id: TaskId, summary: String, evidence: Option<String> },
}

impl CrewAction {
    /// Actions allowed before registration.
    pub fn allowed_unregistered(&self) -> bool {
        matches!(self, CrewAction::Join { .. } | CrewAction::AddAutoRegisterPath { .. })
    }
}

fn task_id(request: &ActionRequest) -> Result<TaskId, RequestError> {
    let raw = request
        .task_id
        .as_deref()
        .or(request.id.as_deref())
        .or(request.target.as_deref())
        .ok_or(RequestError::Missing("id"))?;
    raw.parse().map_err(|_| RequestError::Missing("id"))
}

fn required<'r>(
    value: &'r Option<String>,
    field: &'static str,
) -> Result<&'r str, RequestError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(RequestError::Missing(field))
}

/// Parse the dotted action string plus fields into a typed action.
pub fn parse_action(request: &ActionRequest) -> Result<CrewAction, RequestError> {
    let action = request.action.trim();
    if action.is_empty() {
        return Err(RequestError::Missing("operation"));
    }
    let (group, op) = match action.split_once('.') {
        Some((group, op)) => (group, Some(op)),
        None => (action, None),
    };

    match (group, op) {
        ("join", None) => Ok(CrewAction::Join { name: request.name.clone() }),
        ("config", Some("add_auto_register_path")) => Ok(CrewAction::AddAutoRegisterPath {
            path: required(&request.auto_register_path, "value")?.to_string(),
        }),

        ("task", Some(op)) => parse_task_op(op, request),

        ("plan", None) => Ok(CrewAction::Plan {
            prd: request.prd.clone(),
            prompt: request.prompt.clone(),
            auto_work: request.auto_work,
        }),
        ("plan", Some("cancel")) => Ok(CrewAction::PlanCancel),
        ("work", None) => Ok(CrewAction::Work {
            autonomous: request.autonomous.unwrap_or(false),
            concurrency: request.concurrency,
            model: request.model.clone(),
        }),
        ("review", None) => Ok(CrewAction::Review { id: task_id(request)? }),
        ("sync", None) => Ok(CrewAction::Sync),

        ("crew", Some("status")) => Ok(CrewAction::CrewStatus),
        ("crew", Some("add")) => Ok(CrewAction::CrewAdd { count: request.count.unwrap_or(1) }),
        ("crew", Some("remove")) => {
            Ok(CrewAction::CrewRemove { count: request.count.unwrap_or(1) })
        }
        ("crew", Some("spawn")) => Ok(CrewAction::CrewSpawn { id: task_id(request)? }),
        ("crew", Some("shutdown")) => Ok(CrewAction::CrewShutdown),
        ("crew", Some(other)) => Err(RequestError::UnknownOperation(format!("crew.{other}"))),

        ("status", None) => Ok(CrewAction::Status),
        ("list", None) => Ok(CrewAction::List),
        ("whois", None) => {
            Ok(CrewAction::Whois { name: required(&request.name, "name")?.to_string() })
        }
        ("set_status", None) => Ok(CrewAction::SetStatus {
            message: required(&request.message, "message")?.to_string(),
        }),
        ("feed", None) => Ok(CrewAction::Feed { limit: request.limit.unwrap_or(20) }),
        ("spec", None) => Ok(CrewAction::Spec { spec: request.spec.clone() }),
        ("send", None) => Ok(CrewAction::Send {
            to: required(&request.to, "name")?.to_string(),
            message: required(&request.message, "message")?.to_string(),
            reply_to: request.reply_to.clone(),
        }),
        ("broadcast", None) => Ok(CrewAction::Broadcast {
            message: required(&request.message, "message")?.to_string(),
        }),
        ("reserve", None) => {
            if request.paths.is_empty() {
                return Err(RequestError::Missing("paths"));
            }
            Ok(CrewAction::Reserve { paths: request.paths.clone(), reason: request.reason.clone() })
        }
        ("release", None) => Ok(CrewAction::Release {
            paths: (!request.paths.is_empty()).then(|| request.paths.clone()),
        }),
        ("check_conflict", None) => {
            let path = request
                .target
                .clone()
                .or_else(|| request.paths.first().cloned())
                .filter(|p| !p.trim().is_empty())
                .ok_or(RequestError::Missing("paths"))?;
            Ok(CrewAction::CheckConflict { path })
        }
        ("check_mail", None) => Ok(CrewAction::CheckMail),
        ("rename", None) => {
            Ok(CrewAction::Rename { name: required(&request.name, "name")?.to_string() })
        }
        ("swarm", None) => Ok(CrewAction::Swarm {
            count: request.count.unwrap_or(2),
            prompt: request.prompt.clone(),
        }),
        ("claim", None) => Ok(CrewAction::Claim { id: task_id(request)? }),
        ("unclaim", None) => Ok(CrewAction::Unclaim { id: task_id(request)? }),
        ("complete", None) => Ok(CrewAction::Complete {
            id: task_id(request)?,
            summary: required(&request.summary, "value")?.to_string(),
            evidence: request.evidence.clone(),
        }),

        _ => Err(RequestError::UnknownAction(action.to_string())),
    }
}

fn parse_task_op(op: &str, request: &ActionRequest) -> Result<CrewAction, RequestError> {
    match op {
        "create" => Ok(CrewAction::TaskCreate {
            title: required(&request.title, "title")?.to_string(),
            description: request.content.clone().or_else(|| request.spec.clone()),
            depends_on: request.depends_on.clone(),
        }),
        "start" => Ok(CrewAction::TaskStart { id: task_id(request)? }),
        "done" => Ok(CrewAction::TaskDone {
            id: task_id(request)?,
            summary: required(&request.summary, "value")?.to_string(),
            evidence: request.evidence.clone(),
        }),
        "block" => Ok(CrewAction::TaskBlock {
            id: task_id(request)?,
            reason: required(&request.reason, "reason")?.to_string(),
        }),
        "unblock" => Ok(CrewAction::TaskUnblock { id: task_id(request)? }),
        "reset" => Ok(CrewAction::TaskReset {
            id: task_id(request)?,
            cascade: request.cascade.unwrap_or(false),
        }),
        "delete" => Ok(CrewAction::TaskDelete { id: task_id(request)? }),
        "split" => Ok(CrewAction::TaskSplit {
            id: task_id(request)?,
            subtasks: request.subtasks.clone(),
        }),
        "revise" => Ok(CrewAction::TaskRevise {
            id: task_id(request)?,
            prompt: request.prompt.clone(),
        }),
        "revise-tree" => Ok(CrewAction::TaskReviseTree {
            id: task_id(request)?,
            prompt: request.prompt.clone(),
        }),
        "spec" => Ok(CrewAction::TaskSpec {
            id: task_id(request)?,
            content: request.content.clone(),
        }),
        "list" => Ok(CrewAction::TaskList),
        "show" => Ok(CrewAction::TaskShow { id: task_id(request)? }),
        other => Err(RequestError::UnknownOperation(format!("task.{other}"))),
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;

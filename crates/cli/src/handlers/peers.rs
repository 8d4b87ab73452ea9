// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mesh coordination handlers: registration, messaging, reservations.

use crate::context::Session;
use crate::response::ActionResponse;
use pim_core::{auto_register_matches, AgentRegistration, Clock, FeedEvent, FeedEventKind};
use pim_runner::AgentSpawner;

fn feed_simple<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    kind: FeedEventKind,
    preview: Option<&str>,
) {
    let mut event = FeedEvent::new(
        session.engine.store.clock().epoch_ms(),
        session.agent_name(),
        kind,
    );
    event.preview = preview.map(str::to_string);
    let _ = session.engine.feed.append(&event);
}

/// Register on the mesh under a themed (or requested) name.
pub fn join<S: AgentSpawner, C: Clock + 'static>(
    session: &mut Session<S, C>,
    requested: Option<String>,
) -> ActionResponse {
    if let Some(name) = &session.registered {
        return ActionResponse::ok("join", format!("already registered as {name}"));
    }
    let taken = session.engine.registry.taken_names();
    let name = match requested {
        Some(name) if !name.trim().is_empty() => {
            if taken.contains(name.trim()) {
                return ActionResponse::error("join", "missing_name", format!("name taken: {name}"));
            }
            name.trim().to_string()
        }
        _ => pim_mesh::names::generate(&session.messenger, &taken),
    };

    let now = session.engine.store.clock().epoch_ms();
    let registration = AgentRegistration::new(
        name.as_str(),
        std::process::id(),
        session.session_id.as_str(),
        session.engine.store.paths().root(),
        now,
    );
    if let Err(error) = session.engine.registry.register(&registration) {
        return ActionResponse::error("join", "handler_error", error.to_string());
    }
    session.registered = Some(name.clone());
    session.engine.agent_name = name.clone();
    feed_simple(session, FeedEventKind::Join, None);
    ActionResponse::ok("join", format!("registered as {name}")).with("name", name)
}

/// Record an auto-register pattern in the user config.
pub fn add_auto_register_path<S: AgentSpawner, C: Clock + 'static>(
    session: &mut Session<S, C>,
    path: &str,
) -> ActionResponse {
    let Some(home) = dirs::home_dir() else {
        return ActionResponse::error("config", "handler_error", "no home directory");
    };
    let config_path = home.join(".pi/pi-messenger.json");
    let mut value: serde_json::Value =
        pim_store::read_json(&config_path).unwrap_or_else(|| serde_json::json!({}));
    let paths = value
        .as_object_mut()
        .map(|o| o.entry("autoRegisterPaths").or_insert_with(|| serde_json::json!([])));
    if let Some(serde_json::Value::Array(list)) = paths {
        if !list.iter().any(|p| p.as_str() == Some(path)) {
            list.push(serde_json::Value::String(path.to_string()));
        }
    }
    if let Err(error) = pim_store::write_json_atomic(&config_path, &value) {
        return ActionResponse::error("config", "handler_error", error.to_string());
    }
    session.messenger.auto_register_paths.push(path.to_string());
    let matches_here = auto_register_matches(
        &session.engine.store.paths().root().to_string_lossy(),
        path,
    );
    ActionResponse::ok("config", format!("auto-register pattern added: {path}"))
        .with("matchesCurrentProject", matches_here)
}

pub fn status<S: AgentSpawner, C: Clock + 'static>(session: &Session<S, C>) -> ActionResponse {
    let name = session.agent_name();
    let registration = session.engine.registry.load(name);
    let mut text = format!("you are {name}");
    if let Some(registration) = &registration {
        if let Some(message) = &registration.status_message {
            text.push_str(&format!(" — {message}"));
        }
        text.push_str(&format!("\nreservations: {}", registration.reservations.len()));
    }
    let unread = session.engine.inbox.pending(name);
    if unread > 0 {
        text.push_str(&format!("\n{unread} unread message(s) — run check_mail to read them"));
    }
    if let Some(state) = session.engine.coordinator.autonomous_state() {
        if state.active {
            text.push_str(&format!("\nautonomous wave {}", state.wave_number));
        }
    }
    ActionResponse::ok("status", text).with("unread", unread)
}

pub fn list<S: AgentSpawner, C: Clock + 'static>(session: &Session<S, C>) -> ActionResponse {
    let scope = session
        .messenger
        .scope_to_folder
        .then(|| session.engine.store.paths().root().to_path_buf());
    let peers = session.engine.registry.active_peers(scope.as_deref());
    if peers.is_empty() {
        return ActionResponse::ok("list", "no active peers");
    }
    let lines: Vec<String> = peers
        .iter()
        .map(|peer| {
            let role = if peer.is_human { "human" } else { "agent" };
            let activity = peer.activity.current_activity.as_deref().unwrap_or("idle");
            format!("{} ({role}) — {activity}", peer.name)
        })
        .collect();
    ActionResponse::ok("list", lines.join("\n")).with("count", peers.len())
}

pub fn whois<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    name: &str,
) -> ActionResponse {
    let Some(peer) = session.engine.registry.load(name) else {
        return ActionResponse::error("whois", "missing_name", format!("no such peer: {name}"));
    };
    let mut text = format!(
        "{} — pid {}, cwd {}",
        peer.name,
        peer.pid,
        peer.cwd.display()
    );
    if let Some(branch) = &peer.git_branch {
        text.push_str(&format!(", branch {branch}"));
    }
    if let Some(message) = &peer.status_message {
        text.push_str(&format!("\nstatus: {message}"));
    }
    for reservation in &peer.reservations {
        text.push_str(&format!("\nreserved: {}", reservation.path));
    }
    ActionResponse::ok("whois", text)
}

pub fn set_status<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    message: &str,
) -> ActionResponse {
    let name = session.agent_name();
    match session.engine.registry.update(name, |r| {
        r.status_message = Some(message.to_string());
        r.activity.last_activity_at = session.engine.store.clock().epoch_ms();
    }) {
        Ok(_) => ActionResponse::ok("set_status", format!("status set: {message}")),
        Err(error) => ActionResponse::error("set_status", "handler_error", error.to_string()),
    }
}

pub fn feed<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    limit: usize,
) -> ActionResponse {
    let events = session.engine.feed.read(limit);
    if events.is_empty() {
        return ActionResponse::ok("feed", "feed is empty");
    }
    let lines: Vec<String> = events
        .iter()
        .map(|event| {
            let target = event.target.as_deref().unwrap_or("");
            let preview = event.preview.as_deref().unwrap_or("");
            format!("{} {} {} {}", event.agent, event.kind, target, preview)
                .trim_end()
                .to_string()
        })
        .collect();
    ActionResponse::ok("feed", lines.join("\n")).with("count", events.len())
}

/// Show or set our registration's task-spec excerpt.
pub fn spec<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    spec: Option<&str>,
) -> ActionResponse {
    let name = session.agent_name();
    match spec {
        Some(spec) => match session.engine.registry.update(name, |r| {
            r.spec = Some(spec.to_string());
        }) {
            Ok(_) => ActionResponse::ok("spec", "spec recorded"),
            Err(error) => ActionResponse::error("spec", "handler_error", error.to_string()),
        },
        None => match session.engine.registry.load(name).and_then(|r| r.spec) {
            Some(spec) => ActionResponse::ok("spec", spec),
            None => ActionResponse::ok("spec", "no spec recorded"),
        },
    }
}

pub fn send<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    to: &str,
    message: &str,
    reply_to: Option<&str>,
) -> ActionResponse {
    let now = session.engine.store.clock().epoch_ms();
    match session.engine.inbox.send_text(session.agent_name(), to, message, now, reply_to) {
        Ok(sent) => {
            feed_simple(session, FeedEventKind::Message, Some(message));
            ActionResponse::ok("send", format!("sent to {to}")).with("id", sent.id)
        }
        Err(error) => ActionResponse::error("send", "handler_error", error.to_string()),
    }
}

pub fn broadcast<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    message: &str,
) -> ActionResponse {
    let scope = session
        .messenger
        .scope_to_folder
        .then(|| session.engine.store.paths().root().to_path_buf());
    let now = session.engine.store.clock().epoch_ms();
    match session.engine.inbox.broadcast(session.agent_name(), message, now, scope.as_deref()) {
        Ok(delivered) => {
            // Worker broadcasts reach the feed even though nobody's inbox
            // gets a copy.
            feed_simple(session, FeedEventKind::Message, Some(message));
            ActionResponse::ok("broadcast", format!("delivered to {} peers", delivered.len()))
                .with("recipients", delivered)
        }
        Err(error) => ActionResponse::error("broadcast", "handler_error", error.to_string()),
    }
}

pub fn reserve<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    paths: &[String],
    reason: Option<&str>,
) -> ActionResponse {
    let name = session.agent_name();
    // Overlaps with other peers don't stop a reservation, but the caller
    // should know about them before editing.
    let overlaps: Vec<String> = paths
        .iter()
        .flat_map(|path| session.reservations.conflicts(name, path))
        .map(|conflict| format!("{} holds {}", conflict.peer, conflict.path))
        .collect();
    match session.reservations.reserve(name, paths, reason) {
        Ok(()) => {
            feed_simple(session, FeedEventKind::Reserve, Some(&paths.join(", ")));
            let mut text = format!("reserved {}", paths.join(", "));
            for overlap in &overlaps {
                text.push_str(&format!("\nnote: overlaps {overlap}"));
            }
            ActionResponse::ok("reserve", text).with("overlaps", overlaps)
        }
        Err(error) => ActionResponse::error("reserve", "handler_error", error.to_string()),
    }
}

/// Conflict probe for write-like tool calls: a non-empty result means the
/// caller must block the edit/write and surface the reason.
pub fn check_conflict<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    path: &str,
) -> ActionResponse {
    let name = session.agent_name();
    let conflicts = session.reservations.conflicts(name, path);
    let Some(first) = conflicts.first() else {
        return ActionResponse::ok("check_conflict", format!("no conflicting reservations for {path}"))
            .with("blocked", false);
    };
    let mut text = format!(
        "blocked: {} reserved {} (folder {}",
        first.peer,
        first.path,
        first.folder.display()
    );
    if let Some(branch) = &first.branch {
        text.push_str(&format!(", branch {branch}"));
    }
    if let Some(reason) = &first.reason {
        text.push_str(&format!(", reason: {reason}"));
    }
    text.push(')');
    ActionResponse::ok("check_conflict", text)
        .with("blocked", true)
        .with("peer", first.peer.clone())
        .with("path", first.path.clone())
        .with("folder", first.folder.display().to_string())
        .with("branch", first.branch.clone().unwrap_or_default())
        .with("reason", first.reason.clone().unwrap_or_default())
        .with("conflictCount", conflicts.len())
}

/// Drain our own inbox: each message is delivered here exactly once.
pub fn check_mail<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
) -> ActionResponse {
    let name = session.agent_name();
    let messages = session.engine.inbox.drain(name);
    if messages.is_empty() {
        return ActionResponse::ok("check_mail", "no new messages").with("count", 0);
    }
    let lines: Vec<String> = messages
        .iter()
        .map(|message| format!("[{}] {}", message.from, message.text))
        .collect();
    let senders: Vec<String> = messages.iter().map(|m| m.from.clone()).collect();
    ActionResponse::ok("check_mail", lines.join("\n"))
        .with("count", messages.len())
        .with("from", senders)
}

pub fn release<S: AgentSpawner, C: Clock + 'static>(
    session: &Session<S, C>,
    paths: Option<Vec<String>>,
) -> ActionResponse {
    let name = session.agent_name();
    match session.reservations.release(name, paths.as_deref()) {
        Ok(released) => {
            feed_simple(session, FeedEventKind::Release, Some(&released.join(", ")));
            ActionResponse::ok("release", format!("released {}", released.len()))
                .with("released", released)
        }
        Err(error) => ActionResponse::error("release", "handler_error", error.to_string()),
    }
}

pub fn rename<S: AgentSpawner, C: Clock + 'static>(
    session: &mut Session<S, C>,
    new_name: &str,
) -> ActionResponse {
    let old = session.agent_name().to_string();
    match session.engine.registry.rename(&old, new_name) {
        Ok(_) => {
            session.registered = Some(new_name.to_string());
            session.engine.agent_name = new_name.to_string();
            ActionResponse::ok("rename", format!("{old} is now {new_name}"))
        }
        Err(error) => ActionResponse::error("rename", "missing_name", error.to_string()),
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messenger configuration.
//!
//! Layered precedence, highest first: project `.pi/pi-messenger.json`, user
//! `pi-messenger.json`, user `settings.json["messenger"]`, compiled defaults.
//! Resolution starts from [`MessengerConfig::default`] and applies overlays
//! lowest-precedence first, so later layers overwrite earlier ones.

use serde::{Deserialize, Serialize};

/// How much mesh context is injected into agent prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextMode {
    Full,
    Minimal,
    None,
}

crate::simple_display! {
    ContextMode {
        Full => "full",
        Minimal => "minimal",
        None => "none",
    }
}

/// Custom word lists for themed name generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameWords {
    #[serde(default)]
    pub adjectives: Vec<String>,
    #[serde(default)]
    pub nouns: Vec<String>,
}

/// Resolved messenger configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessengerConfig {
    pub auto_register: bool,
    pub auto_register_paths: Vec<String>,
    pub scope_to_folder: bool,
    pub name_theme: String,
    pub name_words: NameWords,
    pub context_mode: ContextMode,
    pub registration_context: bool,
    pub reply_hint: bool,
    pub sender_details_on_first_contact: bool,
    /// Feed events kept by pruning
    pub feed_retention: u32,
    /// Seconds of silence before a peer holding work counts as stuck
    pub stuck_threshold: u64,
    pub stuck_notify: bool,
    pub auto_status: bool,
    pub auto_overlay: bool,
    pub auto_overlay_planning: bool,
    pub crew_events_in_feed: bool,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            auto_register: false,
            auto_register_paths: Vec::new(),
            scope_to_folder: true,
            name_theme: "animals".to_string(),
            name_words: NameWords::default(),
            context_mode: ContextMode::Full,
            registration_context: true,
            reply_hint: true,
            sender_details_on_first_contact: true,
            feed_retention: 500,
            stuck_threshold: 300,
            stuck_notify: true,
            auto_status: true,
            auto_overlay: true,
            auto_overlay_planning: true,
            crew_events_in_feed: true,
        }
    }
}

/// One configuration layer: every field optional, absent means "inherit".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessengerOverlay {
    pub auto_register: Option<bool>,
    pub auto_register_paths: Option<Vec<String>>,
    pub scope_to_folder: Option<bool>,
    pub name_theme: Option<String>,
    pub name_words: Option<NameWords>,
    pub context_mode: Option<ContextMode>,
    pub registration_context: Option<bool>,
    pub reply_hint: Option<bool>,
    pub sender_details_on_first_contact: Option<bool>,
    pub feed_retention: Option<u32>,
    pub stuck_threshold: Option<u64>,
    pub stuck_notify: Option<bool>,
    pub auto_status: Option<bool>,
    pub auto_overlay: Option<bool>,
    pub auto_overlay_planning: Option<bool>,
    pub crew_events_in_feed: Option<bool>,
}

impl MessengerConfig {
    /// Apply one overlay on top of this config.
    pub fn apply(&mut self, overlay: MessengerOverlay) {
        macro_rules! take {
            ($($field:ident),+ $(,)?) => {
                $( if let Some(v) = overlay.$field { self.$field = v; } )+
            };
        }
        take!(
            auto_register,
            auto_register_paths,
            scope_to_folder,
            name_theme,
            name_words,
            context_mode,
            registration_context,
            reply_hint,
            sender_details_on_first_contact,
            feed_retention,
            stuck_threshold,
            stuck_notify,
            auto_status,
            auto_overlay,
            auto_overlay_planning,
            crew_events_in_feed,
        );
    }

    /// Resolve from overlays ordered lowest precedence first.
    pub fn resolve(overlays: impl IntoIterator<Item = MessengerOverlay>) -> Self {
        let mut config = Self::default();
        for overlay in overlays {
            config.apply(overlay);
        }
        config
    }
}

/// Match a path against an auto-register pattern.
///
/// A trailing `/*` matches the directory itself and anything below it; a
/// trailing `*` is a plain prefix match; anything else is an exact match.
pub fn auto_register_matches(path: &str, pattern: &str) -> bool {
    if let Some(base) = pattern.strip_suffix("/*") {
        path == base || path.strip_prefix(base).is_some_and(|rest| rest.starts_with('/'))
    } else if let Some(prefix) = pattern.strip_suffix('*') {
        path.starts_with(prefix)
    } else {
        path == pattern
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

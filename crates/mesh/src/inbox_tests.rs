// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pim_core::RegistrationBuilder;
use pim_store::BasePaths;

fn mesh(dir: &tempfile::TempDir) -> (Registry, Inbox) {
    let registry = Registry::new(BasePaths::new(dir.path().to_path_buf()));
    (registry.clone(), Inbox::new(registry))
}

fn join(registry: &Registry, name: &str) {
    let registration = RegistrationBuilder::default().name(name).pid(std::process::id()).build();
    registry.register(&registration).unwrap();
}

#[test]
fn send_writes_one_file_per_message() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, inbox) = mesh(&dir);
    join(&registry, "amber-owl");

    inbox.send_text("fox", "amber-owl", "hello", 100, None).unwrap();
    inbox.send_text("fox", "amber-owl", "again", 101, None).unwrap();

    let files: Vec<_> = std::fs::read_dir(registry.base().inbox_dir("amber-owl"))
        .unwrap()
        .flatten()
        .collect();
    assert_eq!(files.len(), 2);
}

#[test]
fn drain_returns_messages_in_filename_order_and_deletes() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, inbox) = mesh(&dir);
    join(&registry, "amber-owl");

    inbox.send_text("fox", "amber-owl", "first", 100, None).unwrap();
    inbox.send_text("fox", "amber-owl", "second", 200, None).unwrap();

    let messages = inbox.drain("amber-owl");
    assert_eq!(messages.iter().map(|m| m.text.as_str()).collect::<Vec<_>>(), vec!["first", "second"]);
    assert!(inbox.drain("amber-owl").is_empty());
}

#[test]
fn broadcast_reaches_every_scoped_peer_except_sender() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, inbox) = mesh(&dir);
    join(&registry, "sender");
    join(&registry, "peer-a");
    join(&registry, "peer-b");

    let delivered = inbox.broadcast("sender", "team: shipping now", 100, None).unwrap();
    assert_eq!(delivered, vec!["peer-a", "peer-b"]);
    assert!(inbox.drain("sender").is_empty());
    assert_eq!(inbox.drain("peer-a").len(), 1);
}

#[test]
#[serial_test::serial]
fn worker_broadcast_delivers_to_nobody() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, inbox) = mesh(&dir);
    join(&registry, "sender");
    join(&registry, "peer-a");

    std::env::set_var(CREW_WORKER_ENV, "1");
    let delivered = inbox.broadcast("sender", "worker chatter", 100, None).unwrap();
    std::env::remove_var(CREW_WORKER_ENV);

    assert!(delivered.is_empty());
    assert!(inbox.drain("peer-a").is_empty());
}

#[test]
fn pending_counts_without_consuming() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, inbox) = mesh(&dir);
    join(&registry, "amber-owl");
    assert_eq!(inbox.pending("amber-owl"), 0);

    inbox.send_text("fox", "amber-owl", "one", 100, None).unwrap();
    inbox.send_text("fox", "amber-owl", "two", 101, None).unwrap();
    assert_eq!(inbox.pending("amber-owl"), 2);
    // still there afterwards
    assert_eq!(inbox.pending("amber-owl"), 2);
    assert_eq!(inbox.drain("amber-owl").len(), 2);
    assert_eq!(inbox.pending("amber-owl"), 0);
}

#[test]
fn drain_skips_malformed_files_but_removes_them() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, inbox) = mesh(&dir);
    join(&registry, "amber-owl");
    let stray = registry.base().inbox_dir("amber-owl").join("0-bad.json");
    std::fs::write(&stray, b"{nope").unwrap();

    assert!(inbox.drain("amber-owl").is_empty());
    assert!(!stray.exists());
}

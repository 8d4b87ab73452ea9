// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pim_store::write_json_atomic;
use std::time::Duration;

fn message(text: &str, ts: u64) -> InboxMessage {
    InboxMessage::new("fox", "owl", text, ts)
}

async fn recv_with_timeout(rx: &mut mpsc::Receiver<InboxMessage>) -> InboxMessage {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for delivery")
        .expect("channel closed")
}

#[tokio::test(flavor = "multi_thread")]
async fn delivers_preexisting_files_on_start() {
    let dir = tempfile::tempdir().unwrap();
    let inbox = dir.path().join("inbox/owl");
    std::fs::create_dir_all(&inbox).unwrap();
    write_json_atomic(&inbox.join("100-aa.json"), &message("early", 100)).unwrap();

    let (tx, mut rx) = mpsc::channel(8);
    let _watcher = InboxWatcher::spawn(inbox.clone(), tx);
    let delivered = recv_with_timeout(&mut rx).await;
    assert_eq!(delivered.text, "early");
    // consumed file is deleted
    assert!(std::fs::read_dir(&inbox).unwrap().next().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn delivers_files_created_after_start() {
    let dir = tempfile::tempdir().unwrap();
    let inbox = dir.path().join("inbox/owl");

    let (tx, mut rx) = mpsc::channel(8);
    let _watcher = InboxWatcher::spawn(inbox.clone(), tx);
    // give the watcher a moment to arm
    tokio::time::sleep(Duration::from_millis(200)).await;

    write_json_atomic(&inbox.join("200-bb.json"), &message("fresh", 200)).unwrap();
    let delivered = recv_with_timeout(&mut rx).await;
    assert_eq!(delivered.text, "fresh");
}

#[tokio::test(flavor = "multi_thread")]
async fn unparseable_files_are_dropped_quietly() {
    let dir = tempfile::tempdir().unwrap();
    let inbox = dir.path().join("inbox/owl");
    std::fs::create_dir_all(&inbox).unwrap();
    std::fs::write(inbox.join("050-bad.json"), b"{garbage").unwrap();
    write_json_atomic(&inbox.join("100-ok.json"), &message("good", 100)).unwrap();

    let (tx, mut rx) = mpsc::channel(8);
    let _watcher = InboxWatcher::spawn(inbox.clone(), tx);
    let delivered = recv_with_timeout(&mut rx).await;
    assert_eq!(delivered.text, "good");
    assert!(!inbox.join("050-bad.json").exists());
}

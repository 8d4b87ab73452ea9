// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pim_core::{ActivityInfo, RegistrationBuilder, Reservation};

fn peer(name: &str, last_activity_ms: u64, reserved: bool) -> AgentRegistration {
    let mut registration = RegistrationBuilder::default()
        .name(name)
        .activity(ActivityInfo { last_activity_at: last_activity_ms, ..Default::default() })
        .build();
    if reserved {
        registration.reservations.push(Reservation::new("src"));
    }
    registration
}

#[test]
fn idle_peer_with_work_is_stuck() {
    let mut detector = StuckDetector::new();
    let peers = vec![peer("slow-yak", 0, true)];
    let newly = detector.check(&peers, 300, 301_000);
    assert_eq!(newly, vec!["slow-yak"]);
}

#[test]
fn idle_peer_without_work_is_not_stuck() {
    let mut detector = StuckDetector::new();
    let peers = vec![peer("idle-ibis", 0, false)];
    assert!(detector.check(&peers, 300, 1_000_000).is_empty());
}

#[test]
fn active_peer_with_work_is_not_stuck() {
    let mut detector = StuckDetector::new();
    let peers = vec![peer("busy-newt", 299_000, true)];
    assert!(detector.check(&peers, 300, 300_000).is_empty());
}

#[test]
fn notifies_once_until_condition_clears() {
    let mut detector = StuckDetector::new();
    let stuck = vec![peer("slow-yak", 0, true)];
    assert_eq!(detector.check(&stuck, 300, 400_000).len(), 1);
    // still stuck: no repeat notification
    assert!(detector.check(&stuck, 300, 500_000).is_empty());

    // recovers, then goes quiet again: flagged anew
    let recovered = vec![peer("slow-yak", 500_000, true)];
    assert!(detector.check(&recovered, 300, 510_000).is_empty());
    let stuck_again = vec![peer("slow-yak", 500_000, true)];
    assert_eq!(detector.check(&stuck_again, 300, 900_000).len(), 1);
}

#[test]
fn worker_holding_task_spec_counts_as_work() {
    let mut detector = StuckDetector::new();
    let mut registration = peer("crew-worker", 0, false);
    registration.spec = Some("task-3 spec".to_string());
    assert_eq!(detector.check(&[registration], 300, 400_000).len(), 1);
}

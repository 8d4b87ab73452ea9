// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    first   = { "task-1", 1 },
    ten     = { "task-10", 10 },
    large   = { "task-4096", 4096 },
)]
fn parses_valid_ids(s: &str, n: u64) {
    let id: TaskId = s.parse().unwrap();
    assert_eq!(id.number(), n);
    assert_eq!(id.to_string(), s);
}

#[yare::parameterized(
    empty     = { "" },
    bare      = { "task-" },
    zero      = { "task-0" },
    negative  = { "task--1" },
    word      = { "task-abc" },
    no_prefix = { "7" },
    wrong     = { "job-7" },
)]
fn rejects_invalid_ids(s: &str) {
    assert!(s.parse::<TaskId>().is_err());
}

#[test]
fn orders_numerically_not_lexically() {
    let a: TaskId = "task-2".parse().unwrap();
    let b: TaskId = "task-10".parse().unwrap();
    assert!(a < b);
}

#[test]
fn serde_roundtrip_as_string() {
    let id = TaskId::new(3);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"task-3\"");
    let back: TaskId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn message_ids_are_unique() {
    assert_ne!(message_id(), message_id());
}

#[test]
fn delivery_stem_prefixes_millis() {
    let stem = delivery_stem(1234);
    assert!(stem.starts_with("1234-"));
    assert_ne!(delivery_stem(1234), delivery_stem(1234));
}

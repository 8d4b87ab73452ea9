// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn ok_has_no_error() {
    let response = ActionResponse::ok("task.start", "started task-1");
    assert!(!response.is_error());
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["details"]["mode"], "task.start");
    assert!(json["details"].get("error").is_none());
}

#[test]
fn error_carries_code() {
    let response = ActionResponse::error("work", "no_plan", "no plan exists");
    assert!(response.is_error());
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["details"]["error"], "no_plan");
}

#[test]
fn extra_details_flatten() {
    let response = ActionResponse::ok("plan", "planned").with("taskCount", 3);
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["details"]["taskCount"], 3);
}

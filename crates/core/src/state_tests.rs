// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    idle       = { PlanningPhase::Idle, "idle" },
    read_prd   = { PlanningPhase::ReadPrd, "read-prd" },
    scan       = { PlanningPhase::ScanCode, "scan-code" },
    gap        = { PlanningPhase::GapAnalysis, "gap-analysis" },
    review     = { PlanningPhase::ReviewPass, "review-pass" },
    graph      = { PlanningPhase::BuildTaskGraph, "build-task-graph" },
    steps      = { PlanningPhase::BuildSteps, "build-steps" },
    finalizing = { PlanningPhase::Finalizing, "finalizing" },
    completed  = { PlanningPhase::Completed, "completed" },
)]
fn phase_wire_names(phase: PlanningPhase, expected: &str) {
    assert_eq!(phase.to_string(), expected);
    let json = serde_json::to_string(&phase).unwrap();
    assert_eq!(json, format!("\"{expected}\""));
}

#[yare::parameterized(
    completed = { StopReason::Completed, "completed" },
    blocked   = { StopReason::Blocked, "blocked" },
    manual    = { StopReason::Manual, "manual" },
)]
fn stop_reason_wire_names(reason: StopReason, expected: &str) {
    assert_eq!(serde_json::to_string(&reason).unwrap(), format!("\"{expected}\""));
}

#[test]
fn idle_states_are_inactive() {
    assert!(!AutonomousState::idle().active);
    let planning = PlanningState::idle();
    assert!(!planning.active);
    assert_eq!(planning.phase, PlanningPhase::Idle);
}

#[test]
fn planning_state_roundtrip() {
    let state = PlanningState {
        active: true,
        cwd: PathBuf::from("/tmp/p"),
        run_id: "run-1".to_string(),
        pass: 2,
        max_passes: 3,
        phase: PlanningPhase::GapAnalysis,
        updated_at: 99,
        pid: 1234,
    };
    let json = serde_json::to_string(&state).unwrap();
    let back: PlanningState = serde_json::from_str(&json).unwrap();
    assert_eq!(back.pass, 2);
    assert_eq!(back.phase, PlanningPhase::GapAnalysis);
    assert_eq!(back.pid, 1234);
}

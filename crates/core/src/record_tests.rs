// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::state_fixture;

#[test]
fn round_trip_preserves_unknown_fields() {
    let json = r#"{
        "version": "1.0",
        "projectPath": "/tmp/proj",
        "projectName": "proj",
        "target": "app",
        "targetType": "executable",
        "process": {
            "pid": 100,
            "hostname": "mk",
            "platform": "linux",
            "startTime": 1000,
            "lastHeartbeat": 2000,
            "active": true
        },
        "lastBuild": { "status": "idle", "timestamp": 0 },
        "buildHistory": { "buildCount": 0, "successCount": 0, "failureCount": 0 },
        "futureField": { "nested": [1, 2, 3] }
    }"#;

    let state: TargetState = serde_json::from_str(json).unwrap();
    assert_eq!(state.extra.get("futureField").unwrap()["nested"][2], 3);

    let reserialized = serde_json::to_value(&state).unwrap();
    assert_eq!(reserialized["futureField"]["nested"][1], 2);

    let reparsed: TargetState = serde_json::from_value(reserialized).unwrap();
    assert_eq!(reparsed, state);
}

#[test]
fn state_keys_are_camel_case() {
    let state = state_fixture("app");
    let value = serde_json::to_value(&state).unwrap();
    let obj = value.as_object().unwrap();
    for key in [
        "version",
        "projectPath",
        "projectName",
        "target",
        "targetType",
        "process",
        "lastBuild",
        "buildHistory",
    ] {
        assert!(obj.contains_key(key), "missing key {key}");
    }
    assert!(obj["process"].as_object().unwrap().contains_key("lastHeartbeat"));
}

#[test]
fn apply_build_counts_starts_once() {
    let mut state = state_fixture("app");

    state.apply_build(BuildRecord {
        status: BuildStatus::Building,
        timestamp: 10,
        ..Default::default()
    });
    assert_eq!(state.build_history.build_count, 1);
    assert!(state.claims_building());

    state.apply_build(BuildRecord {
        status: BuildStatus::Success,
        timestamp: 10,
        duration_ms: Some(40),
        exit_code: Some(0),
        ..Default::default()
    });
    assert_eq!(state.build_history.build_count, 1);
    assert_eq!(state.build_history.success_count, 1);
    assert!(!state.claims_building());
    assert_eq!(
        state.build_history.last_build.as_ref().unwrap().status,
        BuildStatus::Success
    );
}

#[test]
fn apply_build_without_building_phase_still_counts() {
    let mut state = state_fixture("app");
    state.apply_build(BuildRecord {
        status: BuildStatus::Failure,
        timestamp: 10,
        exit_code: Some(2),
        ..Default::default()
    });
    assert_eq!(state.build_history.build_count, 1);
    assert_eq!(state.build_history.failure_count, 1);
}

#[test]
fn success_clears_error_context() {
    let mut state = state_fixture("app");
    state.last_build_error = Some(BuildErrorContext {
        exit_code: 1,
        command: "make".to_string(),
        stdout_tail: vec![],
        stderr_tail: vec!["boom".to_string()],
        timestamp: 5,
    });

    state.apply_build(BuildRecord {
        status: BuildStatus::Success,
        timestamp: 10,
        ..Default::default()
    });
    assert!(state.last_build_error.is_none());
}

#[test]
fn success_rate_defaults_to_one() {
    let history = BuildHistory::default();
    assert_eq!(history.success_rate(), 1.0);

    let history = BuildHistory {
        build_count: 4,
        success_count: 3,
        failure_count: 1,
        last_build: None,
    };
    assert_eq!(history.success_rate(), 0.75);
}

#[test]
fn heartbeat_freshness_window() {
    let process = ProcessInfo {
        pid: 1,
        hostname: "mk".to_string(),
        platform: "linux".to_string(),
        start_time: 0,
        last_heartbeat: 10_000,
        active: true,
    };
    assert!(process.heartbeat_fresh(35_000, HEARTBEAT_STALENESS_MS));
    assert!(!process.heartbeat_fresh(45_000, HEARTBEAT_STALENESS_MS));
    // Clock skew: heartbeat in the future reads as age zero
    assert_eq!(process.heartbeat_age_ms(5_000), 0);
}

#[test]
fn build_status_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&BuildStatus::Building).unwrap(), "\"building\"");
    assert_eq!(BuildStatus::Failure.to_string(), "failure");
    assert!(BuildStatus::Success.is_terminal());
    assert!(!BuildStatus::Building.is_terminal());
}

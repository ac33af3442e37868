// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use polter_core::test_support::{state_fixture, target_fixture};
use polter_core::{BuildRecord, BuildStatus};

fn built_state(timestamp: u64, git_hash: Option<&str>) -> TargetState {
    let mut state = state_fixture("app");
    state.apply_build(BuildRecord {
        status: BuildStatus::Success,
        timestamp,
        duration_ms: Some(100),
        exit_code: Some(0),
        git_hash: git_hash.map(|h| h.to_string()),
        ..Default::default()
    });
    state
}

#[test]
fn matching_everything_is_fresh() {
    let state = built_state(10_000, Some("abc123"));
    let inputs = FreshnessInputs {
        binary_mtime_ms: Some(11_000),
        current_revision: Some("abc123".to_string()),
        watch_paths_dirty: Some(false),
    };
    assert_eq!(evaluate(&state, &inputs), Freshness::Fresh);
}

#[test]
fn older_binary_is_stale() {
    let state = built_state(10_000, None);
    let inputs = FreshnessInputs {
        binary_mtime_ms: Some(5_000),
        current_revision: None,
        watch_paths_dirty: None,
    };
    assert_eq!(
        evaluate(&state, &inputs),
        Freshness::Stale(StaleReason::BinaryOlderThanBuild)
    );
}

#[test]
fn slightly_older_mtime_is_within_slack() {
    // Coarse filesystem mtimes round down; a sub-slack difference is fine
    let state = built_state(10_000, None);
    let inputs = FreshnessInputs {
        binary_mtime_ms: Some(9_000),
        current_revision: None,
        watch_paths_dirty: None,
    };
    assert_eq!(evaluate(&state, &inputs), Freshness::Fresh);
}

#[test]
fn revision_mismatch_is_stale() {
    let state = built_state(10_000, Some("abc123"));
    let inputs = FreshnessInputs {
        binary_mtime_ms: Some(11_000),
        current_revision: Some("def456".to_string()),
        watch_paths_dirty: Some(false),
    };
    match evaluate(&state, &inputs) {
        Freshness::Stale(StaleReason::RevisionChanged { built, current }) => {
            assert_eq!(built, "abc123");
            assert_eq!(current, "def456");
        }
        other => panic!("expected revision mismatch, got {other:?}"),
    }
}

#[test]
fn dirty_watch_paths_are_stale() {
    let state = built_state(10_000, Some("abc123"));
    let inputs = FreshnessInputs {
        binary_mtime_ms: Some(11_000),
        current_revision: Some("abc123".to_string()),
        watch_paths_dirty: Some(true),
    };
    assert_eq!(
        evaluate(&state, &inputs),
        Freshness::Stale(StaleReason::WatchPathsDirty)
    );
}

#[test]
fn unavailable_inputs_are_skipped_not_failed() {
    // No VCS, unreadable mtime: nothing left to contradict freshness
    let state = built_state(10_000, Some("abc123"));
    let inputs = FreshnessInputs {
        binary_mtime_ms: None,
        current_revision: None,
        watch_paths_dirty: None,
    };
    assert_eq!(evaluate(&state, &inputs), Freshness::Fresh);
}

#[test]
fn never_built_record_does_not_flag_mtime() {
    let state = state_fixture("app");
    let inputs = FreshnessInputs {
        binary_mtime_ms: Some(1),
        current_revision: None,
        watch_paths_dirty: None,
    };
    assert_eq!(evaluate(&state, &inputs), Freshness::Fresh);
}

#[test]
fn find_binary_prefers_declared_output() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("out")).unwrap();
    std::fs::write(dir.path().join("out/app"), "").unwrap();

    let mut target = target_fixture("app");
    target.output_path = Some("out/app".into());
    assert_eq!(
        find_binary(dir.path(), &target),
        Some(dir.path().join("out/app"))
    );

    target.output_path = Some("out/missing".into());
    assert_eq!(find_binary(dir.path(), &target), None);
}

#[test]
fn find_binary_searches_conventional_locations() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("target/release")).unwrap();
    std::fs::write(dir.path().join("target/release/app"), "").unwrap();

    let target = target_fixture("app");
    assert_eq!(
        find_binary(dir.path(), &target),
        Some(dir.path().join("target/release/app"))
    );
}

#[test]
fn find_binary_none_when_absent() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(find_binary(dir.path(), &target_fixture("app")), None);
}

#[test]
fn binary_mtime_reads_real_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bin");
    std::fs::write(&path, "x").unwrap();
    assert!(binary_mtime_ms(&path).unwrap() > 0);
    assert!(binary_mtime_ms(&dir.path().join("missing")).is_none());
}

#[test]
fn stale_reasons_render_readably() {
    assert_eq!(
        StaleReason::BinaryOlderThanBuild.to_string(),
        "binary is older than the last build"
    );
    let reason = StaleReason::RevisionChanged {
        built: "0123456789abcdef".to_string(),
        current: "fedcba9876543210".to_string(),
    };
    assert_eq!(
        reason.to_string(),
        "revision changed since the last build (01234567 -> fedcba98)"
    );
}

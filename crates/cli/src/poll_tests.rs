// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use polter_core::test_support::target_fixture;
use polter_core::BuildRecord;
use polter_state::write_json_atomic;
use std::path::Path;
use tempfile::TempDir;

fn store_in(dir: &TempDir) -> StateStore {
    StateStore::open_at(dir.path().to_path_buf(), Path::new("/home/me/demo"), None).unwrap()
}

#[tokio::test]
async fn missing_record_reports_no_state() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let outcome = wait_for_build(&store, "ghost", Duration::from_millis(100)).await;
    assert_eq!(outcome, WaitOutcome::NoState);
}

#[tokio::test]
async fn terminal_status_returns_immediately() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.init(&target_fixture("app")).unwrap();
    store
        .update_build_status(
            "app",
            BuildRecord {
                status: BuildStatus::Success,
                timestamp: 1,
                ..Default::default()
            },
        )
        .unwrap();

    let outcome = wait_for_build(&store, "app", Duration::from_secs(5)).await;
    assert_eq!(outcome, WaitOutcome::Finished(BuildStatus::Success));
}

#[tokio::test]
async fn dead_owner_building_claim_does_not_block() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let mut state = store.init(&target_fixture("app")).unwrap();
    state.last_build.status = BuildStatus::Building;
    state.process.pid = 999_999_999;
    write_json_atomic(&store.project_paths().state_file("app"), &state).unwrap();

    let started = Instant::now();
    let outcome = wait_for_build(&store, "app", Duration::from_secs(30)).await;
    assert_eq!(outcome, WaitOutcome::Finished(BuildStatus::Building));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn live_build_blocks_until_completion() {
    let dir = TempDir::new().unwrap();
    let store = std::sync::Arc::new(store_in(&dir));
    store.init(&target_fixture("app")).unwrap();
    store
        .update_build_status(
            "app",
            BuildRecord {
                status: BuildStatus::Building,
                timestamp: 1,
                ..Default::default()
            },
        )
        .unwrap();

    let finisher = {
        let store = std::sync::Arc::clone(&store);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            store
                .update_build_status(
                    "app",
                    BuildRecord {
                        status: BuildStatus::Failure,
                        timestamp: 2,
                        exit_code: Some(1),
                        ..Default::default()
                    },
                )
                .unwrap();
        })
    };

    let outcome = wait_for_build(&store, "app", Duration::from_secs(10)).await;
    assert_eq!(outcome, WaitOutcome::Finished(BuildStatus::Failure));
    finisher.await.unwrap();
}

#[tokio::test]
async fn timeout_while_live_owner_builds() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.init(&target_fixture("app")).unwrap();
    store
        .update_build_status(
            "app",
            BuildRecord {
                status: BuildStatus::Building,
                timestamp: 1,
                ..Default::default()
            },
        )
        .unwrap();

    // Owner (this process) is live, so the wait genuinely times out
    let outcome = wait_for_build(&store, "app", Duration::from_millis(200)).await;
    assert_eq!(outcome, WaitOutcome::TimedOut);
}

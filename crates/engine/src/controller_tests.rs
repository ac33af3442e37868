// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use polter_core::test_support::target_fixture;

fn controller() -> TargetController {
    TargetController::new(target_fixture("app"), PriorityConfig::default())
}

fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

#[test]
fn changes_arm_settling_timer() {
    let mut ctrl = controller();
    let now = Instant::now();

    ctrl.on_changes(paths(&["src/a.ts"]), ChangeType::Direct, now);
    assert_eq!(ctrl.settle_deadline(), Some(now + Duration::from_millis(100)));

    // A later change re-arms the timer
    let later = now + Duration::from_millis(60);
    ctrl.on_changes(paths(&["src/b.ts"]), ChangeType::Direct, later);
    assert_eq!(ctrl.settle_deadline(), Some(later + Duration::from_millis(100)));
}

#[test]
fn settle_queues_and_dispatch_drains_in_order() {
    let mut ctrl = controller();
    let now = Instant::now();

    ctrl.on_changes(paths(&["src/b.ts", "src/a.ts", "src/b.ts"]), ChangeType::Direct, now);
    assert!(ctrl.on_settle_due(now + Duration::from_millis(100)));
    assert!(ctrl.is_queued());

    let (files, attempt) = ctrl.start_build();
    assert_eq!(files, paths(&["src/b.ts", "src/a.ts"]));
    assert_eq!(attempt, 0);
    assert!(ctrl.is_running());
    assert_eq!(ctrl.pending_len(), 0);
}

#[test]
fn settle_with_empty_pending_is_a_no_op() {
    let mut ctrl = controller();
    assert!(!ctrl.on_settle_due(Instant::now()));
    assert!(!ctrl.is_queued());
}

#[test]
fn settle_before_deadline_does_not_fire() {
    let mut ctrl = controller();
    let now = Instant::now();
    ctrl.on_changes(paths(&["src/a.ts"]), ChangeType::Direct, now);
    assert!(!ctrl.on_settle_due(now + Duration::from_millis(50)));
    assert!(ctrl.settle_deadline().is_some());
}

#[test]
fn mid_build_changes_become_one_follow_up() {
    let mut ctrl = controller();
    let now = Instant::now();

    ctrl.on_changes(paths(&["file1.ts"]), ChangeType::Direct, now);
    ctrl.on_settle_due(now + Duration::from_millis(110));
    let (files, _) = ctrl.start_build();
    assert_eq!(files, paths(&["file1.ts"]));

    // Changes land while the build runs
    ctrl.on_changes(paths(&["file2.ts"]), ChangeType::Direct, now + Duration::from_millis(200));
    ctrl.on_changes(paths(&["file3.ts"]), ChangeType::Direct, now + Duration::from_millis(300));
    assert!(ctrl.settle_deadline().is_none(), "no settle timer while running");

    let disposition = ctrl.finish_build(
        BuildStatus::Success,
        Duration::from_millis(500),
        false,
        now + Duration::from_millis(600),
    );
    assert_eq!(disposition, FinishDisposition::FollowUp);
    assert!(ctrl.is_queued());

    // The follow-up carries exactly the mid-build changes
    let (files, _) = ctrl.start_build();
    assert_eq!(files, paths(&["file2.ts", "file3.ts"]));
}

#[test]
fn quiet_build_goes_idle() {
    let mut ctrl = controller();
    let now = Instant::now();
    ctrl.on_changes(paths(&["a"]), ChangeType::Direct, now);
    ctrl.on_settle_due(now + Duration::from_millis(110));
    ctrl.start_build();

    let disposition =
        ctrl.finish_build(BuildStatus::Success, Duration::from_millis(10), false, now);
    assert_eq!(disposition, FinishDisposition::Idle);
    assert!(!ctrl.is_queued());
    assert!(!ctrl.is_running());
}

#[test]
fn failure_schedules_backoff_retries_then_gives_up() {
    let mut config = target_fixture("app");
    config.max_retries = Some(2);
    config.backoff_multiplier = Some(2.0);
    let mut ctrl = TargetController::new(config, PriorityConfig::default());
    let now = Instant::now();

    ctrl.on_changes(paths(&["a"]), ChangeType::Direct, now);
    ctrl.on_settle_due(now + Duration::from_millis(110));
    ctrl.start_build();

    // First failure: retry after 1s
    let d1 = ctrl.finish_build(BuildStatus::Failure, Duration::from_millis(10), false, now);
    assert_eq!(d1, FinishDisposition::Retry(now + Duration::from_secs(1)));

    assert!(ctrl.on_retry_due(now + Duration::from_secs(1)));
    let (_, attempt) = ctrl.start_build();
    assert_eq!(attempt, 1);

    // Second failure: retry after 2s
    let d2 = ctrl.finish_build(BuildStatus::Failure, Duration::from_millis(10), false, now);
    assert_eq!(d2, FinishDisposition::Retry(now + Duration::from_secs(2)));

    assert!(ctrl.on_retry_due(now + Duration::from_secs(2)));
    ctrl.start_build();

    // Retry budget exhausted
    let d3 = ctrl.finish_build(BuildStatus::Failure, Duration::from_millis(10), false, now);
    assert_eq!(d3, FinishDisposition::Idle);
}

#[test]
fn success_resets_the_retry_counter() {
    let mut config = target_fixture("app");
    config.max_retries = Some(1);
    let mut ctrl = TargetController::new(config, PriorityConfig::default());
    let now = Instant::now();

    ctrl.on_changes(paths(&["a"]), ChangeType::Direct, now);
    ctrl.on_settle_due(now + Duration::from_millis(110));
    ctrl.start_build();
    assert!(matches!(
        ctrl.finish_build(BuildStatus::Failure, Duration::from_millis(10), false, now),
        FinishDisposition::Retry(_)
    ));

    ctrl.on_retry_due(now + Duration::from_secs(1));
    ctrl.start_build();
    let disposition =
        ctrl.finish_build(BuildStatus::Success, Duration::from_millis(10), false, now);
    assert_eq!(disposition, FinishDisposition::Idle);

    // A fresh failure retries again from attempt zero
    ctrl.request_manual();
    ctrl.start_build();
    assert!(matches!(
        ctrl.finish_build(BuildStatus::Failure, Duration::from_millis(10), false, now),
        FinishDisposition::Retry(_)
    ));
}

#[test]
fn follow_up_waits_for_hooks() {
    let mut ctrl = controller();
    let now = Instant::now();

    ctrl.on_changes(paths(&["a"]), ChangeType::Direct, now);
    ctrl.on_settle_due(now + Duration::from_millis(110));
    ctrl.start_build();
    ctrl.on_changes(paths(&["b"]), ChangeType::Direct, now);

    let disposition =
        ctrl.finish_build(BuildStatus::Success, Duration::from_millis(10), true, now);
    assert_eq!(disposition, FinishDisposition::AwaitHooks);
    assert!(!ctrl.is_queued());

    assert!(ctrl.on_hooks_finished());
    assert!(ctrl.is_queued());
    let (files, _) = ctrl.start_build();
    assert_eq!(files, paths(&["b"]));
}

#[test]
fn manual_request_while_running_merges() {
    let mut ctrl = controller();
    let now = Instant::now();
    ctrl.request_manual();
    assert!(ctrl.is_queued());
    ctrl.start_build();

    assert!(ctrl.request_manual());
    assert!(!ctrl.is_queued(), "no second request while building");

    let disposition =
        ctrl.finish_build(BuildStatus::Success, Duration::from_millis(10), false, now);
    assert_eq!(disposition, FinishDisposition::FollowUp);
}

#[test]
fn disabled_target_rejects_manual_requests() {
    let mut config = target_fixture("app");
    config.enabled = false;
    let mut ctrl = TargetController::new(config, PriorityConfig::default());
    assert!(!ctrl.request_manual());
}

#[test]
fn deletion_free_cancel_clears_everything() {
    let mut ctrl = controller();
    let now = Instant::now();
    ctrl.on_changes(paths(&["a", "b"]), ChangeType::Direct, now);
    ctrl.cancel();
    assert_eq!(ctrl.pending_len(), 0);
    assert!(ctrl.settle_deadline().is_none());
    assert!(!ctrl.is_queued());
}

#[test]
fn changes_while_queued_merge_into_next_dispatch() {
    let mut ctrl = controller();
    let now = Instant::now();
    ctrl.on_changes(paths(&["a"]), ChangeType::Direct, now);
    ctrl.on_settle_due(now + Duration::from_millis(110));
    assert!(ctrl.is_queued());

    ctrl.on_changes(paths(&["b"]), ChangeType::Direct, now + Duration::from_millis(120));
    let (files, _) = ctrl.start_build();
    assert_eq!(files, paths(&["a", "b"]));
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-target runtime state inside the daemon.
//!
//! A controller owns the pending-change set, the settling timer, the retry
//! backoff, and the priority inputs for exactly one target. It is a pure
//! state machine: the scheduler drives it and the daemon loop supplies time.

use indexmap::IndexSet;
use polter_core::{BuildStatus, Target};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::priority::{ChangeType, PriorityConfig, TargetPriority};

/// Base delay before the first retry; grows by the target's backoff
/// multiplier per attempt.
pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// What the scheduler should do after a build finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishDisposition {
    /// Nothing pending; the target goes idle.
    Idle,
    /// Changes (or a manual request) arrived mid-build: enqueue now.
    FollowUp,
    /// A follow-up is owed, but hooks for this build must drain first.
    AwaitHooks,
    /// The build failed and a retry is scheduled.
    Retry(Instant),
}

/// Runtime state for one target.
pub struct TargetController {
    config: Target,
    pending: IndexSet<PathBuf>,
    settle_at: Option<Instant>,
    queued: bool,
    queued_attempt: u32,
    running: bool,
    follow_up: bool,
    hooks_in_flight: bool,
    retry_at: Option<Instant>,
    retry_attempt: u32,
    priority: TargetPriority,
}

impl TargetController {
    pub fn new(config: Target, priority_config: PriorityConfig) -> Self {
        Self {
            config,
            pending: IndexSet::new(),
            settle_at: None,
            queued: false,
            queued_attempt: 0,
            running: false,
            follow_up: false,
            hooks_in_flight: false,
            retry_at: None,
            retry_attempt: 0,
            priority: TargetPriority::new(priority_config),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &Target {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_queued(&self) -> bool {
        self.queued
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn priority_mut(&mut self) -> &mut TargetPriority {
        &mut self.priority
    }

    pub fn priority(&self) -> &TargetPriority {
        &self.priority
    }

    /// Fold a batch of changed files in.
    ///
    /// While idle this (re)arms the settling timer; while a build runs it
    /// sets the follow-up bit instead. While merely queued, the files join
    /// the pending set and ride along at dispatch.
    pub fn on_changes(
        &mut self,
        files: impl IntoIterator<Item = PathBuf>,
        change_type: ChangeType,
        now: Instant,
    ) {
        let mut any = false;
        for file in files {
            self.priority.record_change(change_type, 1.0, now);
            self.pending.insert(file);
            any = true;
        }
        if !any {
            return;
        }

        if self.running {
            self.follow_up = true;
        } else if !self.queued {
            self.settle_at = Some(now + self.config.settling_delay());
        }
    }

    /// Deadline of the armed settling timer, if any.
    pub fn settle_deadline(&self) -> Option<Instant> {
        self.settle_at
    }

    pub fn retry_deadline(&self) -> Option<Instant> {
        self.retry_at
    }

    /// Fire the settling timer: the target becomes queued when changes are
    /// pending. Returns whether it queued.
    pub fn on_settle_due(&mut self, now: Instant) -> bool {
        match self.settle_at {
            Some(at) if at <= now => {}
            _ => return false,
        }
        self.settle_at = None;
        if self.pending.is_empty() || self.running || self.queued {
            return false;
        }
        self.queued = true;
        self.queued_attempt = 0;
        true
    }

    /// Fire the retry timer. Returns whether a retry queued.
    pub fn on_retry_due(&mut self, now: Instant) -> bool {
        match self.retry_at {
            Some(at) if at <= now => {}
            _ => return false,
        }
        self.retry_at = None;
        if self.running || self.queued {
            return false;
        }
        self.queued = true;
        self.queued_attempt = self.retry_attempt;
        true
    }

    /// Admit a manual build request.
    ///
    /// Running targets get the follow-up bit instead of a second request.
    /// Returns true when the request queued (or merged), false when the
    /// target is disabled.
    pub fn request_manual(&mut self) -> bool {
        if !self.config.enabled {
            return false;
        }
        if self.running {
            self.follow_up = true;
        } else if !self.queued {
            self.queued = true;
            self.queued_attempt = 0;
            self.settle_at = None;
        }
        true
    }

    /// Dispatch: atomically drain the pending set and mark running.
    ///
    /// Only valid for a queued target. The returned file list is the
    /// complete set of changes delivered since the previous dispatch.
    pub fn start_build(&mut self) -> (Vec<PathBuf>, u32) {
        let files: Vec<PathBuf> = self.pending.drain(..).collect();
        let attempt = self.queued_attempt;
        self.queued = false;
        self.running = true;
        self.follow_up = false;
        self.settle_at = None;
        (files, attempt)
    }

    /// Record a finished build and decide what happens next.
    pub fn finish_build(
        &mut self,
        status: BuildStatus,
        duration: Duration,
        hooks_pending: bool,
        now: Instant,
    ) -> FinishDisposition {
        self.running = false;
        let succeeded = status == BuildStatus::Success;
        self.priority.record_build(duration, succeeded);

        if succeeded {
            // Retry counter resets on the first success
            self.retry_attempt = 0;
        }

        let owes_follow_up = self.follow_up || !self.pending.is_empty();
        if owes_follow_up {
            // New work supersedes any retry of the old failure
            self.retry_at = None;
            if hooks_pending {
                self.hooks_in_flight = true;
                return FinishDisposition::AwaitHooks;
            }
            self.follow_up = false;
            self.queued = true;
            self.queued_attempt = 0;
            return FinishDisposition::FollowUp;
        }

        if !succeeded && self.retry_attempt < self.config.max_retries() {
            let delay = RETRY_BASE_DELAY.mul_f64(
                self.config
                    .backoff_multiplier()
                    .powi(self.retry_attempt as i32),
            );
            self.retry_attempt += 1;
            let at = now + delay;
            self.retry_at = Some(at);
            if hooks_pending {
                self.hooks_in_flight = true;
            }
            return FinishDisposition::Retry(at);
        }

        if hooks_pending {
            self.hooks_in_flight = true;
            return FinishDisposition::AwaitHooks;
        }
        FinishDisposition::Idle
    }

    /// The hook runner drained for the last build; release any deferred
    /// follow-up. Returns true when a follow-up queued.
    pub fn on_hooks_finished(&mut self) -> bool {
        self.hooks_in_flight = false;
        let owes_follow_up = self.follow_up || !self.pending.is_empty();
        if owes_follow_up && !self.running && !self.queued {
            self.follow_up = false;
            self.queued = true;
            self.queued_attempt = 0;
            return true;
        }
        false
    }

    /// Abandon a dispatched build that never ran (lost ownership race).
    /// Pending files are kept so the next owner change re-triggers.
    pub fn abort_build(&mut self) {
        self.running = false;
        self.follow_up = false;
    }

    /// Drop all pending work (daemon shutdown or stop-target).
    pub fn cancel(&mut self) {
        self.pending.clear();
        self.settle_at = None;
        self.retry_at = None;
        self.queued = false;
        self.follow_up = false;
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;

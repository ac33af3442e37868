// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The build queue and dispatch coordinator.
//!
//! One scheduler per daemon. It owns every target controller, admits
//! change batches and manual requests, and hands out at most
//! `parallelization` concurrent build requests picked by priority score.
//! Everything here is synchronous; the daemon loop supplies time and
//! executes the returned requests.

use polter_core::{BuildStatus, Target};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::controller::{FinishDisposition, TargetController};
use crate::priority::{ChangeType, PriorityConfig};

/// Soft-timeout floor for targets without duration history.
pub const SOFT_TIMEOUT_FLOOR: Duration = Duration::from_secs(30);

/// A dispatched build: the caller runs it and reports completion.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub id: String,
    pub target: String,
    /// Union of all changes delivered since the previous dispatch.
    pub files: Vec<PathBuf>,
    /// 0 for regular builds, >0 for retries of a failed build.
    pub attempt: u32,
    /// Priority score at dispatch time.
    pub score: f64,
}

/// Outcome of a manual admission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualOutcome {
    /// Queued (or already queued) for dispatch.
    Queued,
    /// A build is running; the request merged into its follow-up.
    Merged,
    /// The target is disabled.
    Disabled,
    /// No such target.
    UnknownTarget,
}

struct RunningBuild {
    started_at: Instant,
    soft_deadline: Instant,
    warned: bool,
}

/// Introspection of the scheduler for status output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub running: Vec<String>,
    pub queued: Vec<QueuedEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedEntry {
    pub target: String,
    pub score: f64,
    pub pending_files: usize,
}

pub struct Scheduler {
    targets: HashMap<String, TargetController>,
    running: HashMap<String, RunningBuild>,
    parallelization: usize,
    timeout_multiplier: f64,
    priority_config: PriorityConfig,
}

impl Scheduler {
    pub fn new(parallelization: usize, timeout_multiplier: f64) -> Self {
        Self {
            targets: HashMap::new(),
            running: HashMap::new(),
            parallelization: parallelization.max(1),
            timeout_multiplier,
            priority_config: PriorityConfig::default(),
        }
    }

    pub fn with_priority_config(mut self, config: PriorityConfig) -> Self {
        self.priority_config = config;
        self
    }

    /// Register a target. Later batches for unknown targets are dropped
    /// with a warning.
    pub fn add_target(&mut self, target: Target) {
        let controller = TargetController::new(target, self.priority_config);
        self.targets.insert(controller.name().to_string(), controller);
    }

    pub fn target_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.targets.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_building(&self, target: &str) -> bool {
        self.running.contains_key(target)
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn has_work(&self) -> bool {
        !self.running.is_empty() || self.targets.values().any(|c| c.is_queued())
    }

    /// Fold a change batch for one target in.
    pub fn on_changes(
        &mut self,
        target: &str,
        files: Vec<PathBuf>,
        change_type: ChangeType,
        now: Instant,
    ) {
        let Some(controller) = self.targets.get_mut(target) else {
            warn!(target = %target, "change batch for unknown target dropped");
            return;
        };
        if !controller.config().enabled {
            return;
        }
        controller.on_changes(files, change_type, now);
    }

    /// Manual admission (IPC `Build`, runner trigger).
    pub fn request_manual(&mut self, target: &str) -> ManualOutcome {
        let Some(controller) = self.targets.get_mut(target) else {
            return ManualOutcome::UnknownTarget;
        };
        let was_running = controller.is_running();
        if !controller.request_manual() {
            return ManualOutcome::Disabled;
        }
        if was_running {
            ManualOutcome::Merged
        } else {
            ManualOutcome::Queued
        }
    }

    /// Earliest pending timer deadline (settle or retry) across targets.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.targets
            .values()
            .flat_map(|c| [c.settle_deadline(), c.retry_deadline()])
            .flatten()
            .min()
    }

    /// Fire every due timer; newly-queued targets wait for [`Self::dispatch`].
    pub fn on_tick(&mut self, now: Instant) {
        for controller in self.targets.values_mut() {
            if controller.on_settle_due(now) {
                debug!(target = controller.name(), "settling complete, queued");
            }
            if controller.on_retry_due(now) {
                debug!(target = controller.name(), "retry due, queued");
            }
        }
    }

    /// Hand out builds until the parallelism budget is spent.
    ///
    /// Queued targets are ranked by score, then direct-change frequency,
    /// then smaller average duration, then name — a deterministic order.
    pub fn dispatch(&mut self, now: Instant) -> Vec<BuildRequest> {
        let mut dispatched = Vec::new();

        while self.running.len() < self.parallelization {
            let mut ranked: Vec<(f64, usize, i64, String)> = self
                .targets
                .values_mut()
                .filter(|c| c.is_queued())
                .map(|c| {
                    let score = c.priority_mut().score(now);
                    let frequency = c.priority().direct_frequency(now);
                    let avg_ms = c
                        .priority()
                        .average_duration()
                        .map(|d| d.as_millis() as i64)
                        .unwrap_or(0);
                    (score, frequency, avg_ms, c.name().to_string())
                })
                .collect();
            if ranked.is_empty() {
                break;
            }
            ranked.sort_by(|a, b| {
                b.0.partial_cmp(&a.0)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.1.cmp(&a.1))
                    .then_with(|| a.2.cmp(&b.2))
                    .then_with(|| a.3.cmp(&b.3))
            });

            let (score, _, _, name) = ranked.remove(0);
            let controller = match self.targets.get_mut(&name) {
                Some(c) => c,
                None => break,
            };
            let (files, attempt) = controller.start_build();
            let soft_timeout = controller
                .priority()
                .average_duration()
                .map(|d| d.mul_f64(self.timeout_multiplier))
                .map(|d| d.max(SOFT_TIMEOUT_FLOOR))
                .unwrap_or(SOFT_TIMEOUT_FLOOR);

            self.running.insert(
                name.clone(),
                RunningBuild {
                    started_at: now,
                    soft_deadline: now + soft_timeout,
                    warned: false,
                },
            );

            dispatched.push(BuildRequest {
                id: Uuid::new_v4().to_string(),
                target: name,
                files,
                attempt,
                score,
            });
        }

        dispatched
    }

    /// Record a build completion. The caller follows up with
    /// [`Self::dispatch`] to fill the freed slot.
    pub fn on_build_finished(
        &mut self,
        target: &str,
        status: BuildStatus,
        duration: Duration,
        hooks_pending: bool,
        now: Instant,
    ) -> FinishDisposition {
        self.running.remove(target);
        let Some(controller) = self.targets.get_mut(target) else {
            return FinishDisposition::Idle;
        };
        controller.finish_build(status, duration, hooks_pending, now)
    }

    /// Abandon a dispatched build that never started (ownership lost to a
    /// different live daemon). Frees the slot without retry bookkeeping.
    pub fn drop_running(&mut self, target: &str) {
        self.running.remove(target);
        if let Some(controller) = self.targets.get_mut(target) {
            controller.abort_build();
        }
    }

    /// The hook runner drained for a target's last build.
    pub fn on_hooks_finished(&mut self, target: &str) -> bool {
        self.targets
            .get_mut(target)
            .map(|c| c.on_hooks_finished())
            .unwrap_or(false)
    }

    /// Running builds past their soft deadline; each is reported once.
    /// The builds keep running — the timeout is observational.
    pub fn overdue(&mut self, now: Instant) -> Vec<(String, Duration)> {
        let mut result = Vec::new();
        for (name, build) in self.running.iter_mut() {
            if !build.warned && now >= build.soft_deadline {
                build.warned = true;
                result.push((name.clone(), now.duration_since(build.started_at)));
            }
        }
        result
    }

    /// Cancel all pending work; returns the targets whose builds must be
    /// stopped by the caller.
    pub fn cancel_all(&mut self) -> Vec<String> {
        for controller in self.targets.values_mut() {
            controller.cancel();
        }
        let mut names: Vec<String> = self.running.keys().cloned().collect();
        names.sort();
        names
    }

    /// Queue introspection for status output.
    pub fn snapshot(&mut self, now: Instant) -> QueueSnapshot {
        let mut running: Vec<String> = self.running.keys().cloned().collect();
        running.sort();

        let mut queued: Vec<QueuedEntry> = Vec::new();
        let names: Vec<String> = self.targets.keys().cloned().collect();
        for name in names {
            let Some(controller) = self.targets.get_mut(&name) else {
                continue;
            };
            if controller.is_queued() {
                let score = controller.priority_mut().score(now);
                queued.push(QueuedEntry {
                    target: name,
                    score,
                    pending_files: controller.pending_len(),
                });
            }
        }
        queued.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.target.cmp(&b.target))
        });

        QueueSnapshot { running, queued }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;

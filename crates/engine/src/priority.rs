// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Priority scoring for pending builds.
//!
//! Each target keeps a short history of change events plus rolling build
//! statistics. Scores are produced on demand (at enqueue and again at every
//! dispatch decision) and never persisted.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Flat bonus scaled by the target's success rate.
const SUCCESS_RATE_BONUS: f64 = 10.0;

/// Max penalty applied to chronically slow builds.
const DURATION_PENALTY_CAP: f64 = 5.0;

/// Build duration at which the slow-build penalty saturates.
const DURATION_PENALTY_SATURATION_MS: f64 = 60_000.0;

/// How a file change relates to the target it affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    /// The change affects only this target.
    Direct,
    /// The change affects several targets (shared source).
    Shared,
    /// The change looks like build output or other derived files.
    Generated,
}

impl ChangeType {
    fn weight(&self) -> f64 {
        match self {
            ChangeType::Direct => 10.0,
            ChangeType::Shared => 5.0,
            ChangeType::Generated => 1.0,
        }
    }
}

/// Scoring knobs.
#[derive(Debug, Clone, Copy)]
pub struct PriorityConfig {
    /// Window over which change events contribute and recency decays.
    pub decay: Duration,
    /// Direct changes within this window put the target "in focus".
    pub focus_window: Duration,
    /// Score multiplier while in focus.
    pub focus_multiplier: f64,
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            decay: Duration::from_secs(300),
            focus_window: Duration::from_secs(300),
            focus_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ChangeSample {
    at: Instant,
    change_type: ChangeType,
    impact_weight: f64,
}

/// Rolling priority inputs for one target.
#[derive(Debug)]
pub struct TargetPriority {
    config: PriorityConfig,
    events: VecDeque<ChangeSample>,
    last_direct: Option<Instant>,
    total_build_ms: u64,
    builds_timed: u32,
    successes: u32,
    failures: u32,
}

impl TargetPriority {
    pub fn new(config: PriorityConfig) -> Self {
        Self {
            config,
            events: VecDeque::new(),
            last_direct: None,
            total_build_ms: 0,
            builds_timed: 0,
            successes: 0,
            failures: 0,
        }
    }

    /// Record one observed change.
    pub fn record_change(&mut self, change_type: ChangeType, impact_weight: f64, now: Instant) {
        self.prune(now);
        self.events.push_back(ChangeSample {
            at: now,
            change_type,
            impact_weight,
        });
        if change_type == ChangeType::Direct {
            self.last_direct = Some(now);
        }
    }

    /// Record a completed build for the rolling statistics.
    pub fn record_build(&mut self, duration: Duration, success: bool) {
        self.total_build_ms += duration.as_millis() as u64;
        self.builds_timed += 1;
        if success {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
    }

    /// Rolling average build duration, `None` before the first build.
    pub fn average_duration(&self) -> Option<Duration> {
        if self.builds_timed == 0 {
            None
        } else {
            Some(Duration::from_millis(
                self.total_build_ms / u64::from(self.builds_timed),
            ))
        }
    }

    /// Fraction of builds that succeeded; optimistic 1.0 before any build.
    pub fn success_rate(&self) -> f64 {
        let total = self.successes + self.failures;
        if total == 0 {
            1.0
        } else {
            f64::from(self.successes) / f64::from(total)
        }
    }

    /// Direct changes within the decay window.
    pub fn direct_frequency(&self, now: Instant) -> usize {
        self.events
            .iter()
            .filter(|e| {
                e.change_type == ChangeType::Direct
                    && now.duration_since(e.at) <= self.config.decay
            })
            .count()
    }

    /// Whether a direct change landed within the focus window.
    pub fn in_focus(&self, now: Instant) -> bool {
        self.last_direct
            .map(|at| now.duration_since(at) <= self.config.focus_window)
            .unwrap_or(false)
    }

    /// The score used to order pending builds.
    pub fn score(&mut self, now: Instant) -> f64 {
        self.prune(now);

        let base: f64 = self
            .events
            .iter()
            .map(|e| e.change_type.weight() * e.impact_weight)
            .sum();

        let focus = if self.in_focus(now) {
            self.config.focus_multiplier
        } else {
            1.0
        };

        // Recency decays linearly from the most recent change; direct
        // changes anchor the decay when present
        let anchor = self.last_direct.or_else(|| self.events.back().map(|e| e.at));
        let decay = anchor
            .map(|at| {
                let elapsed = now.duration_since(at).as_secs_f64();
                (1.0 - elapsed / self.config.decay.as_secs_f64()).max(0.0)
            })
            .unwrap_or(0.0);

        let duration_penalty = self
            .average_duration()
            .map(|d| {
                let ms = d.as_millis() as f64;
                (ms / DURATION_PENALTY_SATURATION_MS).min(1.0) * DURATION_PENALTY_CAP
            })
            .unwrap_or(0.0);

        base * focus * decay + self.success_rate() * SUCCESS_RATE_BONUS - duration_penalty
    }

    fn prune(&mut self, now: Instant) {
        let window = self.config.decay;
        while let Some(front) = self.events.front() {
            if now.duration_since(front.at) > window {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }
}

impl Default for TargetPriority {
    fn default() -> Self {
        Self::new(PriorityConfig::default())
    }
}

#[cfg(test)]
#[path = "priority_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted target-state document.
//!
//! One JSON document per (project, target), written to the shared state
//! directory. The document is the cross-process source of truth: the daemon
//! writes it, external tools and the freshness resolver read it, and the
//! combination of `lastBuild.status = building` plus a live owning process
//! acts as the build lock. Unknown fields survive read-modify-write via the
//! flattened `extra` map.

use crate::target::TargetKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Schema version written to every state document.
pub const STATE_VERSION: &str = "1.0";

/// Heartbeats older than this classify the owning daemon as stale.
pub const HEARTBEAT_STALENESS_MS: u64 = 30_000;

/// Outcome classification of the most recent build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    #[default]
    Idle,
    Building,
    Success,
    Failure,
}

impl BuildStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildStatus::Success | BuildStatus::Failure)
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            BuildStatus::Idle => "idle",
            BuildStatus::Building => "building",
            BuildStatus::Success => "success",
            BuildStatus::Failure => "failure",
        };
        f.write_str(text)
    }
}

/// Identity and liveness of the daemon that owns a state record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInfo {
    pub pid: u32,
    pub hostname: String,
    /// OS identifier, e.g. "linux" or "macos".
    pub platform: String,
    /// Epoch milliseconds when the daemon claimed the record.
    pub start_time: u64,
    /// Epoch milliseconds of the most recent heartbeat tick.
    pub last_heartbeat: u64,
    pub active: bool,
}

impl ProcessInfo {
    /// Age of the last heartbeat relative to `now_ms` (0 if in the future).
    pub fn heartbeat_age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_heartbeat)
    }

    /// Whether the heartbeat is within the staleness window.
    pub fn heartbeat_fresh(&self, now_ms: u64, staleness_ms: u64) -> bool {
        self.heartbeat_age_ms(now_ms) <= staleness_ms
    }
}

/// Result of one build invocation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRecord {
    pub status: BuildStatus,
    /// Epoch milliseconds when the build started.
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Short diagnostic extracted from the build output tail; the full log
    /// file is the source of truth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_summary: Option<String>,
    /// Version-control revision at build start, best-effort.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_hash: Option<String>,
    /// Builder variant tag, e.g. "executable" or "test".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builder: Option<String>,
}

/// Aggregate build totals for one target.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildHistory {
    pub build_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_build: Option<BuildRecord>,
}

impl BuildHistory {
    /// Fraction of completed builds that succeeded, 1.0 when none ran yet.
    pub fn success_rate(&self) -> f64 {
        let completed = self.success_count + self.failure_count;
        if completed == 0 {
            1.0
        } else {
            self.success_count as f64 / completed as f64
        }
    }
}

/// Bounded error context captured from a failed build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildErrorContext {
    pub exit_code: i32,
    pub command: String,
    /// Recent stdout lines, newest last.
    #[serde(default)]
    pub stdout_tail: Vec<String>,
    /// Recent stderr lines, newest last.
    #[serde(default)]
    pub stderr_tail: Vec<String>,
    pub timestamp: u64,
}

/// App-bundle metadata (app-bundle targets only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    pub bundle_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_path: Option<PathBuf>,
}

/// Recorded outcome of one post-build hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostBuildResult {
    pub name: String,
    /// "success", "failure", or "timeout".
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

/// The full per-target state document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetState {
    pub version: String,
    pub project_path: PathBuf,
    pub project_name: String,
    pub target: String,
    pub target_type: TargetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
    pub process: ProcessInfo,
    pub last_build: BuildRecord,
    #[serde(default)]
    pub build_history: BuildHistory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_info: Option<AppInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_build_error: Option<BuildErrorContext>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_build: Vec<PostBuildResult>,
    /// Fields this version doesn't know about, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TargetState {
    /// Whether the record claims an in-progress build. Liveness of the
    /// claimed owner is a separate, I/O-bound question answered by the
    /// state store.
    pub fn claims_building(&self) -> bool {
        self.last_build.status == BuildStatus::Building
    }

    /// Record a completed or started build, folding it into the history.
    ///
    /// `buildHistory.buildCount` counts build *starts* and never regresses:
    /// it increments on the transition into `building` (or directly into a
    /// terminal status when no `building` phase was observed).
    pub fn apply_build(&mut self, record: BuildRecord) {
        let was_building = self.last_build.status == BuildStatus::Building;
        match record.status {
            BuildStatus::Building => {
                self.build_history.build_count += 1;
            }
            BuildStatus::Success => {
                if !was_building {
                    self.build_history.build_count += 1;
                }
                self.build_history.success_count += 1;
                self.last_build_error = None;
            }
            BuildStatus::Failure => {
                if !was_building {
                    self.build_history.build_count += 1;
                }
                self.build_history.failure_count += 1;
            }
            BuildStatus::Idle => {}
        }
        if record.status.is_terminal() {
            self.build_history.last_build = Some(record.clone());
        }
        self.last_build = record;
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;

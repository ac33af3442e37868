// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Freshness evaluation for the runner.
//!
//! A built binary is fresh when all three checks hold:
//! 1. its modification time is not older than the last build's start,
//! 2. the current version-control revision matches the recorded one,
//! 3. the working tree is clean under the target's watch paths.
//!
//! Checks whose inputs are unavailable (no VCS, no recorded hash) are
//! skipped rather than failed, so non-git projects still get check 1.

use polter_core::TargetState;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Why a binary was judged stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// Binary predates the last recorded build.
    BinaryOlderThanBuild,
    /// VCS revision moved since the last build.
    RevisionChanged { built: String, current: String },
    /// Uncommitted changes under the target's watch paths.
    WatchPathsDirty,
}

impl std::fmt::Display for StaleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StaleReason::BinaryOlderThanBuild => {
                f.write_str("binary is older than the last build")
            }
            StaleReason::RevisionChanged { built, current } => write!(
                f,
                "revision changed since the last build ({} -> {})",
                short(built),
                short(current)
            ),
            StaleReason::WatchPathsDirty => {
                f.write_str("uncommitted changes under watched paths")
            }
        }
    }
}

fn short(rev: &str) -> &str {
    if rev.len() > 8 {
        rev.get(..8).unwrap_or(rev)
    } else {
        rev
    }
}

/// Verdict on whether the binary may run as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale(StaleReason),
}

/// Inputs gathered by the runner before deciding.
#[derive(Debug, Clone)]
pub struct FreshnessInputs {
    /// Binary mtime as epoch milliseconds, when readable.
    pub binary_mtime_ms: Option<u64>,
    /// Current VCS revision, when in a repository.
    pub current_revision: Option<String>,
    /// Whether watched paths carry uncommitted changes (None outside VCS).
    pub watch_paths_dirty: Option<bool>,
}

/// Slack absorbing filesystems that store mtimes at second granularity.
const MTIME_SLACK_MS: u64 = 2_000;

/// Pure decision over the state record and the gathered inputs.
pub fn evaluate(state: &TargetState, inputs: &FreshnessInputs) -> Freshness {
    if let Some(mtime) = inputs.binary_mtime_ms {
        if state.last_build.timestamp > 0
            && mtime + MTIME_SLACK_MS < state.last_build.timestamp
        {
            return Freshness::Stale(StaleReason::BinaryOlderThanBuild);
        }
    }

    if let (Some(built), Some(current)) =
        (state.last_build.git_hash.as_ref(), inputs.current_revision.as_ref())
    {
        if built != current {
            return Freshness::Stale(StaleReason::RevisionChanged {
                built: built.clone(),
                current: current.clone(),
            });
        }
    }

    if inputs.watch_paths_dirty == Some(true) {
        return Freshness::Stale(StaleReason::WatchPathsDirty);
    }

    Freshness::Fresh
}

/// Binary mtime as epoch milliseconds.
pub fn binary_mtime_ms(path: &Path) -> Option<u64> {
    let metadata = std::fs::metadata(path).ok()?;
    let modified = metadata.modified().ok()?;
    modified
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_millis() as u64)
}

/// Conventional locations searched when a target declares no output path.
const SEARCH_DIRS: &[&str] = &["target/debug", "target/release", "build", "bin", "."];

/// Locate the binary to run: declared output path first, then the
/// conventional locations under the project root.
pub fn find_binary(project_root: &Path, target: &polter_core::Target) -> Option<PathBuf> {
    if let Some(ref declared) = target.output_path {
        let path = if declared.is_absolute() {
            declared.clone()
        } else {
            project_root.join(declared)
        };
        return path.exists().then_some(path);
    }

    for dir in SEARCH_DIRS {
        let candidate = project_root.join(dir).join(&target.name);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
#[path = "freshness_tests.rs"]
mod tests;

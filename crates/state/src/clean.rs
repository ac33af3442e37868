// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Removal of stale state files.
//!
//! Operates on the whole state directory, all projects included. A record
//! is only ever removed when its owning process is not live; live records
//! are kept regardless of flags.

use polter_core::TargetState;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

use crate::paths::list_state_files;
use crate::process;

/// What `clean` should remove.
#[derive(Debug, Clone, Copy)]
pub struct CleanOptions {
    /// Remove every record with a dead owner, regardless of age.
    pub all: bool,
    /// Age threshold in days for the default mode.
    pub days: u64,
    /// Report without deleting.
    pub dry_run: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            all: false,
            days: 7,
            dry_run: false,
        }
    }
}

/// One removed (or would-be-removed) file.
#[derive(Debug, Clone, Serialize)]
pub struct CleanedFile {
    pub name: String,
    pub reason: String,
}

/// Outcome of one clean pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanReport {
    pub removed: Vec<CleanedFile>,
    pub kept: Vec<CleanedFile>,
    pub dry_run: bool,
}

/// Scan `dir` and remove state files whose owner is dead and whose last
/// heartbeat is older than `options.days` (or any dead-owner file with
/// `all`). Returns what was removed and why.
pub fn clean_stale_states(dir: &Path, options: CleanOptions) -> CleanReport {
    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    let threshold_ms = options.days.saturating_mul(24 * 60 * 60 * 1000);

    let mut report = CleanReport {
        dry_run: options.dry_run,
        ..Default::default()
    };

    for name in list_state_files(dir) {
        let path = dir.join(&name);
        let decision = classify(&path, now_ms, threshold_ms, options.all);
        debug!(file = %name, keep = decision.keep, reason = %decision.reason, "clean decision");

        let entry = CleanedFile {
            name,
            reason: decision.reason,
        };
        if decision.keep {
            report.kept.push(entry);
            continue;
        }

        if !options.dry_run {
            if let Err(e) = std::fs::remove_file(&path) {
                debug!(file = %entry.name, error = %e, "failed to remove state file");
                report.kept.push(CleanedFile {
                    name: entry.name,
                    reason: format!("remove failed: {e}"),
                });
                continue;
            }
        }
        report.removed.push(entry);
    }

    report
}

struct Decision {
    keep: bool,
    reason: String,
}

fn classify(path: &Path, now_ms: u64, threshold_ms: u64, all: bool) -> Decision {
    let state: Option<TargetState> = std::fs::read_to_string(path)
        .ok()
        .and_then(|text| serde_json::from_str(&text).ok());

    let Some(state) = state else {
        // Unreadable records are only swept by --all; the owner may be
        // mid-rewrite or the file may simply not be ours to judge.
        return if all {
            Decision {
                keep: false,
                reason: "unreadable".to_string(),
            }
        } else {
            Decision {
                keep: true,
                reason: "unreadable (use --all)".to_string(),
            }
        };
    };

    let owner = &state.process;
    if owner.active && process::is_alive_on(owner.pid, &owner.hostname) {
        return Decision {
            keep: true,
            reason: format!("owner pid {} is live", owner.pid),
        };
    }

    if all {
        return Decision {
            keep: false,
            reason: "owner dead".to_string(),
        };
    }

    let age_ms = now_ms.saturating_sub(owner.last_heartbeat);
    if age_ms > threshold_ms {
        Decision {
            keep: false,
            reason: format!(
                "owner dead, heartbeat {} old",
                polter_core::format_elapsed_ms(age_ms)
            ),
        }
    } else {
        Decision {
            keep: true,
            reason: "owner dead but within age threshold".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "clean_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot builds outside the daemon.
//!
//! `poltergeist build` without a running daemon, and the freshness
//! resolver's no-daemon fallback, both run the build command directly while
//! keeping the State Store protocol intact: claim the record, mark
//! `building`, run, record the outcome, release.

use polter_core::{BuildRecord, BuildStatus, Target};
use polter_state::StateStore;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

use crate::builder::{BuildError, BuildOptions, BuildOutcome, Builder};
use crate::vcs;

/// Options for a one-shot build.
#[derive(Default)]
pub struct OneshotOptions {
    /// Bypass the lock check.
    pub force: bool,
    /// Append captured output here (defaults to no log file).
    pub log_file: Option<PathBuf>,
    /// Echo build output to the terminal.
    pub passthrough: bool,
}

/// Run one build with full state bookkeeping. Fails with
/// [`BuildError::Locked`] when a live build holds the target and `force`
/// is not set.
pub async fn run_oneshot_build(
    store: &StateStore,
    target: &Target,
    project_root: &Path,
    options: OneshotOptions,
) -> Result<BuildOutcome, BuildError> {
    Builder::validate(target)?;

    if !options.force && store.is_locked(&target.name) {
        return Err(BuildError::Locked {
            target: target.name.clone(),
        });
    }

    // Claim (or reclaim) the record for this process
    store.init(target)?;

    let git_hash = vcs::head_revision(project_root).await;
    store.update_build_status(
        &target.name,
        BuildRecord {
            status: BuildStatus::Building,
            timestamp: epoch_ms(),
            git_hash: git_hash.clone(),
            builder: Some(target.kind.builder_tag().to_string()),
            ..Default::default()
        },
    )?;

    let builder = Builder::new(target.clone(), project_root);
    let outcome = builder
        .run(
            &[],
            &BuildOptions {
                log_file: options.log_file,
                passthrough: options.passthrough,
                env: Vec::new(),
                cancel: None,
            },
        )
        .await;

    store.update_build_status(&target.name, outcome.record.clone())?;
    if let Some(ref context) = outcome.error_context {
        if let Err(e) = store.update_build_error(&target.name, context.clone()) {
            warn!(target = %target.name, error = %e, "failed to record build error context");
        }
    }

    // This process is done with the record
    if let Err(e) = store.mark_inactive(&target.name) {
        warn!(target = %target.name, error = %e, "failed to release state record");
    }

    Ok(outcome)
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
#[path = "oneshot_tests.rs"]
mod tests;

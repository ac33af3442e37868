// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The freshness resolver behind the `polter` binary.
//!
//! Decides, from the State Store and the local version-control status,
//! whether to run the built binary as-is, wait for an in-flight build, or
//! trigger one first. The resolver never spawns a daemon: with no daemon
//! running it falls back to building directly with full state bookkeeping.

use anyhow::Result;
use polter_core::{BuildStatus, Target};
use polter_engine::{oneshot, vcs, OneshotOptions};
use polter_state::StateStore;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use crate::freshness::{self, Freshness, FreshnessInputs};
use crate::poll::{wait_for_build, WaitOutcome};
use crate::project;

/// Default wait budget for in-flight and triggered builds.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

pub struct RunnerArgs {
    pub target: String,
    pub binary_args: Vec<String>,
    pub timeout: Duration,
}

/// Resolve freshness and run the target's binary, forwarding its exit
/// code. Errors carry the exit code to use.
pub async fn run(args: RunnerArgs) -> Result<i32> {
    let project_root = project::find_project_root();
    let config = project::load_config(&project_root)?;
    let target = project::find_target(&config, &args.target)?.clone();

    let store = StateStore::open(&project_root, None)?;

    // 1. Find the binary
    let Some(binary) = freshness::find_binary(&project_root, &target) else {
        return Err(ExitError::new(
            1,
            format!(
                "no binary found for target '{}'; run `poltergeist build {}` first",
                target.name, target.name
            ),
        )
        .into());
    };

    // 2. No state record: run as-is, but say so
    let Some(state) = store.read(&target.name) else {
        eprintln!(
            "polter: no build state for '{}'; running the binary as-is",
            target.name
        );
        return exec_binary(&binary, &args.binary_args);
    };

    // 3. A live in-flight build wins: wait for it
    if state.claims_building() && store.owner_is_live(&state.process) {
        eprintln!("polter: waiting for in-flight build of '{}'...", target.name);
        match wait_for_build(&store, &target.name, args.timeout).await {
            WaitOutcome::Finished(BuildStatus::Failure) => {
                return Err(build_failed_error(&store, &target.name).into());
            }
            WaitOutcome::TimedOut => {
                return Err(ExitError::new(
                    1,
                    format!("timed out waiting for build of '{}'", target.name),
                )
                .into());
            }
            _ => {}
        }
    }

    // 4. Freshness from mtime, revision, and working-tree status
    let inputs = gather_inputs(&project_root, &target, &binary).await;
    let state = store.read(&target.name).unwrap_or(state);
    match freshness::evaluate(&state, &inputs) {
        Freshness::Fresh => exec_binary(&binary, &args.binary_args),
        Freshness::Stale(reason) => {
            eprintln!("polter: '{}' is stale: {reason}", target.name);
            trigger_build(&store, &target, &project_root, args.timeout).await?;
            exec_binary(&binary, &args.binary_args)
        }
    }
}

async fn gather_inputs(
    project_root: &Path,
    target: &Target,
    binary: &Path,
) -> FreshnessInputs {
    FreshnessInputs {
        binary_mtime_ms: freshness::binary_mtime_ms(binary),
        current_revision: vcs::head_revision(project_root).await,
        watch_paths_dirty: vcs::dirty_under(project_root, &target.watch_paths).await,
    }
}

/// Trigger exactly one build: through the daemon's admission interface
/// when one is live, by building directly otherwise.
async fn trigger_build(
    store: &StateStore,
    target: &Target,
    project_root: &Path,
    timeout: Duration,
) -> Result<()> {
    let client = DaemonClient::for_project(project_root);
    if client.live_info().is_some() {
        debug!(target = %target.name, "requesting build from daemon");
        client
            .build(&target.name, false)
            .await
            .map_err(|e| ExitError::new(1, format!("build request failed: {e}")))?;
        eprintln!("polter: rebuilding '{}' via daemon...", target.name);

        match wait_for_build(store, &target.name, timeout).await {
            WaitOutcome::Finished(BuildStatus::Success) => Ok(()),
            WaitOutcome::Finished(BuildStatus::Failure) => {
                Err(build_failed_error(store, &target.name).into())
            }
            WaitOutcome::TimedOut => Err(ExitError::new(
                1,
                format!("timed out waiting for build of '{}'", target.name),
            )
            .into()),
            _ => Ok(()),
        }
    } else {
        eprintln!("polter: no daemon running, building '{}' directly...", target.name);
        let outcome = oneshot::run_oneshot_build(
            store,
            target,
            project_root,
            OneshotOptions {
                force: false,
                log_file: Some(store.project_paths().target_log_file(&target.name)),
                passthrough: true,
            },
        )
        .await
        .map_err(|e| ExitError::new(1, format!("build failed to run: {e}")))?;

        if outcome.succeeded() {
            Ok(())
        } else {
            Err(build_failed_error(store, &target.name).into())
        }
    }
}

fn build_failed_error(store: &StateStore, target: &str) -> ExitError {
    let summary = store
        .read(target)
        .and_then(|s| s.last_build.error_summary)
        .unwrap_or_else(|| "build failed".to_string());
    ExitError::new(1, format!("build of '{target}' failed: {summary}"))
}

/// Run the binary, forwarding arguments and stdio, returning its exit code.
fn exec_binary(binary: &Path, args: &[String]) -> Result<i32> {
    let status = std::process::Command::new(binary)
        .args(args)
        .status()
        .map_err(|e| ExitError::new(1, format!("failed to run {}: {e}", binary.display())))?;
    Ok(status.code().unwrap_or(1))
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;

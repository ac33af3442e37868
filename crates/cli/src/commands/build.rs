// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `poltergeist build <target>`: one-shot build participating in the lock
//! protocol. Routed through a live daemon's admission interface when one
//! runs; built directly otherwise.

use anyhow::Result;
use clap::Args;
use polter_core::BuildStatus;
use polter_engine::{oneshot, OneshotOptions};
use polter_state::StateStore;
use std::path::Path;

use crate::client::DaemonClient;
use crate::exit_error::ExitError;
use crate::project;
use crate::runner::DEFAULT_WAIT_TIMEOUT;

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Target to build
    pub target: String,

    /// Bypass the build lock check
    #[arg(long)]
    pub force: bool,

    /// Emit the resulting build record as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn handle(args: BuildArgs, project_root: &Path) -> Result<()> {
    let config = project::load_config(project_root)?;
    let target = project::find_target(&config, &args.target)?.clone();
    let store = StateStore::open(project_root, None)?;

    let client = DaemonClient::for_project(project_root);
    let status = if client.live_info().is_some() {
        // Daemon path: admit, then watch the state store for a build that
        // started after our request (the count guards against reading a
        // previous build's result)
        let count_before = store
            .read(&target.name)
            .map(|s| s.build_history.build_count)
            .unwrap_or(0);
        let queued = client.build(&target.name, args.force).await?;
        if !queued {
            eprintln!("build merged into the running build's follow-up");
        }
        wait_for_new_build(&store, &target.name, count_before).await?
    } else {
        let outcome = oneshot::run_oneshot_build(
            &store,
            &target,
            project_root,
            OneshotOptions {
                force: args.force,
                log_file: Some(store.project_paths().target_log_file(&target.name)),
                passthrough: !args.json,
            },
        )
        .await?;
        outcome.record.status
    };

    if args.json {
        let record = store.read(&target.name).map(|s| s.last_build);
        println!("{}", serde_json::to_string_pretty(&record)?);
    }

    finish(status, &store, &target.name)
}

/// Poll until a build newer than `count_before` reaches a terminal status.
async fn wait_for_new_build(
    store: &StateStore,
    target: &str,
    count_before: u64,
) -> Result<BuildStatus> {
    let deadline = std::time::Instant::now() + DEFAULT_WAIT_TIMEOUT;
    loop {
        if let Some(state) = store.read(target) {
            let status = state.last_build.status;
            if state.build_history.build_count > count_before && status != BuildStatus::Building {
                return Ok(status);
            }
        }
        if std::time::Instant::now() >= deadline {
            return Err(ExitError::new(1, "timed out waiting for the build").into());
        }
        tokio::time::sleep(crate::env::poll_interval()).await;
    }
}

fn finish(status: BuildStatus, store: &StateStore, target: &str) -> Result<()> {
    match status {
        BuildStatus::Success => Ok(()),
        BuildStatus::Failure => {
            let summary = store
                .read(target)
                .and_then(|s| s.last_build.error_summary)
                .unwrap_or_else(|| "build failed".to_string());
            Err(ExitError::new(1, summary).into())
        }
        other => Err(ExitError::new(1, format!("build ended in state '{other}'")).into()),
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `poltergeist wait [target]`: block until the current build completes.

use anyhow::Result;
use clap::Args;
use polter_core::BuildStatus;
use polter_state::StateStore;
use std::path::Path;
use std::time::Duration;

use crate::exit_error::ExitError;
use crate::poll::{wait_for_build, WaitOutcome};
use crate::project;

#[derive(Args, Debug)]
pub struct WaitArgs {
    /// Target to wait on (default: every configured target)
    pub target: Option<String>,

    /// Give up after this many seconds
    #[arg(long, default_value = "300")]
    pub timeout: u64,
}

pub async fn handle(args: WaitArgs, project_root: &Path) -> Result<()> {
    let config = project::load_config(project_root)?;
    let store = StateStore::open(project_root, None)?;
    let timeout = Duration::from_secs(args.timeout);

    let names: Vec<String> = match args.target {
        Some(ref name) => {
            project::find_target(&config, name)?;
            vec![name.clone()]
        }
        None => config.targets.iter().map(|t| t.name.clone()).collect(),
    };

    for name in names {
        match wait_for_build(&store, &name, timeout).await {
            WaitOutcome::Finished(BuildStatus::Failure) => {
                let summary = store
                    .read(&name)
                    .and_then(|s| s.last_build.error_summary)
                    .unwrap_or_else(|| "build failed".to_string());
                return Err(ExitError::new(1, format!("{name}: {summary}")).into());
            }
            WaitOutcome::TimedOut => {
                return Err(
                    ExitError::new(1, format!("timed out waiting for '{name}'")).into()
                );
            }
            WaitOutcome::NoState | WaitOutcome::Finished(_) => {}
        }
    }
    Ok(())
}

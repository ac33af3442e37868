// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `poltergeist start` (alias `haunt`): spawn the daemon for this project.

use anyhow::Result;
use clap::Args;
use std::path::Path;

use crate::client::DaemonClient;
use crate::daemon_process;
use crate::exit_error::ExitError;
use crate::project;

#[derive(Args, Debug)]
pub struct StartArgs {
    /// Watch only this target (repeatable)
    #[arg(long = "target")]
    pub targets: Vec<String>,

    /// Run the daemon in the foreground instead of detaching
    #[arg(long)]
    pub foreground: bool,
}

pub async fn handle(args: StartArgs, project_root: &Path) -> Result<()> {
    // Validate config and targets before touching the daemon
    let config = project::load_config(project_root)?;
    for name in &args.targets {
        project::find_target(&config, name)?;
    }

    let client = DaemonClient::for_project(project_root);
    if let Some(info) = client.live_info() {
        return Err(ExitError::new(
            1,
            format!(
                "a daemon is already running for this project (pid {})",
                info.pid
            ),
        )
        .into());
    }

    if args.foreground {
        let code = daemon_process::run_daemon_foreground(project_root, &args.targets)?;
        if code != 0 {
            return Err(ExitError::silent(code).into());
        }
        return Ok(());
    }

    daemon_process::spawn_daemon(project_root, &args.targets)?;

    match daemon_process::wait_for_ready(&client).await {
        Ok(version) => {
            println!("poltergeist daemon started ({version})");
            Ok(())
        }
        Err(e) => {
            let paths = polter_state::ProjectPaths::for_project(project_root);
            let detail = daemon_process::read_startup_error(&paths.daemon_log_file())
                .unwrap_or_else(|| e.to_string());
            Err(ExitError::new(1, format!("daemon failed to start: {detail}")).into())
        }
    }
}

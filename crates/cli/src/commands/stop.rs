// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `poltergeist stop` (alias `rest`) and `restart`.

use anyhow::Result;
use std::path::Path;
use std::time::Duration;

use crate::client::DaemonClient;
use crate::commands::start::{self, StartArgs};
use crate::daemon_process;
use crate::exit_error::ExitError;

/// Exit-poll budget after a graceful shutdown request.
const STOP_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn handle(project_root: &Path) -> Result<()> {
    let client = DaemonClient::for_project(project_root);
    let Some(info) = client.live_info() else {
        return Err(ExitError::new(1, "no daemon is running for this project").into());
    };

    // Graceful IPC shutdown first; a wedged daemon gets the signal path
    match client.shutdown().await {
        Ok(()) => {
            if polter_state::process::wait_for_exit(info.pid, STOP_TIMEOUT) {
                println!("poltergeist daemon stopped");
                return Ok(());
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, "IPC shutdown failed, falling back to signals");
        }
    }

    if daemon_process::terminate_daemon(info.pid, STOP_TIMEOUT) {
        println!("poltergeist daemon stopped");
        Ok(())
    } else {
        Err(ExitError::new(1, format!("daemon (pid {}) did not exit", info.pid)).into())
    }
}

/// `restart`: stop → small grace → start.
pub async fn handle_restart(project_root: &Path) -> Result<()> {
    let client = DaemonClient::for_project(project_root);
    if client.live_info().is_some() {
        handle(project_root).await?;
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    start::handle(
        StartArgs {
            targets: Vec::new(),
            foreground: false,
        },
        project_root,
    )
    .await
}

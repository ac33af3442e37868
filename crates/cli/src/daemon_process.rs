// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon process management for the CLI.
//!
//! Spawning, readiness polling, and termination of `polterd`.

use crate::client::{ClientError, DaemonClient};
use crate::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

/// Locate the `polterd` binary: explicit override, then a sibling of the
/// current executable, then PATH.
pub fn find_polterd_binary() -> PathBuf {
    if let Some(path) = env::daemon_binary() {
        return PathBuf::from(path);
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("polterd");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from("polterd")
}

/// Spawn the daemon detached, watching `project_root`.
pub fn spawn_daemon(
    project_root: &Path,
    targets: &[String],
) -> Result<std::process::Child, ClientError> {
    let binary = find_polterd_binary();
    let mut command = Command::new(&binary);
    command
        .arg("--project")
        .arg(project_root)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null());
    for target in targets {
        command.arg("--target").arg(target);
    }

    command
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(format!("{}: {e}", binary.display())))
}

/// Run the daemon in the foreground, inheriting stdio. Returns its exit code.
pub fn run_daemon_foreground(
    project_root: &Path,
    targets: &[String],
) -> Result<i32, ClientError> {
    let binary = find_polterd_binary();
    let mut command = Command::new(&binary);
    command.arg("--project").arg(project_root);
    for target in targets {
        command.arg("--target").arg(target);
    }

    let status = command
        .status()
        .map_err(|e| ClientError::DaemonStartFailed(format!("{}: {e}", binary.display())))?;
    Ok(status.code().unwrap_or(1))
}

/// Poll the daemon socket until it answers a ping or the handshake
/// timeout elapses.
pub async fn wait_for_ready(client: &DaemonClient) -> Result<String, ClientError> {
    let deadline = Instant::now() + env::daemon_timeout();
    loop {
        match client.ping().await {
            Ok(version) => return Ok(version),
            Err(_) if Instant::now() < deadline => {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Startup marker the daemon writes before anything else.
const STARTUP_MARKER_PREFIX: &str = "--- polterd: starting (pid: ";

/// Scan the daemon log for errors from the most recent startup attempt.
pub fn read_startup_error(log_path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(log_path).ok()?;
    parse_startup_error(&content)
}

/// Pure scan of log content for the last startup attempt's errors.
fn parse_startup_error(content: &str) -> Option<String> {
    let start = content.rfind(STARTUP_MARKER_PREFIX)?;
    let attempt = match content.get(start..) {
        Some(tail) => tail,
        None => return None,
    };

    let errors: Vec<&str> = attempt
        .lines()
        .filter(|line| line.contains("ERROR") || line.contains("failed to start"))
        .collect();
    if errors.is_empty() {
        return None;
    }
    Some(errors.join("\n"))
}

/// Terminate the daemon: graceful stop request via signal, escalating to
/// a forced kill after `timeout`.
pub fn terminate_daemon(pid: u32, timeout: Duration) -> bool {
    polter_state::process::terminate(pid, true, timeout)
}

#[cfg(test)]
#[path = "daemon_process_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: single-instance enforcement, state claims, teardown.
//!
//! One daemon per project root. Discovery goes through the daemon info
//! record in the state directory; mutual exclusion is enforced by an fs2
//! advisory lock underneath it, so a stale info record (dead pid) never
//! blocks a fresh start.

use fs2::FileExt;
use polter_core::{PoltergeistConfig, Target};
use polter_engine::Builder;
use polter_state::{DaemonInfo, ProjectPaths, StateError, StateStore};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

use crate::protocol::PROTOCOL_VERSION;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("a daemon is already running for this project{}", pid_suffix(.pid))]
    AlreadyRunning { pid: Option<u32> },

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("no enabled targets could be claimed")]
    NoTargets,

    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn pid_suffix(pid: &Option<u32>) -> String {
    pid.map(|p| format!(" (pid {p})")).unwrap_or_default()
}

/// Resolved file locations for one daemon instance.
#[derive(Debug, Clone)]
pub struct DaemonPaths {
    pub state_dir: PathBuf,
    pub project: ProjectPaths,
    pub socket: PathBuf,
    pub daemon_info: PathBuf,
    pub daemon_lock: PathBuf,
    pub daemon_version: PathBuf,
    pub daemon_log: PathBuf,
}

impl DaemonPaths {
    /// Resolve against the ambient state directory (env override honored).
    pub fn resolve(project_root: &Path) -> Self {
        Self::in_state_dir(polter_state::state_dir(), project_root)
    }

    /// Resolve against an explicit state directory.
    pub fn in_state_dir(state_dir: PathBuf, project_root: &Path) -> Self {
        let project = ProjectPaths::new(state_dir.clone(), project_root);
        Self {
            socket: project.socket_file(),
            daemon_info: project.daemon_info_file(),
            daemon_lock: project.daemon_lock_file(),
            daemon_version: project.daemon_version_file(),
            daemon_log: project.daemon_log_file(),
            state_dir,
            project,
        }
    }
}

/// Everything `startup` hands to the runtime.
#[derive(Debug)]
pub struct DaemonState {
    pub paths: DaemonPaths,
    pub project_root: PathBuf,
    pub config: PoltergeistConfig,
    pub store: Arc<StateStore>,
    /// Targets successfully validated and claimed.
    pub targets: Vec<Target>,
    // NOTE(lifetime): Held to maintain the exclusive daemon lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
}

/// Result of daemon startup; the listener is separate so the caller can
/// spawn it as its own task.
#[derive(Debug)]
pub struct StartupResult {
    pub daemon: DaemonState,
    pub listener: UnixListener,
}

/// Start the daemon: acquire the instance lock, write the info record,
/// claim target states, and bind the socket.
pub fn startup(
    project_root: &Path,
    config_path: Option<&Path>,
    config: PoltergeistConfig,
) -> Result<StartupResult, LifecycleError> {
    startup_at(DaemonPaths::resolve(project_root), project_root, config_path, config)
}

/// [`startup`] with explicit paths (tests use isolated state directories).
pub fn startup_at(
    paths: DaemonPaths,
    project_root: &Path,
    config_path: Option<&Path>,
    config: PoltergeistConfig,
) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&paths.state_dir)?;

    // 1. Acquire the instance lock FIRST - prevents start races.
    // Open without truncating so a losing contender can't clobber it.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&paths.daemon_lock)?;
    if lock_file.try_lock_exclusive().is_err() {
        let pid = DaemonInfo::read(&paths.daemon_info).map(|info| info.pid);
        return Err(LifecycleError::AlreadyRunning { pid });
    }

    // 2. A stale info record (dead pid) is overwritten transparently
    if let Some(stale) = DaemonInfo::read(&paths.daemon_info) {
        if !stale.is_live() {
            info!(stale_pid = stale.pid, "overwriting stale daemon info record");
        }
    }
    let info = DaemonInfo {
        pid: std::process::id(),
        hostname: polter_state::process::hostname(),
        start_time: epoch_ms(),
        project_path: project_root.to_path_buf(),
        config_path: config_path.map(Path::to_path_buf),
        log_file: paths.daemon_log.clone(),
        socket_path: paths.socket.clone(),
        version: Some(PROTOCOL_VERSION.to_string()),
    };
    info.write(&paths.daemon_info)?;
    std::fs::write(&paths.daemon_version, PROTOCOL_VERSION)?;

    // 3. Open the store and claim every enabled target
    let store = Arc::new(StateStore::open_at(
        paths.state_dir.clone(),
        project_root,
        config_path,
    )?);

    let mut targets = Vec::new();
    for target in config.enabled_targets() {
        if let Err(e) = Builder::validate(target) {
            warn!(target = %target.name, error = %e, "skipping invalid target");
            continue;
        }
        match store.init(target) {
            Ok(_) => targets.push(target.clone()),
            Err(StateError::AlreadyOwned { pid, hostname, .. }) => {
                warn!(
                    target = %target.name,
                    owner_pid = pid,
                    owner_host = %hostname,
                    "target owned by another live daemon, skipping"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
    if targets.is_empty() {
        cleanup_on_failure(&paths);
        return Err(LifecycleError::NoTargets);
    }

    // 4. Remove a stale socket and bind (LAST - only after validation)
    if paths.socket.exists() {
        std::fs::remove_file(&paths.socket)?;
    }
    let listener = UnixListener::bind(&paths.socket)
        .map_err(|e| LifecycleError::BindFailed(paths.socket.clone(), e))?;

    info!(
        project = %project_root.display(),
        targets = targets.len(),
        "daemon started"
    );

    Ok(StartupResult {
        daemon: DaemonState {
            paths,
            project_root: project_root.to_path_buf(),
            config,
            store,
            targets,
            lock_file,
        },
        listener,
    })
}

impl DaemonState {
    /// Orderly release: flag records inactive, drop discovery files.
    /// The instance lock releases when the state is dropped.
    pub fn release(&self) {
        for target in &self.targets {
            if let Err(e) = self.store.mark_inactive(&target.name) {
                warn!(target = %target.name, error = %e, "failed to flag state inactive");
            }
        }
        if let Err(e) = DaemonInfo::remove(&self.paths.daemon_info) {
            warn!(error = %e, "failed to remove daemon info record");
        }
        if self.paths.daemon_version.exists() {
            if let Err(e) = std::fs::remove_file(&self.paths.daemon_version) {
                warn!(error = %e, "failed to remove daemon version file");
            }
        }
        if self.paths.socket.exists() {
            if let Err(e) = std::fs::remove_file(&self.paths.socket) {
                warn!(error = %e, "failed to remove socket file");
            }
        }
        info!("daemon shutdown complete");
    }
}

/// Clean up discovery files when startup fails partway.
fn cleanup_on_failure(paths: &DaemonPaths) {
    if paths.daemon_info.exists() {
        let _ = std::fs::remove_file(&paths.daemon_info);
    }
    if paths.daemon_version.exists() {
        let _ = std::fs::remove_file(&paths.daemon_version);
    }
    if paths.socket.exists() {
        let _ = std::fs::remove_file(&paths.socket);
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;

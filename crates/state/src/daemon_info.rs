// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-project daemon discovery record.
//!
//! One `{leaf}-{hash8}-daemon.json` per project lets the CLI find an
//! already-running daemon without scanning target state files. A record
//! naming a dead pid is stale and may be overwritten transparently.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::process;
use crate::store::{write_json_atomic, StateError};

/// Contents of the daemon info record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonInfo {
    pub pid: u32,
    pub hostname: String,
    /// Epoch milliseconds when the daemon started.
    pub start_time: u64,
    pub project_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
    pub log_file: PathBuf,
    pub socket_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl DaemonInfo {
    /// Read the record; missing or malformed files read as `None`.
    pub fn read(path: &Path) -> Option<Self> {
        let text = fs::read_to_string(path).ok()?;
        serde_json::from_str(&text).ok()
    }

    /// Atomically write the record.
    pub fn write(&self, path: &Path) -> Result<(), StateError> {
        write_json_atomic(path, self)
    }

    /// Delete the record; missing files are fine.
    pub fn remove(path: &Path) -> Result<(), StateError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the named daemon is live on this host.
    pub fn is_live(&self) -> bool {
        process::is_alive_on(self.pid, &self.hostname)
    }

    /// Read the record and return it only if its daemon is live.
    pub fn read_live(path: &Path) -> Option<Self> {
        Self::read(path).filter(|info| info.is_live())
    }
}

#[cfg(test)]
#[path = "daemon_info_tests.rs"]
mod tests;

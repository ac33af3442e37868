// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State directory layout and file naming.
//!
//! Every project on the host shares one state directory. File names embed
//! the project's leaf directory name plus a short hash of its absolute path
//! so two projects with the same leaf never collide.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Resolve the shared state directory.
///
/// `POLTERGEIST_STATE_DIR` wins (tests use it for isolation); otherwise a
/// `poltergeist` directory under the OS temp area.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("POLTERGEIST_STATE_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    std::env::temp_dir().join("poltergeist")
}

/// Stable 8-hex-character hash of the canonical project path.
pub fn project_hash8(project_path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(project_path.to_string_lossy().as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Leaf directory name used as the human-readable file name prefix.
///
/// Path separators never survive into file names; anything unnamed (e.g.
/// a bare `/`) falls back to "project".
fn project_leaf(project_path: &Path) -> String {
    project_path
        .file_name()
        .map(|n| n.to_string_lossy().replace(['/', '\\'], "-"))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "project".to_string())
}

/// Precomputed file locations for one project within the state directory.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    dir: PathBuf,
    prefix: String,
}

impl ProjectPaths {
    pub fn new(state_dir: PathBuf, project_path: &Path) -> Self {
        let prefix = format!(
            "{}-{}",
            project_leaf(project_path),
            project_hash8(project_path)
        );
        Self {
            dir: state_dir,
            prefix,
        }
    }

    /// Resolve against the ambient state directory (env override honored).
    pub fn for_project(project_path: &Path) -> Self {
        Self::new(state_dir(), project_path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `{leaf}-{hash8}-{target}.state`
    pub fn state_file(&self, target: &str) -> PathBuf {
        self.dir.join(format!("{}-{}.state", self.prefix, target))
    }

    /// `{leaf}-{hash8}-daemon.json`
    pub fn daemon_info_file(&self) -> PathBuf {
        self.dir.join(format!("{}-daemon.json", self.prefix))
    }

    /// `{leaf}-{hash8}-daemon.lock` — fs2 advisory lock backing the info record.
    pub fn daemon_lock_file(&self) -> PathBuf {
        self.dir.join(format!("{}-daemon.lock", self.prefix))
    }

    /// `{leaf}-{hash8}-daemon.version` — version of the running daemon,
    /// written next to the info record so clients can flag a mismatch.
    pub fn daemon_version_file(&self) -> PathBuf {
        self.dir.join(format!("{}-daemon.version", self.prefix))
    }

    /// `{leaf}-{hash8}.sock` — daemon IPC socket.
    pub fn socket_file(&self) -> PathBuf {
        self.dir.join(format!("{}.sock", self.prefix))
    }

    /// `{leaf}-{hash8}-daemon.log`
    pub fn daemon_log_file(&self) -> PathBuf {
        self.dir.join(format!("{}-daemon.log", self.prefix))
    }

    /// `{leaf}-{hash8}-{target}.log` — per-target build log.
    pub fn target_log_file(&self, target: &str) -> PathBuf {
        self.dir.join(format!("{}-{}.log", self.prefix, target))
    }

    /// Target name encoded in a state file name produced by this project,
    /// or `None` when the file belongs to another project.
    pub fn target_of_state_file(&self, file_name: &str) -> Option<String> {
        let rest = file_name.strip_prefix(&self.prefix)?.strip_prefix('-')?;
        rest.strip_suffix(".state").map(|t| t.to_string())
    }
}

/// Enumerate every `*.state` file name in `dir`, ignoring sub-directories
/// and non-state files. Missing directory reads as empty.
pub fn list_state_files(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .flatten()
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|n| n.ends_with(".state"))
        .collect();
    names.sort();
    names
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;

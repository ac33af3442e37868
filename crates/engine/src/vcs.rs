// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort version-control probes.
//!
//! Builds record the revision they were produced from; the freshness
//! resolver compares it against the current revision and the working-tree
//! status under a target's watch paths. Everything here degrades to `None`
//! outside a repository — freshness checks then skip the VCS inputs.

use polter_adapters::subprocess::{run_with_timeout, VCS_TIMEOUT};
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Current HEAD revision, or `None` outside a git repository.
pub async fn head_revision(project_root: &Path) -> Option<String> {
    let mut cmd = Command::new("git");
    cmd.args(["rev-parse", "HEAD"]).current_dir(project_root);

    match run_with_timeout(cmd, VCS_TIMEOUT, "git rev-parse").await {
        Ok(output) if output.status.success() => {
            let rev = String::from_utf8_lossy(&output.stdout).trim().to_string();
            (!rev.is_empty()).then_some(rev)
        }
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "git rev-parse unavailable");
            None
        }
    }
}

/// Whether the working tree has uncommitted changes under the given
/// pathspecs. `None` when the probe itself fails (not a repository).
pub async fn dirty_under(project_root: &Path, patterns: &[String]) -> Option<bool> {
    let mut cmd = Command::new("git");
    cmd.args(["status", "--porcelain", "--"])
        .current_dir(project_root);
    for pattern in patterns {
        // git pathspec magic: restrict each watch glob to tracked+untracked
        // matches without shell expansion
        cmd.arg(format!(":(glob){pattern}"));
    }

    match run_with_timeout(cmd, VCS_TIMEOUT, "git status").await {
        Ok(output) if output.status.success() => {
            Some(!output.stdout.iter().all(u8::is_ascii_whitespace))
        }
        Ok(_) => None,
        Err(e) => {
            debug!(error = %e, "git status unavailable");
            None
        }
    }
}

#[cfg(test)]
#[path = "vcs_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project root discovery and config loading.

use anyhow::{Context, Result};
use polter_core::PoltergeistConfig;
use std::path::{Path, PathBuf};

/// Config file name at the project root.
pub const CONFIG_FILE: &str = "poltergeist.config.json";

/// Find the project root by walking up from `start` looking for
/// `poltergeist.config.json`. Falls back to `start` itself.
pub fn find_project_root_from(start: &Path) -> PathBuf {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return current;
        }
        if !current.pop() {
            return start.to_path_buf();
        }
    }
}

/// Find the project root by walking up from the current directory.
///
/// The result is canonicalized so the CLI and the daemon agree on the
/// state-file hash even when invoked through symlinks.
pub fn find_project_root() -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let root = find_project_root_from(&cwd);
    root.canonicalize().unwrap_or(root)
}

/// Load and parse the project config.
pub fn load_config(project_root: &Path) -> Result<PoltergeistConfig> {
    let path = project_root.join(CONFIG_FILE);
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("no poltergeist config at {}", path.display()))?;
    PoltergeistConfig::from_json(&text)
        .with_context(|| format!("invalid config at {}", path.display()))
}

/// Resolve a named target from the config.
pub fn find_target<'a>(
    config: &'a PoltergeistConfig,
    name: &str,
) -> Result<&'a polter_core::Target> {
    config.target(name).ok_or_else(|| {
        let known: Vec<&str> = config.targets.iter().map(|t| t.name.as_str()).collect();
        anyhow::anyhow!("unknown target '{}' (known targets: {})", name, known.join(", "))
    })
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;

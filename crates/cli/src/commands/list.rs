// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `poltergeist list`: enumerate configured targets.

use anyhow::Result;
use std::path::Path;

use crate::project;

pub fn handle(project_root: &Path) -> Result<()> {
    let config = project::load_config(project_root)?;

    for target in &config.targets {
        let enabled = if target.enabled { "" } else { " (disabled)" };
        println!(
            "{:<20} {:<18} watches {} pattern(s){}",
            target.name,
            target.kind.builder_tag(),
            target.watch_paths.len(),
            enabled
        );
        println!("    {}", target.build_command);
    }
    Ok(())
}

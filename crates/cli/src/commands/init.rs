// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `poltergeist init`: drop a starter config at the project root.

use anyhow::Result;
use clap::Args;
use std::path::Path;

use crate::exit_error::ExitError;
use crate::project::CONFIG_FILE;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config
    #[arg(long)]
    pub force: bool,
}

const TEMPLATE: &str = r#"{
  "version": "1.0",
  "projectName": "my-project",
  "targets": [
    {
      "name": "app",
      "type": "executable",
      "buildCommand": "make app",
      "outputPath": "build/app",
      "watchPaths": ["src/**/*"],
      "settlingDelayMs": 1000
    }
  ]
}
"#;

pub fn handle(args: InitArgs, project_root: &Path) -> Result<()> {
    let path = project_root.join(CONFIG_FILE);
    if path.exists() && !args.force {
        return Err(ExitError::new(
            1,
            format!("{} already exists (use --force to overwrite)", path.display()),
        )
        .into());
    }

    std::fs::write(&path, TEMPLATE)?;
    println!("wrote {}", path.display());
    println!("edit the target list, then run `poltergeist start`");
    Ok(())
}

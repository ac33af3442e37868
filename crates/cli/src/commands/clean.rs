// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `poltergeist clean`: remove stale state files across all projects.

use anyhow::Result;
use clap::Args;
use polter_state::{clean_stale_states, CleanOptions};

use crate::env;

#[derive(Args, Debug)]
pub struct CleanArgs {
    /// Remove every record with a dead owner, regardless of age
    #[arg(long)]
    pub all: bool,

    /// Age threshold in days (default 7)
    #[arg(long, default_value = "7")]
    pub days: u64,

    /// Report what would be removed without deleting anything
    #[arg(long)]
    pub dry_run: bool,
}

pub fn handle(args: CleanArgs) -> Result<()> {
    let dir = polter_state::state_dir();
    let report = clean_stale_states(
        &dir,
        CleanOptions {
            all: args.all,
            days: args.days,
            dry_run: args.dry_run,
        },
    );

    let verb = if report.dry_run { "would remove" } else { "removed" };
    for file in &report.removed {
        println!("{verb} {} ({})", file.name, file.reason);
    }
    if env::debug_clean() {
        for file in &report.kept {
            eprintln!("kept {} ({})", file.name, file.reason);
        }
    }
    println!(
        "{verb} {} state file(s), kept {}",
        report.removed.len(),
        report.kept.len()
    );
    Ok(())
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! poltergeist - keeps your builds fresh while you edit

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use poltergeist::commands::{build, clean, init, list, logs, start, status, stop, wait};
use poltergeist::exit_error::ExitError;
use poltergeist::project;

#[derive(Parser)]
#[command(
    name = "poltergeist",
    version,
    about = "Poltergeist - a per-project daemon that keeps build targets fresh"
)]
struct Cli {
    /// Change to <dir> before doing anything
    #[arg(short = 'C', global = true, value_name = "DIR")]
    directory: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon for this project
    #[command(alias = "haunt")]
    Start(start::StartArgs),
    /// Stop the daemon
    #[command(alias = "rest")]
    Stop,
    /// Stop, then start the daemon
    Restart,
    /// Show target states
    Status(status::StatusArgs),
    /// Build one target now
    Build(build::BuildArgs),
    /// Block until the current build completes
    Wait(wait::WaitArgs),
    /// Print or follow a build/daemon log
    Logs(logs::LogsArgs),
    /// List configured targets
    List,
    /// Remove stale state files
    Clean(clean::CleanArgs),
    /// Write a starter config
    Init(init::InitArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let code = e.downcast_ref::<ExitError>().map_or(1, |e| e.code);
        let message = e.to_string();
        if !message.is_empty() {
            eprintln!("Error: {message}");
        }
        std::process::exit(code);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(ref dir) = cli.directory {
        let canonical = std::fs::canonicalize(dir)
            .map_err(|e| anyhow::anyhow!("cannot change to directory '{}': {e}", dir.display()))?;
        std::env::set_current_dir(&canonical)?;
    }

    // Clean operates on the whole state directory, not one project
    if let Commands::Clean(args) = cli.command {
        return clean::handle(args);
    }

    let project_root = project::find_project_root();

    match cli.command {
        Commands::Start(args) => start::handle(args, &project_root).await,
        Commands::Stop => stop::handle(&project_root).await,
        Commands::Restart => stop::handle_restart(&project_root).await,
        Commands::Status(args) => status::handle(args, &project_root).await,
        Commands::Build(args) => build::handle(args, &project_root).await,
        Commands::Wait(args) => wait::handle(args, &project_root).await,
        Commands::Logs(args) => logs::handle(args, &project_root).await,
        Commands::List => list::handle(&project_root),
        Commands::Init(args) => init::handle(args, &project_root),
        Commands::Clean(_) => unreachable!(),
    }
}

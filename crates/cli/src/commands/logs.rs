// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `poltergeist logs [target]`: print or follow a build/daemon log.

use anyhow::Result;
use clap::Args;
use polter_state::ProjectPaths;
use std::path::Path;

use crate::output;
use crate::project;

#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Target whose log to show (default: the daemon log)
    pub target: Option<String>,

    /// Number of trailing lines to print
    #[arg(long, default_value = "50")]
    pub tail: usize,

    /// Keep streaming new lines (like tail -f)
    #[arg(long, short)]
    pub follow: bool,

    /// Emit the lines as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn handle(args: LogsArgs, project_root: &Path) -> Result<()> {
    let paths = ProjectPaths::for_project(project_root);

    let log_path = match args.target {
        Some(ref name) => {
            let config = project::load_config(project_root)?;
            project::find_target(&config, name)?;
            paths.target_log_file(name)
        }
        None => paths.daemon_log_file(),
    };

    let lines = output::tail_lines(&log_path, args.tail);

    if args.json {
        let payload = serde_json::json!({
            "logPath": log_path.to_string_lossy(),
            "lines": lines,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        if args.follow {
            eprintln!("warning: --follow is ignored with --json");
        }
        return Ok(());
    }

    if lines.is_empty() {
        eprintln!("no log entries at {}", log_path.display());
        if !args.follow {
            return Ok(());
        }
    }
    for line in &lines {
        println!("{line}");
    }

    if args.follow {
        output::tail_file(&log_path).await?;
    }
    Ok(())
}

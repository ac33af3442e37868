// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `poltergeist status`: print one or all target states.
//!
//! State files are the source of truth; a running daemon only adds the
//! queue introspection line. The command works identically with the
//! daemon down.

use anyhow::Result;
use clap::Args;
use polter_core::TargetState;
use polter_state::StateStore;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::client::DaemonClient;
use crate::output;
use crate::project;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Show only this target
    pub target: Option<String>,

    /// Emit the raw state map as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn handle(args: StatusArgs, project_root: &Path) -> Result<()> {
    let config = project::load_config(project_root)?;
    let store = StateStore::open(project_root, None)?;

    let names: Vec<String> = match args.target {
        Some(ref name) => {
            project::find_target(&config, name)?;
            vec![name.clone()]
        }
        None => config.targets.iter().map(|t| t.name.clone()).collect(),
    };

    let states: Vec<(String, Option<TargetState>)> = names
        .iter()
        .map(|name| (name.clone(), store.read(name)))
        .collect();

    if args.json {
        let mut map = serde_json::Map::new();
        for (name, state) in &states {
            let value = match state {
                Some(state) => serde_json::to_value(state)?,
                None => serde_json::Value::Null,
            };
            map.insert(name.clone(), value);
        }
        println!("{}", serde_json::to_string_pretty(&serde_json::Value::Object(map))?);
        return Ok(());
    }

    let client = DaemonClient::for_project(project_root);
    match client.live_info() {
        Some(info) => {
            println!("daemon: running (pid {})", info.pid);
            // The version file sits next to the info record; a daemon left
            // over from an older install gets flagged here
            let running = std::fs::read_to_string(store.project_paths().daemon_version_file())
                .map(|v| v.trim().to_string())
                .ok()
                .filter(|v| !v.is_empty())
                .or(info.version);
            if let Some(running) = running {
                let current = polter_daemon::protocol::PROTOCOL_VERSION;
                if running != current {
                    println!("daemon version: {running} (outdated — current: {current})");
                }
            }
        }
        None => println!("daemon: not running"),
    }

    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;

    for (name, state) in &states {
        match state {
            Some(state) => println!("{}", output::format_status_line(state, now_ms)),
            None => println!("{name:<20} no state"),
        }
    }

    // Queue introspection only exists while a daemon runs
    if let Ok(snapshot) = client.queue().await {
        if !snapshot.running.is_empty() || !snapshot.queued.is_empty() {
            println!(
                "queue: {} running, {} queued",
                snapshot.running.len(),
                snapshot.queued.len()
            );
        }
    }

    Ok(())
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output helpers: log tailing and status formatting.

use anyhow::Result;
use polter_core::{format_elapsed_ms, BuildStatus, TargetState};
use std::path::Path;

/// Last `limit` lines of a file, or empty when it doesn't exist.
pub fn tail_lines(path: &Path, limit: usize) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(limit);
    lines[start..].iter().map(|l| l.to_string()).collect()
}

/// Tail a file, printing new lines as they appear. Returns on ctrl-c.
pub async fn tail_file(path: &Path) -> Result<()> {
    use notify::{Event, EventKind, RecursiveMode, Watcher};
    use std::io::{BufRead, BufReader, Seek, SeekFrom};

    let mut file = std::fs::File::open(path)
        .map_err(|_| anyhow::anyhow!("log file not found: {}", path.display()))?;
    // Seek to end - the caller already printed the tail
    file.seek(SeekFrom::End(0))?;
    let mut reader = BufReader::new(file);

    let (tx, mut rx) = tokio::sync::mpsc::channel(16);
    let path_buf = path.to_path_buf();

    let mut watcher = notify::recommended_watcher(move |res: Result<Event, _>| {
        if let Ok(event) = res {
            if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                let _ = tx.blocking_send(());
            }
        }
    })?;
    let watch_dir = path_buf.parent().unwrap_or(&path_buf);
    watcher.watch(watch_dir, RecursiveMode::NonRecursive)?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let mut line = String::new();
        while reader.read_line(&mut line)? > 0 {
            print!("{}", line);
            line.clear();
        }

        tokio::select! {
            _ = rx.recv() => {}
            _ = &mut ctrl_c => break,
        }
    }

    Ok(())
}

/// One status line for a target: name, status, age, duration, summary.
pub fn format_status_line(state: &TargetState, now_ms: u64) -> String {
    let status = state.last_build.status;
    let marker = match status {
        BuildStatus::Success => "ok",
        BuildStatus::Failure => "FAILED",
        BuildStatus::Building => "building",
        BuildStatus::Idle => "idle",
    };

    let age = if state.last_build.timestamp == 0 {
        "-".to_string()
    } else {
        format!(
            "{} ago",
            polter_core::time_fmt::format_elapsed(
                now_ms.saturating_sub(state.last_build.timestamp) / 1000
            )
        )
    };

    let duration = state
        .last_build
        .duration_ms
        .map(format_elapsed_ms)
        .unwrap_or_else(|| "-".to_string());

    let mut line = format!(
        "{:<20} {:<10} {:<12} {:<8} builds:{}",
        state.target, marker, age, duration, state.build_history.build_count
    );
    if status == BuildStatus::Failure {
        if let Some(ref summary) = state.last_build.error_summary {
            let first = summary.lines().next().unwrap_or_default();
            line.push_str(&format!("  {first}"));
        }
    }
    line
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment variable helpers for the daemon.

use std::time::Duration;

fn duration_ms(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Heartbeat tick interval, `POLTERGEIST_HEARTBEAT_MS` (default 10s).
pub fn heartbeat_interval() -> Duration {
    duration_ms("POLTERGEIST_HEARTBEAT_MS").unwrap_or(Duration::from_secs(10))
}

/// Grace period for in-flight builds at shutdown,
/// `POLTERGEIST_SHUTDOWN_GRACE_MS` (default 5s).
pub fn shutdown_grace() -> Duration {
    duration_ms("POLTERGEIST_SHUTDOWN_GRACE_MS").unwrap_or(Duration::from_secs(5))
}

/// Whether verbose daemon debugging was requested.
pub fn debug_daemon() -> bool {
    std::env::var("POLTERGEIST_DEBUG_DAEMON").map(|v| !v.is_empty()).unwrap_or(false)
}

/// Whether raw file-event input should be logged.
pub fn debug_input() -> bool {
    std::env::var("POLTERGEIST_DEBUG_INPUT").map(|v| !v.is_empty()).unwrap_or(false)
}

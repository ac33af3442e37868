// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment variable helpers for the CLI binaries.

use std::time::Duration;

/// Daemon startup handshake timeout, `POLTERGEIST_DAEMON_TIMEOUT`
/// (milliseconds, default 30000).
pub fn daemon_timeout() -> Duration {
    std::env::var("POLTERGEIST_DAEMON_TIMEOUT")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(30))
}

/// Explicit path to the `polterd` binary, `POLTERGEIST_DAEMON_BINARY`.
pub fn daemon_binary() -> Option<String> {
    std::env::var("POLTERGEIST_DAEMON_BINARY").ok().filter(|v| !v.is_empty())
}

/// Whether verbose clean-subsystem debugging was requested.
pub fn debug_clean() -> bool {
    std::env::var("POLTERGEIST_DEBUG_CLEAN").map(|v| !v.is_empty()).unwrap_or(false)
}

/// Poll interval for wait/freshness loops,
/// `POLTERGEIST_POLL_MS` (default 500ms; tests lower it).
pub fn poll_interval() -> Duration {
    std::env::var("POLTERGEIST_POLL_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(500))
}

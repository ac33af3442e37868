// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process liveness probing and termination.
//!
//! State records name their owner as (pid, hostname). A pid from another
//! host is conservatively treated as not-live: we can't probe it, and a
//! record owned elsewhere is never ours to wait on.

use std::process::Command;
use std::time::{Duration, Instant};

/// The local hostname, falling back to "localhost" when unavailable.
pub fn hostname() -> String {
    if let Ok(name) = std::env::var("HOSTNAME") {
        if !name.is_empty() {
            return name;
        }
    }
    Command::new("hostname")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Execute kill with the given signal and pid.
fn kill_signal(signal: &str, pid: u32) -> bool {
    Command::new("kill")
        .args([signal, &pid.to_string()])
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Null-signal probe for process existence on the local host.
pub fn is_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    kill_signal("-0", pid)
}

/// Liveness for a (pid, hostname) pair. Foreign hostnames are not-live.
pub fn is_alive_on(pid: u32, host: &str) -> bool {
    if host != hostname() {
        return false;
    }
    is_alive(pid)
}

/// Send SIGTERM, wait up to `timeout` for exit, then escalate to SIGKILL.
///
/// Returns true once the process is gone. With `graceful = false` the
/// SIGTERM phase is skipped.
pub fn terminate(pid: u32, graceful: bool, timeout: Duration) -> bool {
    if !is_alive(pid) {
        return true;
    }

    if graceful {
        kill_signal("-15", pid);
        if wait_for_exit(pid, timeout) {
            return true;
        }
    }

    kill_signal("-9", pid);
    wait_for_exit(pid, timeout)
}

/// Poll until the process exits or the timeout elapses.
pub fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    loop {
        if !is_alive(pid) {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;

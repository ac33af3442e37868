// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! App-bundle relaunch after successful builds.
//!
//! The quit/launch commands are host-specific; this module owns only the
//! throttle and the subprocess plumbing. Relaunch failures never affect
//! build status.

use polter_adapters::subprocess::{run_with_timeout, RELAUNCH_TIMEOUT};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Minimum spacing between relaunches of the same bundle.
pub const MIN_RELAUNCH_INTERVAL: Duration = Duration::from_secs(5);

/// Throttled relauncher for app-bundle targets.
pub struct Relauncher {
    min_interval: Duration,
    last_relaunch: HashMap<String, Instant>,
}

impl Relauncher {
    pub fn new() -> Self {
        Self::with_interval(MIN_RELAUNCH_INTERVAL)
    }

    pub fn with_interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_relaunch: HashMap::new(),
        }
    }

    /// Throttle decision: records the relaunch time when admitted.
    pub fn admit(&mut self, bundle_id: &str, now: Instant) -> bool {
        if let Some(last) = self.last_relaunch.get(bundle_id) {
            if now.duration_since(*last) < self.min_interval {
                return false;
            }
        }
        self.last_relaunch.insert(bundle_id.to_string(), now);
        true
    }

    /// Gracefully quit then launch the application, if the throttle admits.
    pub async fn relaunch(&mut self, bundle_id: &str, now: Instant) {
        if !self.admit(bundle_id, now) {
            debug!(bundle_id, "relaunch throttled");
            return;
        }
        quit_and_launch(bundle_id).await;
    }
}

/// Host-specific quit + launch commands, no throttle. Callers that can't
/// hold the throttle across an await point admit first, then spawn this.
pub async fn quit_and_launch(bundle_id: &str) {
    // Graceful quit; a bundle that isn't running just fails quietly
    let mut quit = Command::new("osascript");
    quit.args(["-e", &format!("tell application id \"{bundle_id}\" to quit")]);
    if let Err(e) = run_with_timeout(quit, RELAUNCH_TIMEOUT, "app quit").await {
        debug!(bundle_id, error = %e, "app quit skipped");
    }

    let mut launch = Command::new("open");
    launch.args(["-b", bundle_id]);
    match run_with_timeout(launch, RELAUNCH_TIMEOUT, "app launch").await {
        Ok(output) if output.status.success() => {
            debug!(bundle_id, "app relaunched");
        }
        Ok(output) => {
            warn!(bundle_id, code = ?output.status.code(), "app launch failed");
        }
        Err(e) => {
            warn!(bundle_id, error = %e, "app launch failed");
        }
    }
}

impl Default for Relauncher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "relaunch_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polling helpers over the state store.

use polter_core::BuildStatus;
use polter_state::StateStore;
use std::time::{Duration, Instant};

use crate::env;

/// Outcome of waiting on a target's build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The build reached a terminal status.
    Finished(BuildStatus),
    /// No record appeared for the target.
    NoState,
    /// Still building when the timeout elapsed.
    TimedOut,
}

/// Block until the target's current build completes (status leaves
/// `building`) or `timeout` elapses. A target that is not building
/// returns immediately with its last status.
pub async fn wait_for_build(store: &StateStore, target: &str, timeout: Duration) -> WaitOutcome {
    let deadline = Instant::now() + timeout;
    loop {
        match store.read(target) {
            None => return WaitOutcome::NoState,
            Some(state) => {
                let status = state.last_build.status;
                if status != BuildStatus::Building {
                    return WaitOutcome::Finished(status);
                }
                // A building claim from a dead owner will never finish
                if !store.owner_is_live(&state.process) {
                    return WaitOutcome::Finished(status);
                }
            }
        }
        if Instant::now() >= deadline {
            return WaitOutcome::TimedOut;
        }
        tokio::time::sleep(env::poll_interval()).await;
    }
}

#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;

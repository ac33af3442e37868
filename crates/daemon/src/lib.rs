// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! polter-daemon: the per-project Poltergeist daemon.
//!
//! Architecture:
//! - Listener task: Unix-socket I/O, posts commands into the engine loop
//! - Engine loop: one task owning the scheduler, multiplexing notifier
//!   batches, timers, build completions, and commands

pub mod env;
pub mod lifecycle;
pub mod listener;
pub mod protocol;
pub mod runtime;

pub use lifecycle::{startup, DaemonPaths, DaemonState, LifecycleError, StartupResult};
pub use protocol::{Request, Response, PROTOCOL_VERSION};
pub use runtime::{DaemonCommand, DaemonRuntime};

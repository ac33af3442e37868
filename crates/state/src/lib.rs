// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! polter-state: durable per-target state records.
//!
//! All cross-process coordination in Poltergeist goes through JSON documents
//! in one well-known directory: per-target `.state` files and a per-project
//! daemon info record. Writers replace files atomically (temp + rename), so
//! a concurrent reader always sees a complete document.

pub mod clean;
pub mod daemon_info;
pub mod paths;
pub mod process;
pub mod store;

pub use clean::{clean_stale_states, CleanOptions, CleanReport, CleanedFile};
pub use daemon_info::DaemonInfo;
pub use paths::{project_hash8, state_dir, ProjectPaths};
pub use store::{write_json_atomic, StateError, StateStore};

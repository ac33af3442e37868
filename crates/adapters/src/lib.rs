// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! polter-adapters: boundaries to the host system.
//!
//! The daemon core talks to the filesystem notifier and the desktop
//! notification sink only through the traits defined here, so tests swap in
//! fakes and the core never depends on a concrete backend.

pub mod alert;
pub mod subprocess;
pub mod watcher;

pub use alert::{AlertAdapter, AlertError, DesktopAlertAdapter, NoOpAlertAdapter};
pub use watcher::{
    ChangeKind, FsNotifier, Notifier, WatchBatch, WatchError, WatchEvent, WatchExpression,
};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use alert::{AlertCall, FakeAlertAdapter};
#[cfg(any(test, feature = "test-support"))]
pub use watcher::FakeNotifier;

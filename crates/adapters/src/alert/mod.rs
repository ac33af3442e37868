// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build alert adapters (desktop notification sink).

mod desktop;
mod noop;

pub use desktop::DesktopAlertAdapter;
pub use noop::NoOpAlertAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{AlertCall, FakeAlertAdapter};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from alert operations
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert failed: {0}")]
    SendFailed(String),
}

/// Output sink for build outcome alerts.
///
/// Fire-and-forget: the daemon logs failures and moves on; an alert never
/// affects build state.
#[async_trait]
pub trait AlertAdapter: Clone + Send + Sync + 'static {
    async fn alert(&self, title: &str, body: &str) -> Result<(), AlertError>;
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Abstract file-watch source.
//!
//! A notifier session watches project roots and fans observed changes out to
//! named subscriptions. Events per subscription arrive in the order the
//! backend emits them; batching is allowed, one-event-per-file-change is not
//! guaranteed.

mod expression;
mod fs;

pub use expression::WatchExpression;
pub use fs::FsNotifier;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeNotifier;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from watch operations
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("notifier session not connected")]
    NotConnected,

    #[error("cannot watch root {0}: {1}")]
    UnsupportedRoot(PathBuf, String),

    #[error("invalid watch pattern '{pattern}': {message}")]
    BadPattern { pattern: String, message: String },

    #[error("watch backend error: {0}")]
    Backend(String),
}

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
    Renamed,
    Other,
}

/// One observed filesystem change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// Absolute path of the changed file.
    pub path: PathBuf,
    /// Whether the path still exists; deletions report `false`.
    pub exists: bool,
    pub kind: ChangeKind,
}

/// A batch of events delivered to one subscription.
#[derive(Debug, Clone)]
pub struct WatchBatch {
    pub subscription: String,
    pub events: Vec<WatchEvent>,
}

/// Abstract file-watch session.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Establish the session. Must precede any other call.
    async fn connect(&self) -> Result<(), WatchError>;

    /// Register a project root for watching.
    async fn watch_project(&self, root: &Path) -> Result<(), WatchError>;

    /// Register a named subscription; matching batches go to `tx`.
    async fn subscribe(
        &self,
        name: &str,
        expression: WatchExpression,
        tx: mpsc::Sender<WatchBatch>,
    ) -> Result<(), WatchError>;

    /// Remove a subscription; unknown names are fine.
    async fn unsubscribe(&self, name: &str) -> Result<(), WatchError>;

    /// Tear the session down; all subscriptions end.
    async fn disconnect(&self) -> Result<(), WatchError>;
}

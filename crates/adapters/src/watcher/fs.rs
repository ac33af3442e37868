// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem notifier backed by the `notify` crate.
//!
//! One OS watcher per session; project roots are watched recursively and
//! events are fanned out to subscriptions on the notify callback thread via
//! `blocking_send`, preserving per-subscription delivery order.

use async_trait::async_trait;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{ChangeKind, Notifier, WatchBatch, WatchError, WatchEvent, WatchExpression};

struct Subscription {
    expression: WatchExpression,
    tx: mpsc::Sender<WatchBatch>,
}

#[derive(Default)]
struct Shared {
    subscriptions: HashMap<String, Subscription>,
}

/// `notify`-backed implementation of [`Notifier`].
pub struct FsNotifier {
    shared: Arc<Mutex<Shared>>,
    watcher: Mutex<Option<RecommendedWatcher>>,
    roots: Mutex<Vec<PathBuf>>,
}

impl FsNotifier {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared::default())),
            watcher: Mutex::new(None),
            roots: Mutex::new(Vec::new()),
        }
    }
}

impl Default for FsNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for FsNotifier {
    async fn connect(&self) -> Result<(), WatchError> {
        let shared = Arc::clone(&self.shared);
        let watcher =
            notify::recommended_watcher(move |result: Result<notify::Event, notify::Error>| {
                match result {
                    Ok(event) => dispatch(&shared, &event),
                    Err(e) => warn!(error = %e, "notify backend error"),
                }
            })
            .map_err(|e| WatchError::Backend(e.to_string()))?;

        *self.watcher.lock() = Some(watcher);
        Ok(())
    }

    async fn watch_project(&self, root: &Path) -> Result<(), WatchError> {
        let mut guard = self.watcher.lock();
        let watcher = guard.as_mut().ok_or(WatchError::NotConnected)?;
        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::UnsupportedRoot(root.to_path_buf(), e.to_string()))?;
        self.roots.lock().push(root.to_path_buf());
        debug!(root = %root.display(), "watching project root");
        Ok(())
    }

    async fn subscribe(
        &self,
        name: &str,
        expression: WatchExpression,
        tx: mpsc::Sender<WatchBatch>,
    ) -> Result<(), WatchError> {
        if self.watcher.lock().is_none() {
            return Err(WatchError::NotConnected);
        }
        self.shared
            .lock()
            .subscriptions
            .insert(name.to_string(), Subscription { expression, tx });
        Ok(())
    }

    async fn unsubscribe(&self, name: &str) -> Result<(), WatchError> {
        self.shared.lock().subscriptions.remove(name);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), WatchError> {
        let mut guard = self.watcher.lock();
        if let Some(mut watcher) = guard.take() {
            for root in self.roots.lock().drain(..) {
                let _ = watcher.unwatch(&root);
            }
        }
        self.shared.lock().subscriptions.clear();
        Ok(())
    }
}

/// Route one backend event to every matching subscription.
///
/// Runs on the notify callback thread; `blocking_send` applies backpressure
/// instead of dropping events when the daemon loop falls behind.
fn dispatch(shared: &Mutex<Shared>, event: &notify::Event) {
    let kind = map_kind(&event.kind);
    if matches!(event.kind, EventKind::Access(_)) {
        return;
    }

    // Collect matching (sender, batch) pairs under the lock, send outside it
    let mut deliveries: Vec<(mpsc::Sender<WatchBatch>, WatchBatch)> = Vec::new();
    {
        let guard = shared.lock();
        for (name, sub) in &guard.subscriptions {
            let events: Vec<WatchEvent> = event
                .paths
                .iter()
                .filter(|p| sub.expression.matches(p))
                .map(|p| WatchEvent {
                    path: p.clone(),
                    exists: kind != ChangeKind::Removed && p.exists(),
                    kind,
                })
                .collect();
            if !events.is_empty() {
                deliveries.push((
                    sub.tx.clone(),
                    WatchBatch {
                        subscription: name.clone(),
                        events,
                    },
                ));
            }
        }
    }

    for (tx, batch) in deliveries {
        if tx.blocking_send(batch).is_err() {
            debug!("subscription receiver dropped, batch discarded");
        }
    }
}

fn map_kind(kind: &EventKind) -> ChangeKind {
    match kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Modify(notify::event::ModifyKind::Name(_)) => ChangeKind::Renamed,
        EventKind::Modify(_) => ChangeKind::Modified,
        EventKind::Remove(_) => ChangeKind::Removed,
        _ => ChangeKind::Other,
    }
}

#[cfg(test)]
#[path = "fs_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory notifier for tests: batches are injected by the test body.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{ChangeKind, Notifier, WatchBatch, WatchError, WatchEvent, WatchExpression};

#[derive(Default)]
struct FakeState {
    connected: bool,
    roots: Vec<PathBuf>,
    subscriptions: HashMap<String, (WatchExpression, mpsc::Sender<WatchBatch>)>,
}

/// Scriptable [`Notifier`] that delivers exactly the batches tests emit.
#[derive(Clone, Default)]
pub struct FakeNotifier {
    state: Arc<Mutex<FakeState>>,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    pub fn watched_roots(&self) -> Vec<PathBuf> {
        self.state.lock().roots.clone()
    }

    pub fn subscription_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.lock().subscriptions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Deliver a batch to one named subscription.
    pub async fn emit(&self, subscription: &str, events: Vec<WatchEvent>) {
        let tx = self
            .state
            .lock()
            .subscriptions
            .get(subscription)
            .map(|(_, tx)| tx.clone());
        if let Some(tx) = tx {
            let _ = tx
                .send(WatchBatch {
                    subscription: subscription.to_string(),
                    events,
                })
                .await;
        }
    }

    /// Deliver a modify event for `path` to every subscription whose
    /// expression matches, mirroring the real fan-out.
    pub async fn touch(&self, path: &Path) {
        let txs: Vec<(String, mpsc::Sender<WatchBatch>)> = {
            let state = self.state.lock();
            state
                .subscriptions
                .iter()
                .filter(|(_, (expr, _))| expr.matches(path))
                .map(|(name, (_, tx))| (name.clone(), tx.clone()))
                .collect()
        };
        for (subscription, tx) in txs {
            let _ = tx
                .send(WatchBatch {
                    subscription,
                    events: vec![WatchEvent {
                        path: path.to_path_buf(),
                        exists: true,
                        kind: ChangeKind::Modified,
                    }],
                })
                .await;
        }
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn connect(&self) -> Result<(), WatchError> {
        self.state.lock().connected = true;
        Ok(())
    }

    async fn watch_project(&self, root: &Path) -> Result<(), WatchError> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(WatchError::NotConnected);
        }
        state.roots.push(root.to_path_buf());
        Ok(())
    }

    async fn subscribe(
        &self,
        name: &str,
        expression: WatchExpression,
        tx: mpsc::Sender<WatchBatch>,
    ) -> Result<(), WatchError> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(WatchError::NotConnected);
        }
        state
            .subscriptions
            .insert(name.to_string(), (expression, tx));
        Ok(())
    }

    async fn unsubscribe(&self, name: &str) -> Result<(), WatchError> {
        self.state.lock().subscriptions.remove(name);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), WatchError> {
        let mut state = self.state.lock();
        state.connected = false;
        state.subscriptions.clear();
        state.roots.clear();
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;

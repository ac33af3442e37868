// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recording alert adapter for tests.

use super::{AlertAdapter, AlertError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// One recorded alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertCall {
    pub title: String,
    pub body: String,
}

#[derive(Clone, Default)]
pub struct FakeAlertAdapter {
    calls: Arc<Mutex<Vec<AlertCall>>>,
}

impl FakeAlertAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<AlertCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl AlertAdapter for FakeAlertAdapter {
    async fn alert(&self, title: &str, body: &str) -> Result<(), AlertError> {
        self.calls.lock().push(AlertCall {
            title: title.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

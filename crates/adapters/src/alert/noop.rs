// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op alert adapter for headless runs and `notifications: false`.

use super::{AlertAdapter, AlertError};
use async_trait::async_trait;

#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpAlertAdapter;

impl NoOpAlertAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AlertAdapter for NoOpAlertAdapter {
    async fn alert(&self, _title: &str, _body: &str) -> Result<(), AlertError> {
        Ok(())
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desktop alert adapter using notify-rust.

use super::{AlertAdapter, AlertError};
use async_trait::async_trait;

#[derive(Clone, Copy, Debug, Default)]
pub struct DesktopAlertAdapter;

impl DesktopAlertAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AlertAdapter for DesktopAlertAdapter {
    async fn alert(&self, title: &str, body: &str) -> Result<(), AlertError> {
        let title = title.to_string();
        let body = body.to_string();
        // Notification::show() blocks on some platforms; run it on the
        // bounded blocking pool and don't wait for the result.
        tokio::task::spawn_blocking(move || {
            match notify_rust::Notification::new()
                .summary(&title)
                .body(&body)
                .appname("Poltergeist")
                .show()
            {
                Ok(_) => tracing::debug!(%title, "desktop alert sent"),
                Err(e) => tracing::warn!(%title, error = %e, "desktop alert failed"),
            }
        });
        Ok(())
    }
}

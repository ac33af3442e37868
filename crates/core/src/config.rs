// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project configuration as the core consumes it.
//!
//! Schema validation beyond serde typing happens upstream; the daemon and
//! CLI receive this already-parsed object. The only checks here are the
//! structural ones a parsed object can still violate (duplicate names,
//! empty target list).

use crate::target::Target;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Default number of concurrently running builds.
pub const DEFAULT_PARALLELIZATION: usize = 2;

/// Soft build timeout = average duration × this multiplier.
pub const DEFAULT_BUILD_TIMEOUT_MULTIPLIER: f64 = 3.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config declares no targets")]
    NoTargets,

    #[error("duplicate target name: {0}")]
    DuplicateTarget(String),
}

/// Parsed `poltergeist.config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoltergeistConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    pub targets: Vec<Target>,
    /// Max concurrent builds; defaults to [`DEFAULT_PARALLELIZATION`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallelization: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_timeout_multiplier: Option<f64>,
    /// Desktop build alerts on/off (default on).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<bool>,
}

impl PoltergeistConfig {
    /// Parse a config document from JSON text and check structure.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        let mut seen = HashSet::new();
        for target in &self.targets {
            if !seen.insert(target.name.as_str()) {
                return Err(ConfigError::DuplicateTarget(target.name.clone()));
            }
        }
        Ok(())
    }

    pub fn parallelization(&self) -> usize {
        self.parallelization.unwrap_or(DEFAULT_PARALLELIZATION).max(1)
    }

    pub fn build_timeout_multiplier(&self) -> f64 {
        self.build_timeout_multiplier
            .unwrap_or(DEFAULT_BUILD_TIMEOUT_MULTIPLIER)
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications.unwrap_or(true)
    }

    /// Targets with `enabled = true`, in declaration order.
    pub fn enabled_targets(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter().filter(|t| t.enabled)
    }

    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

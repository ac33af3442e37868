// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Target configuration model.
//!
//! A target is a named build output: one build command, a set of watched
//! path patterns, and scheduling knobs. Targets arrive already parsed and
//! validated from the project's `poltergeist.config.json`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default quiet period after the last change before a build dispatches.
pub const DEFAULT_SETTLING_DELAY_MS: u64 = 1000;

/// Default backoff multiplier for failed-build retries.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Kind of build output a target produces.
///
/// The builder dispatches on this tag; each kind contributes only its
/// specializations (artifact check, relaunch, bundle validation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    Executable,
    AppBundle,
    Library,
    Framework,
    Test,
    DockerImage,
    CmakeExecutable,
    CmakeLibrary,
    CmakeCustom,
    Custom,
}

impl TargetKind {
    /// Whether a successful exit additionally requires the declared output
    /// artifact to exist on disk.
    pub fn checks_artifact(&self) -> bool {
        !matches!(self, TargetKind::Test)
    }

    /// Short tag recorded in state documents (`lastBuild.builder`).
    pub fn builder_tag(&self) -> &'static str {
        match self {
            TargetKind::Executable => "executable",
            TargetKind::AppBundle => "app-bundle",
            TargetKind::Library => "library",
            TargetKind::Framework => "framework",
            TargetKind::Test => "test",
            TargetKind::DockerImage => "docker-image",
            TargetKind::CmakeExecutable => "cmake-executable",
            TargetKind::CmakeLibrary => "cmake-library",
            TargetKind::CmakeCustom => "cmake-custom",
            TargetKind::Custom => "custom",
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.builder_tag())
    }
}

/// When a post-build hook runs relative to the build outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookCondition {
    Success,
    Failure,
    #[default]
    Always,
}

impl HookCondition {
    /// Whether the condition matches a build that succeeded (`true`) or
    /// failed (`false`).
    pub fn matches(&self, build_succeeded: bool) -> bool {
        match self {
            HookCondition::Success => build_succeeded,
            HookCondition::Failure => !build_succeeded,
            HookCondition::Always => true,
        }
    }
}

/// A post-build hook: an opaque command run after a build completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostBuildHook {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub run_on: HookCondition,
    /// Captured output lines kept in the state record.
    #[serde(default = "default_hook_max_lines")]
    pub max_lines: usize,
    /// Hard timeout; the hook is killed when it elapses.
    #[serde(default = "default_hook_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_hook_max_lines() -> usize {
    20
}

fn default_hook_timeout_ms() -> u64 {
    30_000
}

impl PostBuildHook {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// One declared build target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// Unique name within the project.
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TargetKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Opaque shell command; never interpreted beyond exit code and an
    /// error-summary scan of its output.
    pub build_command: String,
    /// Expected artifact, relative to the project root unless absolute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Glob-like patterns relative to the project root.
    pub watch_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settling_delay_ms: Option<u64>,
    /// Accepted alias for `settlingDelayMs`; same meaning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_multiplier: Option<f64>,
    /// Extra environment for the build command and its hooks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<HashMap<String, String>>,
    /// App bundle identifier (app-bundle targets only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<PathBuf>,
    /// Logical grouping label; informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_build: Option<Vec<PostBuildHook>>,
}

fn default_true() -> bool {
    true
}

impl Target {
    /// Quiet period after the last change before a build dispatches.
    ///
    /// `settlingDelayMs` wins over the `debounceIntervalMs` alias.
    pub fn settling_delay(&self) -> Duration {
        let ms = self
            .settling_delay_ms
            .or(self.debounce_interval_ms)
            .unwrap_or(DEFAULT_SETTLING_DELAY_MS);
        Duration::from_millis(ms)
    }

    /// Retry budget after a failed build (0 = no retries).
    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(0)
    }

    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier.unwrap_or(DEFAULT_BACKOFF_MULTIPLIER)
    }

    /// Hooks declared for this target, empty slice when none.
    pub fn hooks(&self) -> &[PostBuildHook] {
        self.post_build.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "target_tests.rs"]
mod tests;

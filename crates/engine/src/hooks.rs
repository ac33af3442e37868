// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Post-build hook execution.
//!
//! Hooks run the declared command in a subshell with result-signaling
//! variables in the environment. Output is either free-form text or a
//! structured JSON object; either way the recorded lines are truncated.
//! Hook failures and timeouts are recorded, never propagated to the
//! build's own status.

use polter_core::{PostBuildHook, PostBuildResult};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Hooks running concurrently across all targets.
const HOOK_PARALLELISM: usize = 4;

/// Inputs a hook command receives about the build it follows.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub target: String,
    pub project_root: PathBuf,
    pub build_succeeded: bool,
    pub exit_code: Option<i32>,
    /// Tail of the build's stderr, newline-joined.
    pub stderr_tail: String,
    /// Extra environment inherited from the target.
    pub env: Vec<(String, String)>,
}

/// Structured hook output, when the hook prints JSON.
#[derive(Debug, Deserialize)]
struct StructuredHookOutput {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    lines: Vec<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Runs hooks serialized per target, bounded overall.
#[derive(Clone)]
pub struct HookRunner {
    semaphore: Arc<Semaphore>,
}

impl HookRunner {
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(HOOK_PARALLELISM)),
        }
    }

    /// Run every hook whose condition matches, in declaration order.
    /// Returns the recorded results, one per executed hook.
    pub async fn run_matching(
        &self,
        hooks: &[PostBuildHook],
        context: &HookContext,
    ) -> Vec<PostBuildResult> {
        let mut results = Vec::new();
        for hook in hooks {
            if !hook.run_on.matches(context.build_succeeded) {
                continue;
            }
            let permit = self.semaphore.acquire().await;
            let result = run_hook(hook, context).await;
            drop(permit);
            results.push(result);
        }
        results
    }
}

impl Default for HookRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one hook to completion (or its hard timeout).
pub async fn run_hook(hook: &PostBuildHook, context: &HookContext) -> PostBuildResult {
    let started = Instant::now();
    debug!(target = %context.target, hook = %hook.name, "running post-build hook");

    let mut command = Command::new("sh");
    command
        .arg("-c")
        .arg(&hook.command)
        .current_dir(&context.project_root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .envs(context.env.iter().cloned())
        .env("POLTERGEIST_TARGET", &context.target)
        .env(
            "POLTERGEIST_BUILD_STATUS",
            if context.build_succeeded { "success" } else { "failure" },
        )
        .env(
            "POLTERGEIST_EXIT_CODE",
            context.exit_code.map(|c| c.to_string()).unwrap_or_default(),
        )
        .env("POLTERGEIST_STDERR_TAIL", &context.stderr_tail);

    let output = tokio::time::timeout(hook.timeout(), command.output()).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    match output {
        Ok(Ok(output)) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let mut result = parse_hook_output(&stdout, hook.max_lines);
            result.name = hook.name.clone();
            result.duration_ms = Some(duration_ms);
            result.exit_code = output.status.code();
            if result.status.is_empty() {
                result.status = if output.status.success() {
                    "success".to_string()
                } else {
                    "failure".to_string()
                };
            }
            result
        }
        Ok(Err(e)) => {
            warn!(hook = %hook.name, error = %e, "hook failed to spawn");
            PostBuildResult {
                name: hook.name.clone(),
                status: "failure".to_string(),
                summary: Some(format!("failed to run: {e}")),
                lines: Vec::new(),
                duration_ms: Some(duration_ms),
                exit_code: None,
            }
        }
        Err(_elapsed) => {
            warn!(hook = %hook.name, timeout_ms = hook.timeout_ms, "hook timed out");
            PostBuildResult {
                name: hook.name.clone(),
                status: "timeout".to_string(),
                summary: Some(format!("timed out after {}ms", hook.timeout_ms)),
                lines: Vec::new(),
                duration_ms: Some(duration_ms),
                exit_code: None,
            }
        }
    }
}

/// Interpret hook stdout: a JSON object `{summary, lines, status}` when it
/// parses, free-form text otherwise (first line becomes the summary).
fn parse_hook_output(stdout: &str, max_lines: usize) -> PostBuildResult {
    let trimmed = stdout.trim();

    if trimmed.starts_with('{') {
        if let Ok(structured) = serde_json::from_str::<StructuredHookOutput>(trimmed) {
            let mut lines = structured.lines;
            lines.truncate(max_lines);
            return PostBuildResult {
                name: String::new(),
                status: structured.status.unwrap_or_default(),
                summary: structured.summary,
                lines,
                duration_ms: None,
                exit_code: None,
            };
        }
    }

    let mut lines: Vec<String> = trimmed.lines().map(|l| l.to_string()).collect();
    let summary = lines.first().cloned();
    lines.truncate(max_lines);
    PostBuildResult {
        name: String::new(),
        status: String::new(),
        summary,
        lines,
        duration_ms: None,
        exit_code: None,
    }
}

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;

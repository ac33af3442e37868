// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs one target's build command and classifies the result.
//!
//! The build command is an opaque shell line. Output streams to the
//! per-target log file (and optionally the parent's terminal) while a
//! bounded tail stays in memory for the error summary and error context.

use polter_core::{BuildErrorContext, BuildRecord, BuildStatus, Target, TargetKind};
use std::collections::VecDeque;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::summary;
use crate::vcs;

/// Lines of output tail kept per stream.
const TAIL_CAPACITY: usize = 100;

/// Grace period between SIGKILL-on-cancel and giving up on the child.
const CANCEL_REAP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("target '{target}' is locked by a running build")]
    Locked { target: String },

    #[error("state error: {0}")]
    State(#[from] polter_state::StateError),

    #[error("failed to spawn build command: {0}")]
    Spawn(std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Options for one build invocation.
#[derive(Default)]
pub struct BuildOptions {
    /// Append captured output to this file.
    pub log_file: Option<PathBuf>,
    /// Also echo output to the parent's stdout/stderr.
    pub passthrough: bool,
    /// Extra environment on top of the target's declared environment.
    pub env: Vec<(String, String)>,
    /// Signaled to stop the build; the child process tree is killed.
    pub cancel: Option<Arc<Notify>>,
}

/// Result of one build invocation, ready for the state store.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub record: BuildRecord,
    /// Present on failure; bounded output tails for diagnostics.
    pub error_context: Option<BuildErrorContext>,
}

impl BuildOutcome {
    pub fn succeeded(&self) -> bool {
        self.record.status == BuildStatus::Success
    }
}

/// Builder for one target. Dispatches on the target kind tag for the
/// per-kind specializations (artifact check, test semantics).
pub struct Builder {
    target: Target,
    project_root: PathBuf,
}

impl Builder {
    pub fn new(target: Target, project_root: &Path) -> Self {
        Self {
            target,
            project_root: project_root.to_path_buf(),
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Human-readable identifier of the builder variant.
    pub fn describe(&self) -> String {
        format!("{} builder for '{}'", self.target.kind, self.target.name)
    }

    /// Check a target's declared prerequisites.
    pub fn validate(target: &Target) -> Result<(), BuildError> {
        let invalid = |reason: &str| BuildError::InvalidTarget {
            target: target.name.clone(),
            reason: reason.to_string(),
        };

        if target.build_command.trim().is_empty() {
            return Err(invalid("build command is empty"));
        }
        if target.watch_paths.is_empty() {
            return Err(invalid("no watch paths declared"));
        }
        if target.kind == TargetKind::AppBundle && target.bundle_id.is_none() {
            return Err(invalid("app-bundle target requires a bundle id"));
        }
        Ok(())
    }

    /// Run the build command once and classify the outcome.
    ///
    /// Never touches the state store; callers own the `building` →
    /// terminal-status transitions around this call.
    pub async fn run(&self, triggering_files: &[PathBuf], options: &BuildOptions) -> BuildOutcome {
        let started_at_ms = epoch_ms();
        let started = Instant::now();
        let git_hash = vcs::head_revision(&self.project_root).await;

        let log = options.log_file.as_deref().and_then(open_log);
        if let Some(ref log) = log {
            let trigger = if triggering_files.is_empty() {
                "manual".to_string()
            } else {
                format!("{} changed file(s)", triggering_files.len())
            };
            log.write_line(&format!(
                "=== {} build: {} ({trigger}) ===",
                self.target.name, self.target.build_command
            ));
        }

        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(&self.target.build_command)
            .current_dir(&self.project_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref env) = self.target.environment {
            command.envs(env);
        }
        command.envs(options.env.iter().cloned());

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return self.finish(
                    started_at_ms,
                    started,
                    git_hash,
                    None,
                    Tail::default(),
                    Tail::default(),
                    Some(format!("failed to spawn build command: {e}")),
                )
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_task = spawn_capture(stdout, log.clone(), options.passthrough, false);
        let stderr_task = spawn_capture(stderr, log.clone(), options.passthrough, true);

        let exit_status = match options.cancel {
            Some(ref cancel) => {
                tokio::select! {
                    status = child.wait() => status.ok(),
                    _ = cancel.notified() => {
                        debug!(target = %self.target.name, "build canceled, killing child");
                        let _ = child.start_kill();
                        tokio::time::timeout(CANCEL_REAP_TIMEOUT, child.wait())
                            .await
                            .ok()
                            .and_then(Result::ok)
                    }
                }
            }
            None => child.wait().await.ok(),
        };

        let stdout_tail = stdout_task.await.unwrap_or_default();
        let stderr_tail = stderr_task.await.unwrap_or_default();
        let exit_code = exit_status.and_then(|s| s.code());

        self.finish(
            started_at_ms,
            started,
            git_hash,
            exit_code,
            stdout_tail,
            stderr_tail,
            None,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        started_at_ms: u64,
        started: Instant,
        git_hash: Option<String>,
        exit_code: Option<i32>,
        stdout_tail: Tail,
        stderr_tail: Tail,
        spawn_error: Option<String>,
    ) -> BuildOutcome {
        let duration_ms = started.elapsed().as_millis() as u64;

        let artifact_missing = exit_code == Some(0) && !self.artifact_present();
        let succeeded = exit_code == Some(0) && !artifact_missing && spawn_error.is_none();

        let error_summary = if succeeded {
            None
        } else if let Some(message) = spawn_error {
            Some(message)
        } else if artifact_missing {
            self.target.output_path.as_ref().map(|p| {
                format!("build succeeded but expected output is missing: {}", p.display())
            })
        } else {
            let mut combined: Vec<String> = stdout_tail.lines.iter().cloned().collect();
            combined.extend(stderr_tail.lines.iter().cloned());
            summary::extract_summary(&combined).or_else(|| {
                Some(match exit_code {
                    Some(code) => format!("build exited with code {code}"),
                    None => "build terminated by signal".to_string(),
                })
            })
        };

        let record = BuildRecord {
            status: if succeeded {
                BuildStatus::Success
            } else {
                BuildStatus::Failure
            },
            timestamp: started_at_ms,
            duration_ms: Some(duration_ms),
            exit_code,
            error_summary,
            git_hash,
            builder: Some(self.target.kind.builder_tag().to_string()),
        };

        let error_context = (!succeeded).then(|| BuildErrorContext {
            exit_code: exit_code.unwrap_or(-1),
            command: self.target.build_command.clone(),
            stdout_tail: stdout_tail.lines.into(),
            stderr_tail: stderr_tail.lines.into(),
            timestamp: epoch_ms(),
        });

        BuildOutcome {
            record,
            error_context,
        }
    }

    /// Per-kind artifact check: test targets never check; others only when
    /// an output path is declared.
    fn artifact_present(&self) -> bool {
        if !self.target.kind.checks_artifact() {
            return true;
        }
        match self.target.output_path {
            Some(ref path) => {
                let resolved = if path.is_absolute() {
                    path.clone()
                } else {
                    self.project_root.join(path)
                };
                resolved.exists()
            }
            None => true,
        }
    }
}

/// Bounded output tail for one stream.
#[derive(Debug, Default)]
struct Tail {
    lines: VecDeque<String>,
}

impl Tail {
    fn push(&mut self, line: String) {
        if self.lines.len() >= TAIL_CAPACITY {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }
}

/// Shared append-only log sink.
#[derive(Clone)]
struct LogSink {
    file: Arc<parking_lot::Mutex<std::fs::File>>,
}

impl LogSink {
    fn write_line(&self, line: &str) {
        let mut file = self.file.lock();
        let _ = writeln!(file, "{line}");
    }
}

fn open_log(path: &Path) -> Option<LogSink> {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match std::fs::OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(LogSink {
            file: Arc::new(parking_lot::Mutex::new(file)),
        }),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot open build log");
            None
        }
    }
}

/// Drain one child stream into the tail buffer, the log file, and
/// (optionally) the parent's terminal.
fn spawn_capture<R>(
    stream: Option<R>,
    log: Option<LogSink>,
    passthrough: bool,
    is_stderr: bool,
) -> tokio::task::JoinHandle<Tail>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut tail = Tail::default();
        let Some(stream) = stream else {
            return tail;
        };
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(ref log) = log {
                log.write_line(&line);
            }
            if passthrough {
                if is_stderr {
                    eprintln!("{line}");
                } else {
                    println!("{line}");
                }
            }
            tail.push(line);
        }
        tail
    })
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic, durable persistence of per-target state.
//!
//! Writers serialize within one process on a per-target mutex; across
//! processes, correctness comes from atomic rename. The lock protocol is
//! derived, not a separate file: a record with `lastBuild.status = building`
//! whose owning (pid, hostname) is live on this host counts as locked.

use parking_lot::Mutex;
use polter_core::{
    AppInfo, BuildErrorContext, BuildRecord, PostBuildResult, ProcessInfo, Target, TargetKind,
    TargetState, HEARTBEAT_STALENESS_MS, STATE_VERSION,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::warn;

use crate::paths::{list_state_files, ProjectPaths};
use crate::process;

/// Attempts before a failing read gives up and reports "no record".
const READ_RETRIES: u32 = 3;

/// Lines of stdout/stderr tail kept in the error context.
const MAX_TAIL_LINES: usize = 20;

/// Longest line kept in the error context tail.
const MAX_TAIL_LINE_LEN: usize = 400;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("target '{target}' is owned by a live daemon (pid {pid} on {hostname})")]
    AlreadyOwned {
        target: String,
        pid: u32,
        hostname: String,
    },

    #[error("no state record for target '{0}'")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Handle to the state directory scoped to one project.
#[derive(Debug)]
pub struct StateStore {
    paths: ProjectPaths,
    project_path: PathBuf,
    project_name: String,
    config_path: Option<PathBuf>,
    staleness_ms: u64,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    // Corrupt records are logged once per file, then treated as absent
    warned_corrupt: Mutex<HashSet<String>>,
}

impl StateStore {
    /// Open the ambient state directory (env override honored) for a project.
    pub fn open(project_path: &Path, config_path: Option<&Path>) -> Result<Self, StateError> {
        Self::open_at(crate::paths::state_dir(), project_path, config_path)
    }

    /// Open an explicit state directory, creating it if needed.
    pub fn open_at(
        state_dir: PathBuf,
        project_path: &Path,
        config_path: Option<&Path>,
    ) -> Result<Self, StateError> {
        let paths = ProjectPaths::new(state_dir, project_path);
        fs::create_dir_all(paths.dir())?;

        let project_name = project_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "project".to_string());

        Ok(Self {
            paths,
            project_path: project_path.to_path_buf(),
            project_name,
            config_path: config_path.map(Path::to_path_buf),
            staleness_ms: HEARTBEAT_STALENESS_MS,
            locks: Mutex::new(HashMap::new()),
            warned_corrupt: Mutex::new(HashSet::new()),
        })
    }

    /// Override the heartbeat staleness window (tests).
    pub fn with_staleness(mut self, window: Duration) -> Self {
        self.staleness_ms = window.as_millis() as u64;
        self
    }

    pub fn project_paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }

    fn now_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn lock_for(&self, target: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(
            locks
                .entry(target.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Claim (create or overwrite) the record for `target` with a fresh
    /// process block and `lastBuild.status = idle`.
    ///
    /// Build history, app info, and unknown fields from a prior record
    /// survive the claim. Fails with [`StateError::AlreadyOwned`] when a
    /// different live daemon on this host holds the record.
    pub fn init(&self, target: &Target) -> Result<TargetState, StateError> {
        let guard = self.lock_for(&target.name);
        let _guard = guard.lock();

        let prior = self.read_unlocked(&target.name);
        if let Some(ref existing) = prior {
            let owner = &existing.process;
            if owner.active && owner.pid != std::process::id() && self.owner_is_live(owner) {
                return Err(StateError::AlreadyOwned {
                    target: target.name.clone(),
                    pid: owner.pid,
                    hostname: owner.hostname.clone(),
                });
            }
        }

        let now = Self::now_ms();
        let state = TargetState {
            version: STATE_VERSION.to_string(),
            project_path: self.project_path.clone(),
            project_name: self.project_name.clone(),
            target: target.name.clone(),
            target_type: target.kind,
            config_path: self.config_path.clone(),
            process: ProcessInfo {
                pid: std::process::id(),
                hostname: process::hostname(),
                platform: std::env::consts::OS.to_string(),
                start_time: now,
                last_heartbeat: now,
                active: true,
            },
            last_build: BuildRecord::default(),
            build_history: prior
                .as_ref()
                .map(|p| p.build_history.clone())
                .unwrap_or_default(),
            app_info: app_info_for(target),
            last_build_error: prior.as_ref().and_then(|p| p.last_build_error.clone()),
            post_build: Vec::new(),
            extra: prior.map(|p| p.extra).unwrap_or_default(),
        };

        self.write_unlocked(&target.name, &state)?;
        Ok(state)
    }

    /// Read a target's record. Missing files and (after bounded retries)
    /// malformed JSON both read as `None`.
    pub fn read(&self, target: &str) -> Option<TargetState> {
        let guard = self.lock_for(target);
        let _guard = guard.lock();
        self.read_unlocked(target)
    }

    fn read_unlocked(&self, target: &str) -> Option<TargetState> {
        let path = self.paths.state_file(target);
        for attempt in 0..READ_RETRIES {
            let file = match File::open(&path) {
                Ok(f) => f,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
                Err(e) => {
                    warn!(target = %target, error = %e, "failed to open state file");
                    return None;
                }
            };
            match serde_json::from_reader(BufReader::new(file)) {
                Ok(state) => return Some(state),
                Err(e) => {
                    if attempt + 1 < READ_RETRIES {
                        std::thread::sleep(Duration::from_millis(10));
                        continue;
                    }
                    let mut warned = self.warned_corrupt.lock();
                    if warned.insert(target.to_string()) {
                        warn!(target = %target, error = %e, "corrupt state file, treating as absent");
                    }
                    return None;
                }
            }
        }
        None
    }

    /// Merge a shallow JSON patch into the record atomically.
    ///
    /// A concurrent reader observes either the complete old or the complete
    /// new document, never a mixture.
    pub fn update(
        &self,
        target: &str,
        patch: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), StateError> {
        let guard = self.lock_for(target);
        let _guard = guard.lock();

        let path = self.paths.state_file(target);
        let current = match File::open(&path) {
            Ok(f) => serde_json::from_reader::<_, serde_json::Value>(BufReader::new(f))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StateError::NotFound(target.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let mut merged = match current {
            serde_json::Value::Object(map) => map,
            _ => return Err(StateError::NotFound(target.to_string())),
        };
        for (key, value) in patch {
            merged.insert(key, value);
        }

        write_json_atomic(&path, &serde_json::Value::Object(merged))?;
        Ok(())
    }

    /// Read-modify-write with the typed document.
    pub fn update_with(
        &self,
        target: &str,
        mutate: impl FnOnce(&mut TargetState),
    ) -> Result<TargetState, StateError> {
        let guard = self.lock_for(target);
        let _guard = guard.lock();

        let mut state = self
            .read_unlocked(target)
            .ok_or_else(|| StateError::NotFound(target.to_string()))?;
        mutate(&mut state);
        self.write_unlocked(target, &state)?;
        Ok(state)
    }

    /// Fold a build transition into `lastBuild` and `buildHistory`.
    pub fn update_build_status(
        &self,
        target: &str,
        record: BuildRecord,
    ) -> Result<TargetState, StateError> {
        self.update_with(target, |state| state.apply_build(record))
    }

    /// Record the bounded error context of a failed build.
    pub fn update_build_error(
        &self,
        target: &str,
        mut context: BuildErrorContext,
    ) -> Result<(), StateError> {
        bound_tail(&mut context.stdout_tail);
        bound_tail(&mut context.stderr_tail);
        self.update_with(target, |state| state.last_build_error = Some(context))?;
        Ok(())
    }

    /// Upsert one hook result into the `postBuild` list.
    pub fn update_post_build_result(
        &self,
        target: &str,
        result: PostBuildResult,
    ) -> Result<(), StateError> {
        self.update_with(target, |state| {
            match state.post_build.iter_mut().find(|r| r.name == result.name) {
                Some(slot) => *slot = result,
                None => state.post_build.push(result),
            }
        })?;
        Ok(())
    }

    /// Refresh the owner heartbeat.
    pub fn heartbeat(&self, target: &str) -> Result<(), StateError> {
        let now = Self::now_ms();
        self.update_with(target, |state| {
            state.process.last_heartbeat = now;
            state.process.active = true;
        })?;
        Ok(())
    }

    /// Flag the record as released by its owner (daemon shutdown).
    pub fn mark_inactive(&self, target: &str) -> Result<(), StateError> {
        self.update_with(target, |state| state.process.active = false)?;
        Ok(())
    }

    /// Delete the record; missing files are fine.
    pub fn remove(&self, target: &str) -> Result<(), StateError> {
        let guard = self.lock_for(target);
        let _guard = guard.lock();
        match fs::remove_file(self.paths.state_file(target)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Every `*.state` file name in the state directory, all projects.
    pub fn list_all(&self) -> Vec<String> {
        list_state_files(self.paths.dir())
    }

    /// Whether a live build lock is held for `target` on this host.
    pub fn is_locked(&self, target: &str) -> bool {
        match self.read(target) {
            Some(state) => state.claims_building() && self.owner_is_live(&state.process),
            None => false,
        }
    }

    /// Whether the recorded owner is a live daemon on this host: active
    /// flag set, heartbeat within the staleness window, pid answering a
    /// null-signal probe under our hostname.
    pub fn owner_is_live(&self, owner: &ProcessInfo) -> bool {
        owner.active
            && owner.heartbeat_fresh(Self::now_ms(), self.staleness_ms)
            && process::is_alive_on(owner.pid, &owner.hostname)
    }

    fn write_unlocked(&self, target: &str, state: &TargetState) -> Result<(), StateError> {
        write_json_atomic(&self.paths.state_file(target), state)
    }
}

/// Derive the state document's app info from an app-bundle target.
fn app_info_for(target: &Target) -> Option<AppInfo> {
    if target.kind != TargetKind::AppBundle {
        return None;
    }
    target.bundle_id.as_ref().map(|bundle_id| AppInfo {
        bundle_id: bundle_id.clone(),
        output_path: target.output_path.clone(),
        icon_path: target.icon.clone(),
    })
}

fn bound_tail(lines: &mut Vec<String>) {
    if lines.len() > MAX_TAIL_LINES {
        lines.drain(..lines.len() - MAX_TAIL_LINES);
    }
    for line in lines.iter_mut() {
        if line.len() > MAX_TAIL_LINE_LEN {
            let mut cut = MAX_TAIL_LINE_LEN;
            while !line.is_char_boundary(cut) {
                cut -= 1;
            }
            line.truncate(cut);
        }
    }
}

/// Write JSON to a sibling temp file, fsync, and rename into place.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StateError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("tmp");
    {
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixture builders shared across crates' tests.

use crate::record::{BuildHistory, BuildRecord, ProcessInfo, TargetState, STATE_VERSION};
use crate::target::{Target, TargetKind};
use std::path::PathBuf;

/// A minimal enabled executable target watching `src/**`.
pub fn target_fixture(name: &str) -> Target {
    Target {
        name: name.to_string(),
        kind: TargetKind::Executable,
        enabled: true,
        build_command: format!("make {name}"),
        output_path: None,
        watch_paths: vec!["src/**/*".to_string()],
        settling_delay_ms: Some(100),
        debounce_interval_ms: None,
        max_retries: None,
        backoff_multiplier: None,
        environment: None,
        bundle_id: None,
        icon: None,
        group: None,
        post_build: None,
    }
}

/// A fresh idle state document owned by the current process.
pub fn state_fixture(target: &str) -> TargetState {
    TargetState {
        version: STATE_VERSION.to_string(),
        project_path: PathBuf::from("/tmp/proj"),
        project_name: "proj".to_string(),
        target: target.to_string(),
        target_type: TargetKind::Executable,
        config_path: None,
        process: ProcessInfo {
            pid: std::process::id(),
            hostname: "localhost".to_string(),
            platform: std::env::consts::OS.to_string(),
            start_time: 1_000,
            last_heartbeat: 1_000,
            active: true,
        },
        last_build: BuildRecord::default(),
        build_history: BuildHistory::default(),
        app_info: None,
        last_build_error: None,
        post_build: Vec::new(),
        extra: serde_json::Map::new(),
    }
}

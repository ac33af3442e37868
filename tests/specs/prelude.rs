//! Test helpers for behavioral specifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

/// Spec polling cadence and budget.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const WAIT_BUDGET: Duration = Duration::from_secs(30);

/// Returns the path to a built binary, resolving relative to the test
/// binary itself when CARGO_MANIFEST_DIR points elsewhere.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }

    // The test binary lives at target/debug/deps/specs-<hash>; its
    // grandparent is target/debug/ where the real binaries are built
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

pub fn poltergeist_binary() -> PathBuf {
    binary_path("poltergeist")
}

pub fn polterd_binary() -> PathBuf {
    binary_path("polterd")
}

pub fn polter_binary() -> PathBuf {
    binary_path("polter")
}

/// A scratch project with its own state directory.
pub struct Project {
    pub root: tempfile::TempDir,
    pub state_dir: tempfile::TempDir,
}

impl Project {
    /// Create a project with the given poltergeist.config.json content.
    pub fn with_config(config: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        std::fs::write(root.path().join("poltergeist.config.json"), config).unwrap();
        std::fs::create_dir_all(root.path().join("src")).unwrap();
        Self { root, state_dir }
    }

    /// An empty project without a config file.
    pub fn bare() -> Self {
        let root = tempfile::tempdir().unwrap();
        let state_dir = tempfile::tempdir().unwrap();
        Self { root, state_dir }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// A `poltergeist` command scoped to this project and state dir.
    pub fn poltergeist(&self, args: &[&str]) -> Command {
        let mut command = Command::new(poltergeist_binary());
        command
            .args(args)
            .current_dir(self.path())
            .env("POLTERGEIST_STATE_DIR", self.state_dir.path())
            .env("POLTERGEIST_DAEMON_BINARY", polterd_binary())
            .env("POLTERGEIST_DAEMON_TIMEOUT", "15000")
            .env("POLTERGEIST_POLL_MS", "25");
        command
    }

    /// A `polter` command scoped to this project and state dir.
    pub fn polter(&self, args: &[&str]) -> Command {
        let mut command = Command::new(polter_binary());
        command
            .args(args)
            .current_dir(self.path())
            .env("POLTERGEIST_STATE_DIR", self.state_dir.path())
            .env("POLTERGEIST_DAEMON_BINARY", polterd_binary())
            .env("POLTERGEIST_POLL_MS", "25");
        command
    }

    /// Names of state files currently in the state directory.
    pub fn state_files(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.state_dir.path()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|n| n.ends_with(".state"))
            .collect();
        names.sort();
        names
    }

    /// Parse the state document for one target.
    pub fn read_state(&self, target: &str) -> Option<serde_json::Value> {
        let suffix = format!("-{target}.state");
        let name = self.state_files().into_iter().find(|n| n.ends_with(&suffix))?;
        let text = std::fs::read_to_string(self.state_dir.path().join(name)).ok()?;
        serde_json::from_str(&text).ok()
    }

    /// Poll until the predicate holds or the budget elapses.
    pub fn wait_until(&self, what: &str, predicate: impl Fn(&Self) -> bool) {
        let deadline = Instant::now() + WAIT_BUDGET;
        while !predicate(self) {
            if Instant::now() > deadline {
                panic!("timed out waiting for {what}");
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Stop any daemon this project started (best-effort, for teardown).
    pub fn stop_daemon(&self) {
        let _ = self.poltergeist(&["stop"]).output();
    }
}

/// A minimal single-target config whose build appends to builds.log and
/// writes the declared output file.
pub fn counting_config(settling_ms: u64) -> String {
    format!(
        r#"{{
            "version": "1.0",
            "projectName": "spec",
            "targets": [
                {{
                    "name": "app",
                    "type": "executable",
                    "buildCommand": "echo run >> builds.log && mkdir -p build && echo ok > build/app",
                    "outputPath": "build/app",
                    "watchPaths": ["src/**/*"],
                    "settlingDelayMs": {settling_ms}
                }}
            ]
        }}"#
    )
}

/// Lines currently in the project's builds.log.
pub fn build_count(project: &Project) -> usize {
    std::fs::read_to_string(project.path().join("builds.log"))
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

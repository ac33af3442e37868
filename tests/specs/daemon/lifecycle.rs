//! Daemon start/stop lifecycle through the CLI.

use crate::prelude::*;

#[test]
fn start_status_stop_round_trip() {
    let project = Project::with_config(&counting_config(100));

    let output = project.poltergeist(&["start"]).output().unwrap();
    assert!(
        output.status.success(),
        "start failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    // Discovery record names a live daemon
    let info_name = std::fs::read_dir(project.state_dir.path())
        .unwrap()
        .flatten()
        .find(|e| e.file_name().to_string_lossy().ends_with("-daemon.json"));
    assert!(info_name.is_some(), "daemon.json missing");

    let output = project.poltergeist(&["status"]).output().unwrap();
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("daemon: running"));

    // Target state was claimed with an idle build
    let state = project.read_state("app").unwrap();
    assert_eq!(state["lastBuild"]["status"], "idle");
    assert_eq!(state["process"]["active"], true);

    let output = project.poltergeist(&["stop"]).output().unwrap();
    assert!(
        output.status.success(),
        "stop failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    // Clean shutdown releases the records and discovery files
    project.wait_until("daemon.json removed", |p| {
        !std::fs::read_dir(p.state_dir.path())
            .unwrap()
            .flatten()
            .any(|e| e.file_name().to_string_lossy().ends_with("-daemon.json"))
    });
    let state = project.read_state("app").unwrap();
    assert_eq!(state["process"]["active"], false);
}

#[test]
fn second_start_is_rejected_while_running() {
    let project = Project::with_config(&counting_config(100));

    let output = project.poltergeist(&["start"]).output().unwrap();
    assert!(output.status.success());

    let output = project.poltergeist(&["start"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("already running"));

    project.stop_daemon();
}

#[test]
fn status_flags_a_daemon_version_mismatch() {
    let project = Project::with_config(&counting_config(100));

    let output = project.poltergeist(&["start"]).output().unwrap();
    assert!(output.status.success());

    // A current daemon reports no mismatch
    let output = project.poltergeist(&["status"]).output().unwrap();
    assert!(output.status.success());
    assert!(!String::from_utf8_lossy(&output.stdout).contains("outdated"));

    // Rewrite the version file as an older install would have left it
    let version_file = std::fs::read_dir(project.state_dir.path())
        .unwrap()
        .flatten()
        .find(|e| e.file_name().to_string_lossy().ends_with("-daemon.version"))
        .expect("daemon.version missing");
    std::fs::write(version_file.path(), "0.0.1+deadbeef").unwrap();

    let output = project.poltergeist(&["status"]).output().unwrap();
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("0.0.1+deadbeef"));
    assert!(text.contains("outdated"));

    project.stop_daemon();
}

#[test]
fn stop_without_daemon_fails() {
    let project = Project::with_config(&counting_config(100));
    let output = project.poltergeist(&["stop"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no daemon"));
}

#[test]
fn start_with_invalid_config_fails_fast() {
    let project = Project::with_config(r#"{ "targets": [] }"#);
    let output = project.poltergeist(&["start"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}

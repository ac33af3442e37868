//! One-shot builds keep the full state protocol without a daemon.

use crate::prelude::*;

#[test]
fn oneshot_build_writes_success_state() {
    let project = Project::with_config(&counting_config(100));

    let output = project.poltergeist(&["build", "app"]).output().unwrap();
    assert!(output.status.success());
    assert_eq!(build_count(&project), 1);

    let state = project.read_state("app").unwrap();
    assert_eq!(state["lastBuild"]["status"], "success");
    assert_eq!(state["process"]["active"], false);
    assert!(project.path().join("build/app").exists());
}

#[test]
fn failed_build_exits_nonzero_with_summary() {
    let config = r#"{
        "targets": [
            {
                "name": "app",
                "type": "executable",
                "buildCommand": "echo 'error: surprise' >&2; exit 3",
                "watchPaths": ["src/**"]
            }
        ]
    }"#;
    let project = Project::with_config(config);

    let output = project.poltergeist(&["build", "app"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error: surprise"));

    let state = project.read_state("app").unwrap();
    assert_eq!(state["lastBuild"]["status"], "failure");
    assert_eq!(state["lastBuild"]["exitCode"], 3);
    assert_eq!(state["lastBuildError"]["exitCode"], 3);
    assert_eq!(state["buildHistory"]["failureCount"], 1);
}

#[test]
fn build_json_emits_the_record() {
    let project = Project::with_config(&counting_config(100));

    let output = project.poltergeist(&["build", "app", "--json"]).output().unwrap();
    assert!(output.status.success());
    let record: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(record["status"], "success");
    assert_eq!(record["exitCode"], 0);
}

#[test]
fn build_logs_are_captured_per_target() {
    let project = Project::with_config(&counting_config(100));
    project.poltergeist(&["build", "app"]).output().unwrap();

    let output = project.poltergeist(&["logs", "app"]).output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("app build:"));
}

#[test]
fn wait_on_idle_target_returns_immediately() {
    let project = Project::with_config(&counting_config(100));
    project.poltergeist(&["build", "app"]).output().unwrap();

    let output = project
        .poltergeist(&["wait", "app", "--timeout", "5"])
        .output()
        .unwrap();
    assert!(output.status.success());
}

//! `poltergeist clean` removes only dead, old state records.

use crate::prelude::*;

/// Seed a state file via a real one-shot build, then age its heartbeat.
fn seed_dead_state(project: &Project, heartbeat_age_ms: u64) {
    let output = project.poltergeist(&["build", "app"]).output().unwrap();
    assert!(output.status.success());

    // Rewrite the record as a dead owner with an old heartbeat
    let suffix = "-app.state";
    let name = project
        .state_files()
        .into_iter()
        .find(|n| n.ends_with(suffix))
        .unwrap();
    let path = project.state_dir.path().join(name);
    let mut state: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    state["process"]["pid"] = serde_json::json!(999_999_999u32);
    let heartbeat = state["process"]["lastHeartbeat"].as_u64().unwrap();
    state["process"]["lastHeartbeat"] =
        serde_json::json!(heartbeat.saturating_sub(heartbeat_age_ms));
    std::fs::write(&path, serde_json::to_string_pretty(&state).unwrap()).unwrap();
}

#[test]
fn dry_run_removes_nothing() {
    let project = Project::with_config(&counting_config(100));
    seed_dead_state(&project, 10 * 24 * 60 * 60 * 1000);

    let output = project
        .poltergeist(&["clean", "--days", "7", "--dry-run"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("would remove 1"));
    assert_eq!(project.state_files().len(), 1, "dry run must not delete");
}

#[test]
fn clean_removes_old_dead_records_and_is_idempotent() {
    let project = Project::with_config(&counting_config(100));
    seed_dead_state(&project, 10 * 24 * 60 * 60 * 1000);

    let output = project.poltergeist(&["clean", "--days", "7"]).output().unwrap();
    assert!(output.status.success());
    assert!(project.state_files().is_empty());

    // A second clean removes nothing new
    let output = project.poltergeist(&["clean", "--days", "7"]).output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("removed 0"));
}

#[test]
fn recent_dead_records_survive_default_clean() {
    let project = Project::with_config(&counting_config(100));
    seed_dead_state(&project, 60_000);

    let output = project.poltergeist(&["clean", "--days", "7"]).output().unwrap();
    assert!(output.status.success());
    assert_eq!(project.state_files().len(), 1);

    // --all sweeps any dead owner
    let output = project.poltergeist(&["clean", "--all"]).output().unwrap();
    assert!(output.status.success());
    assert!(project.state_files().is_empty());
}

//! `poltergeist status` reads state files, daemon or no daemon.

use crate::prelude::*;

#[test]
fn status_without_state_reports_no_state() {
    let project = Project::with_config(&counting_config(100));

    let output = project.poltergeist(&["status"]).output().unwrap();
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("daemon: not running"));
    assert!(text.contains("no state"));
}

#[test]
fn status_json_emits_the_raw_state_map() {
    let project = Project::with_config(&counting_config(100));

    // A one-shot build creates the state document
    let output = project.poltergeist(&["build", "app"]).output().unwrap();
    assert!(
        output.status.success(),
        "build failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let output = project.poltergeist(&["status", "--json"]).output().unwrap();
    assert!(output.status.success());

    let map: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("status --json is valid JSON");
    assert_eq!(map["app"]["target"], "app");
    assert_eq!(map["app"]["lastBuild"]["status"], "success");
    assert_eq!(map["app"]["buildHistory"]["buildCount"], 1);
    assert_eq!(map["app"]["version"], "1.0");
}

#[test]
fn status_for_unknown_target_fails() {
    let project = Project::with_config(&counting_config(100));
    let output = project.poltergeist(&["status", "ghost"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown target"));
}

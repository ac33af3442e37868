//! End-to-end: a file change triggers a build through the real daemon.

use crate::prelude::*;

#[test]
fn touching_a_watched_file_builds_the_target() {
    let project = Project::with_config(&counting_config(100));

    let output = project.poltergeist(&["start"]).output().unwrap();
    assert!(
        output.status.success(),
        "start failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    // Give the recursive watch a beat to become effective, then touch
    std::thread::sleep(std::time::Duration::from_millis(500));
    std::fs::write(project.path().join("src/a.ts"), "export {}").unwrap();

    project.wait_until("build success in state", |p| {
        p.read_state("app")
            .map(|s| s["lastBuild"]["status"] == "success")
            .unwrap_or(false)
    });

    let state = project.read_state("app").unwrap();
    assert_eq!(state["buildHistory"]["buildCount"], 1);
    assert!(project.path().join("build/app").exists());

    // manual build through the daemon's admission interface
    let output = project.poltergeist(&["build", "app"]).output().unwrap();
    assert!(
        output.status.success(),
        "daemon build failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    project.wait_until("second build recorded", |p| {
        p.read_state("app")
            .map(|s| s["buildHistory"]["buildCount"] == 2)
            .unwrap_or(false)
    });

    project.stop_daemon();
}

#[test]
fn unwatched_files_do_not_trigger_builds() {
    let project = Project::with_config(&counting_config(100));

    let output = project.poltergeist(&["start"]).output().unwrap();
    assert!(output.status.success());

    std::thread::sleep(std::time::Duration::from_millis(500));
    std::fs::write(project.path().join("README.md"), "docs").unwrap();
    std::thread::sleep(std::time::Duration::from_secs(1));

    let state = project.read_state("app").unwrap();
    assert_eq!(state["buildHistory"]["buildCount"], 0);
    assert_eq!(build_count(&project), 0);

    project.stop_daemon();
}

//! The `polter` runner: freshness checks around binary execution.

use crate::prelude::*;

/// Config whose build produces an executable that exits 7 and logs runs.
fn runner_config() -> String {
    r#"{
        "targets": [
            {
                "name": "app",
                "type": "executable",
                "buildCommand": "mkdir -p build && printf '#!/bin/sh\nexit 7\n' > build/app && chmod +x build/app && echo run >> builds.log",
                "outputPath": "build/app",
                "watchPaths": ["src/**/*"]
            }
        ]
    }"#
    .to_string()
}

#[test]
fn fresh_binary_runs_without_rebuilding() {
    let project = Project::with_config(&runner_config());

    let output = project.poltergeist(&["build", "app"]).output().unwrap();
    assert!(output.status.success());
    assert_eq!(build_count(&project), 1);

    // Binary newer than the build start, no VCS: fresh
    let output = project.polter(&["app"]).output().unwrap();
    assert_eq!(output.status.code(), Some(7), "exit code forwarded");
    assert_eq!(build_count(&project), 1, "no rebuild for a fresh binary");
}

#[test]
fn stale_binary_triggers_one_rebuild_then_runs() {
    let project = Project::with_config(&runner_config());

    project.poltergeist(&["build", "app"]).output().unwrap();

    // Age the binary well past the recorded build start
    let status = std::process::Command::new("touch")
        .args(["-t", "200001010000", "build/app"])
        .current_dir(project.path())
        .status()
        .unwrap();
    assert!(status.success());

    let output = project.polter(&["app"]).output().unwrap();
    assert_eq!(output.status.code(), Some(7));
    assert!(String::from_utf8_lossy(&output.stderr).contains("stale"));
    assert_eq!(build_count(&project), 2, "exactly one rebuild");
}

#[test]
fn missing_binary_is_reported() {
    let project = Project::with_config(&runner_config());

    let output = project.polter(&["app"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no binary found"));
}

#[test]
fn no_state_runs_as_is_with_a_warning() {
    let project = Project::with_config(&runner_config());

    // Build the binary by hand; no state record exists
    std::fs::create_dir_all(project.path().join("build")).unwrap();
    std::fs::write(project.path().join("build/app"), "#!/bin/sh\nexit 0\n").unwrap();
    let status = std::process::Command::new("chmod")
        .args(["+x", "build/app"])
        .current_dir(project.path())
        .status()
        .unwrap();
    assert!(status.success());

    let output = project.polter(&["app"]).output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no build state"));
    assert_eq!(build_count(&project), 0);
}

#[test]
fn runner_forwards_arguments() {
    let config = r#"{
        "targets": [
            {
                "name": "echoer",
                "type": "executable",
                "buildCommand": "mkdir -p build && printf '#!/bin/sh\ntest \"$1\" = ping\n' > build/echoer && chmod +x build/echoer",
                "outputPath": "build/echoer",
                "watchPaths": ["src/**/*"]
            }
        ]
    }"#;
    let project = Project::with_config(config);
    project.poltergeist(&["build", "echoer"]).output().unwrap();

    let output = project.polter(&["echoer", "ping"]).output().unwrap();
    assert_eq!(output.status.code(), Some(0));

    let output = project.polter(&["echoer", "pong"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}

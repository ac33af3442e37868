//! `poltergeist list` enumerates configured targets.

use crate::prelude::*;

const TWO_TARGETS: &str = r#"{
    "targets": [
        {
            "name": "backend",
            "type": "executable",
            "buildCommand": "make backend",
            "watchPaths": ["backend/**", "shared/**"]
        },
        {
            "name": "docs",
            "type": "custom",
            "enabled": false,
            "buildCommand": "make docs",
            "watchPaths": ["docs/**"]
        }
    ]
}"#;

#[test]
fn list_shows_every_target_with_kind_and_command() {
    let project = Project::with_config(TWO_TARGETS);

    let output = project.poltergeist(&["list"]).output().unwrap();
    assert!(output.status.success());

    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("backend"));
    assert!(text.contains("executable"));
    assert!(text.contains("make backend"));
    assert!(text.contains("docs"));
    assert!(text.contains("(disabled)"));
}

#[test]
fn list_without_config_fails_clearly() {
    let project = Project::bare();
    let output = project.poltergeist(&["list"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no poltergeist config"));
}

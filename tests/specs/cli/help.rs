//! CLI help and version output.

use crate::prelude::*;
use std::process::Command;

#[test]
fn poltergeist_help_lists_commands() {
    let output = Command::new(poltergeist_binary())
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());

    let text = String::from_utf8_lossy(&output.stdout);
    for command in ["start", "stop", "status", "build", "wait", "logs", "list", "clean", "init"] {
        assert!(text.contains(command), "help missing '{command}'");
    }
}

#[test]
fn haunt_and_rest_aliases_parse() {
    // Unknown-command errors exit with clap's code 2; aliases must not
    let project = Project::bare();
    let output = project.poltergeist(&["haunt"]).output().unwrap();
    assert_ne!(output.status.code(), Some(2), "haunt alias not recognized");

    let output = project.poltergeist(&["rest"]).output().unwrap();
    assert_ne!(output.status.code(), Some(2), "rest alias not recognized");
}

#[test]
fn version_flags_answer() {
    let output = Command::new(poltergeist_binary()).arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("poltergeist"));

    let output = Command::new(polterd_binary()).arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("polterd"));

    let output = Command::new(polter_binary()).arg("--version").output().unwrap();
    assert!(output.status.success());
}

#[test]
fn polter_requires_a_target() {
    let output = Command::new(polter_binary()).output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn polterd_rejects_unknown_arguments() {
    let output = Command::new(polterd_binary()).arg("--bogus").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unexpected argument"));
}

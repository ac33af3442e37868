//! `poltergeist init` writes a starter config.

use crate::prelude::*;

#[test]
fn init_writes_a_parseable_config() {
    let project = Project::bare();

    let output = project.poltergeist(&["init"]).output().unwrap();
    assert!(output.status.success());

    let config_path = project.path().join("poltergeist.config.json");
    let text = std::fs::read_to_string(&config_path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert!(value["targets"].as_array().unwrap().len() == 1);

    // list accepts the generated config
    let output = project.poltergeist(&["list"]).output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("app"));
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let project = Project::bare();
    project.poltergeist(&["init"]).output().unwrap();

    let output = project.poltergeist(&["init"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("already exists"));

    let output = project.poltergeist(&["init", "--force"]).output().unwrap();
    assert!(output.status.success());
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn minimal_json(kind: &str) -> String {
    format!(
        r#"{{
            "name": "app",
            "type": "{kind}",
            "buildCommand": "make app",
            "watchPaths": ["src/**/*.c"]
        }}"#
    )
}

#[parameterized(
    executable = { "executable", TargetKind::Executable },
    app_bundle = { "app-bundle", TargetKind::AppBundle },
    test = { "test", TargetKind::Test },
    docker = { "docker-image", TargetKind::DockerImage },
    cmake_custom = { "cmake-custom", TargetKind::CmakeCustom },
)]
fn target_kind_parses_from_kebab_case(tag: &str, expected: TargetKind) {
    let target: Target = serde_json::from_str(&minimal_json(tag)).unwrap();
    assert_eq!(target.kind, expected);
    assert_eq!(target.kind.builder_tag(), tag);
}

#[test]
fn minimal_target_gets_defaults() {
    let target: Target = serde_json::from_str(&minimal_json("executable")).unwrap();
    assert!(target.enabled);
    assert_eq!(target.settling_delay(), Duration::from_millis(1000));
    assert_eq!(target.max_retries(), 0);
    assert_eq!(target.backoff_multiplier(), 2.0);
    assert!(target.hooks().is_empty());
}

#[test]
fn settling_delay_prefers_explicit_over_alias() {
    let mut target: Target = serde_json::from_str(&minimal_json("executable")).unwrap();
    target.debounce_interval_ms = Some(250);
    assert_eq!(target.settling_delay(), Duration::from_millis(250));

    target.settling_delay_ms = Some(100);
    assert_eq!(target.settling_delay(), Duration::from_millis(100));
}

#[test]
fn test_kind_skips_artifact_check() {
    assert!(!TargetKind::Test.checks_artifact());
    assert!(TargetKind::Executable.checks_artifact());
    assert!(TargetKind::AppBundle.checks_artifact());
}

#[parameterized(
    success_on_success = { HookCondition::Success, true, true },
    success_on_failure = { HookCondition::Success, false, false },
    failure_on_failure = { HookCondition::Failure, false, true },
    always_on_success = { HookCondition::Always, true, true },
    always_on_failure = { HookCondition::Always, false, true },
)]
fn hook_condition_matching(cond: HookCondition, build_succeeded: bool, expected: bool) {
    assert_eq!(cond.matches(build_succeeded), expected);
}

#[test]
fn hook_defaults_from_json() {
    let hook: PostBuildHook = serde_json::from_str(
        r#"{ "name": "lint", "command": "make lint" }"#,
    )
    .unwrap();
    assert_eq!(hook.run_on, HookCondition::Always);
    assert_eq!(hook.max_lines, 20);
    assert_eq!(hook.timeout(), Duration::from_secs(30));
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn startup_error_scan_scopes_to_last_attempt() {
    let log = "\
--- polterd: starting (pid: 100) ---\n\
ERROR failed to start daemon: old problem\n\
--- polterd: starting (pid: 200) ---\n\
all good here\n";
    assert_eq!(parse_startup_error(log), None);

    let log = "\
--- polterd: starting (pid: 100) ---\n\
fine\n\
--- polterd: starting (pid: 200) ---\n\
ERROR failed to start daemon: socket busy\n";
    let error = parse_startup_error(log).unwrap();
    assert!(error.contains("socket busy"));
    assert!(!error.contains("old problem"));
}

#[test]
fn no_marker_means_no_error() {
    assert_eq!(parse_startup_error("ERROR something"), None);
    assert_eq!(parse_startup_error(""), None);
}

#[test]
fn finds_some_polterd_path() {
    // With no override and no sibling, falls back to a PATH lookup name
    let path = find_polterd_binary();
    assert!(path.to_string_lossy().contains("polterd"));
}

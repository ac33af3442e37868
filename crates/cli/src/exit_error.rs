// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exit-code-carrying error for the CLI binaries.

/// An error that requests a specific process exit code.
///
/// `main` downcasts to this before falling back to exit code 1. An empty
/// message suppresses the "Error:" line (the command already printed its
/// own diagnostics).
#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Exit silently with the given code.
    pub fn silent(code: i32) -> Self {
        Self::new(code, "")
    }
}

impl std::fmt::Display for ExitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ExitError {}

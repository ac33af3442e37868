// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compiled watch expressions.
//!
//! A watch expression selects files under a project root by glob patterns
//! (`src/**/*.ts`, `Makefile`). Matching is against the path relative to
//! the root; events outside the root never match.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};

use super::WatchError;

/// A set of glob patterns rooted at a project directory.
#[derive(Debug, Clone)]
pub struct WatchExpression {
    root: PathBuf,
    patterns: Vec<String>,
    set: GlobSet,
}

impl WatchExpression {
    /// Compile patterns relative to `root`.
    pub fn compile(root: &Path, patterns: &[String]) -> Result<Self, WatchError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let normalized = pattern.trim_start_matches("./");
            let glob = Glob::new(normalized).map_err(|e| WatchError::BadPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| WatchError::BadPattern {
            pattern: patterns.join(", "),
            message: e.to_string(),
        })?;

        Ok(Self {
            root: root.to_path_buf(),
            patterns: patterns.to_vec(),
            set,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The source patterns, as configured.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether an absolute path matches any pattern.
    pub fn matches(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        self.set.is_match(relative)
    }

    /// Stable key for subscription sharing: two targets with the same
    /// pattern list (order-sensitive) share one subscription.
    pub fn share_key(&self) -> String {
        self.patterns.join("\u{1f}")
    }
}

#[cfg(test)]
#[path = "expression_tests.rs"]
mod tests;

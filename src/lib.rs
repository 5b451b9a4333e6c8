// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! gitreview library - find the repositories that need a human
//!
//! A tree of git repositories is probed concurrently. Each repository gets
//! a fixed sequence of git steps (config, status, fetch, rev-list) and one
//! [`types::Report`]. Reports are folded into review categories by
//! [`aggregate::Categories`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod ai;
pub mod aggregate;
pub mod analyzer;
pub mod commands;
pub mod config;
pub mod error;
pub mod git;
pub mod journal;
pub mod probe;
pub mod review;
pub mod runner;
pub mod scanner;

/// Core data types shared by the probe, the pool and the aggregator
pub mod types {
    use serde::{Deserialize, Serialize};
    use std::path::PathBuf;

    // =========================================================================
    // Repository configuration
    // =========================================================================

    /// Per-repository flags read from `git config` at the start of a probe
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RepoConfig {
        /// `review.skip`: leave the repository out of the analysis entirely
        pub skip: bool,
        /// `review.omit`: analyze, but keep it out of the journal
        pub omit: bool,
    }

    // =========================================================================
    // Fetch mode
    // =========================================================================

    /// How the fetch step talks to the remote.
    ///
    /// Fixed once at startup and handed to every probe.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub enum FetchMode {
        /// Real `git fetch`, remote-tracking refs are updated
        #[default]
        Live,
        /// `git fetch --dry-run`, output is reported but refs stay put
        DryRun,
    }

    impl FetchMode {
        /// Map the `fetch` setting onto a mode
        #[must_use]
        pub fn from_enabled(enabled: bool) -> Self {
            if enabled {
                Self::Live
            } else {
                Self::DryRun
            }
        }
    }

    // =========================================================================
    // Report
    // =========================================================================

    /// Outcome of probing one repository.
    ///
    /// Fields of a step are empty until that step runs. For any one step the
    /// output and error fields are never both set, and once a step fails the
    /// later steps leave their fields empty.
    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Report {
        /// Repository root, the key of the report
        pub repo_path: PathBuf,
        /// Porcelain status listing (non-empty means messy)
        #[serde(default)]
        pub status_output: String,
        /// Failure text of the status step
        #[serde(default)]
        pub status_error: String,
        /// Combined fetch output (non-empty means new content)
        #[serde(default)]
        pub fetch_output: String,
        /// Failure text of the fetch step
        #[serde(default)]
        pub fetch_error: String,
        /// Commits only on the local side, one per line
        #[serde(default)]
        pub rev_list_ahead: String,
        /// Commits only on the remote default branch, one per line
        #[serde(default)]
        pub rev_list_behind: String,
        /// Raw left-right listing
        #[serde(default)]
        pub rev_list_output: String,
        /// Failure text of the rev-list step
        #[serde(default)]
        pub rev_list_error: String,
        /// Default branch of `origin` as resolved by the rev-list step
        #[serde(default)]
        pub default_branch: String,
        /// Copied from `review.omit`
        #[serde(default)]
        pub omitted: bool,
    }

    impl Report {
        /// Empty report for a repository
        #[must_use]
        pub fn new(repo_path: impl Into<PathBuf>) -> Self {
            Self {
                repo_path: repo_path.into(),
                ..Self::default()
            }
        }

        /// True when any step recorded a failure
        #[must_use]
        pub fn has_error(&self) -> bool {
            !self.status_error.is_empty()
                || !self.fetch_error.is_empty()
                || !self.rev_list_error.is_empty()
        }

        /// Number of local-only commits
        #[must_use]
        pub fn ahead_count(&self) -> usize {
            self.rev_list_ahead.lines().count()
        }

        /// Number of remote-only commits
        #[must_use]
        pub fn behind_count(&self) -> usize {
            self.rev_list_behind.lines().count()
        }
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::aggregate::{Categories, OwnershipFilter};
    pub use crate::analyzer::Analyzer;
    pub use crate::probe::{Probe, ProbeOptions};
    pub use crate::runner::{CommandLine, CommandRunner, RunnerError, SystemRunner};
    pub use crate::types::*;
    pub use anyhow::{Context, Result};
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod completions;
pub mod config;
pub mod review;
pub mod status;

use crate::aggregate::Categories;
use crate::analyzer::Analyzer;
use crate::config::Settings;
use crate::probe::Probe;
use crate::runner::CommandRunner;
use crate::scanner;
use crate::types::Report;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::info;

/// Flags shared by every command that analyzes repositories
#[derive(Debug, Clone, Default, Args)]
pub struct AnalysisArgs {
    /// Directories to scan for repositories (default: configured root, else ~/src)
    pub roots: Vec<PathBuf>,

    /// Repositories to analyze in addition to the scanned ones
    #[arg(long, num_args = 1.., value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Number of concurrent probes
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Do not update remote-tracking refs (runs `git fetch --dry-run`)
    #[arg(long)]
    pub no_fetch: bool,

    /// Deadline for each git command, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Deepest directory level searched below each root
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Follow symbolic links while searching for repositories
    #[arg(long)]
    pub follow_symlinks: bool,
}

impl AnalysisArgs {
    /// Layer the flags over `settings`
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(workers) = self.workers {
            settings.workers = workers;
        }
        if self.no_fetch {
            settings.fetch = false;
        }
        if let Some(timeout) = self.timeout {
            settings.timeout_secs = timeout;
        }
        if let Some(depth) = self.max_depth {
            settings.max_depth = Some(depth);
        }
        if self.follow_symlinks {
            settings.follow_symlinks = true;
        }
    }

    /// Scan roots; the configured root only when nothing was named
    pub fn roots(&self, settings: &Settings) -> Result<Vec<PathBuf>> {
        if self.roots.is_empty() && self.paths.is_empty() {
            Ok(vec![settings.scan_root()?])
        } else {
            Ok(self.roots.clone())
        }
    }
}

/// Reports of one run and their categories
#[derive(Debug, Clone)]
pub struct Analysis {
    /// Every report, sorted by path
    pub reports: Vec<Report>,
    /// Reports grouped for review
    pub categories: Categories,
}

/// Discover repositories and probe them on `runtime`
pub fn analyze(
    args: &AnalysisArgs,
    settings: &Settings,
    runtime: &Runtime,
    runner: Arc<dyn CommandRunner>,
) -> Result<Analysis> {
    let paths = scanner::discover(&args.roots(settings)?, &args.paths, &settings.scan_options())?;
    info!("Found {} git repositories", paths.len());

    let analyzer = Analyzer::new(Probe::new(runner, settings.probe_options()), settings.worker_count()?);
    let mut reports = runtime.block_on(analyzer.analyze_all(&paths));
    reports.sort_by(|a, b| a.repo_path.cmp(&b.repo_path));

    let categories = Categories::fold(&reports, &settings.ownership());
    Ok(Analysis { reports, categories })
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Repository discovery

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Controls how roots are walked
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Glob patterns; matching directories are not entered
    pub exclude: Vec<String>,
    /// Follow symbolic links while walking
    pub follow_symlinks: bool,
    /// Maximum walk depth below each root (unlimited when `None`)
    pub max_depth: Option<usize>,
}

/// Find repositories under `roots`, plus any `explicit` paths that are
/// repositories themselves.
///
/// A directory counts as a repository when it has a `.git` entry. The walk
/// does not continue below a repository root. Results are absolute,
/// deduplicated and sorted.
pub fn discover(roots: &[PathBuf], explicit: &[PathBuf], options: &ScanOptions) -> Result<Vec<PathBuf>> {
    let excludes = build_excludes(&options.exclude)?;
    let mut found = BTreeSet::new();

    for root in roots {
        let root = std::fs::canonicalize(root)
            .with_context(|| format!("Failed to resolve scan root {}", root.display()))?;
        if !root.is_dir() {
            bail!("Scan root {} is not a directory", root.display());
        }
        info!("Scanning: {}", root.display());
        scan_root(&root, &excludes, options, &mut found);
    }

    for path in explicit {
        match std::fs::canonicalize(path) {
            Ok(path) if is_repository(&path) => {
                found.insert(path);
            }
            Ok(path) => warn!("Not a git repository, ignoring: {}", path.display()),
            Err(e) => warn!("Ignoring {}: {}", path.display(), e),
        }
    }

    Ok(found.into_iter().collect())
}

/// True when `path` has a `.git` directory or file
#[must_use]
pub fn is_repository(path: &Path) -> bool {
    path.join(".git").exists()
}

fn scan_root(root: &Path, excludes: &GlobSet, options: &ScanOptions, found: &mut BTreeSet<PathBuf>) {
    let mut walker = WalkDir::new(root).follow_links(options.follow_symlinks);
    if let Some(depth) = options.max_depth {
        walker = walker.max_depth(depth);
    }

    let mut entries = walker.into_iter();
    while let Some(entry) = entries.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable path: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        if entry.file_name() == ".git" {
            entries.skip_current_dir();
            continue;
        }
        if excludes.is_match(path) {
            debug!("Excluded: {}", path.display());
            entries.skip_current_dir();
            continue;
        }
        if is_repository(path) {
            found.insert(path.to_path_buf());
            entries.skip_current_dir();
        }
    }
}

fn build_excludes(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).with_context(|| format!("Invalid exclude pattern: {pattern}"))?;
        builder.add(glob);
    }
    builder.build().context("Failed to build exclude patterns")
}

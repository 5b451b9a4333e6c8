// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Report aggregation - fold reports into review categories
//!
//! Pure and deterministic: the same reports, in any order, give the same
//! categories. Maps are unordered; use [`sorted_keys`] or
//! [`Categories::reviewable`] wherever order is visible.

use crate::types::Report;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Ownership pattern used when none is configured
pub const DEFAULT_OWNER: &str = "smarty";

/// Decides which repositories belong in the journal.
///
/// Case-insensitive substring match on the repository path. An empty
/// pattern accepts every path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipFilter {
    pattern: String,
}

impl OwnershipFilter {
    /// Filter on `pattern`
    pub fn new(pattern: impl AsRef<str>) -> Self {
        Self {
            pattern: pattern.as_ref().to_lowercase(),
        }
    }

    /// Whether `path` is owned by the organization
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        path.to_string_lossy().to_lowercase().contains(&self.pattern)
    }
}

impl Default for OwnershipFilter {
    fn default() -> Self {
        Self::new(DEFAULT_OWNER)
    }
}

/// Reports grouped by the reason they need a look
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Categories {
    /// Concatenated step errors
    pub erred: HashMap<PathBuf, String>,
    /// Uncommitted changes
    pub messy: HashMap<PathBuf, String>,
    /// Commits not on the remote default branch
    pub ahead: HashMap<PathBuf, String>,
    /// Remote commits not yet local
    pub behind: HashMap<PathBuf, String>,
    /// Fetch output followed by the rev-list listing
    pub fetched: HashMap<PathBuf, String>,
    /// The owned, non-omitted part of `fetched`
    pub journal: HashMap<PathBuf, String>,
    /// Default branch of each journal repository, when known
    pub branches: HashMap<PathBuf, String>,
}

impl Categories {
    /// Fold `reports` into categories
    pub fn fold<'a, I>(reports: I, owner: &OwnershipFilter) -> Self
    where
        I: IntoIterator<Item = &'a Report>,
    {
        let mut categories = Self::default();
        for report in reports {
            categories.add(report, owner);
        }
        categories
    }

    fn add(&mut self, report: &Report, owner: &OwnershipFilter) {
        let path = &report.repo_path;

        for error in [&report.status_error, &report.fetch_error, &report.rev_list_error] {
            if !error.is_empty() {
                self.erred.entry(path.clone()).or_default().push_str(error);
            }
        }

        if !report.status_output.is_empty() {
            append(&mut self.messy, path, &report.status_output);
        }
        if !report.rev_list_ahead.is_empty() {
            append(&mut self.ahead, path, &report.rev_list_ahead);
        }
        if !report.rev_list_behind.is_empty() {
            append(&mut self.behind, path, &report.rev_list_behind);
        }

        if !report.fetch_output.is_empty() {
            let entry = format!("{}{}", report.fetch_output, report.rev_list_output);
            append(&mut self.fetched, path, &entry);

            if !report.omitted && owner.matches(path) {
                append(&mut self.journal, path, &entry);
                if !report.default_branch.is_empty() {
                    self.branches
                        .insert(path.clone(), report.default_branch.clone());
                }
            }
        }
    }

    /// Every repository in any category, sorted
    #[must_use]
    pub fn reviewable(&self) -> Vec<PathBuf> {
        let mut all = BTreeSet::new();
        for map in [&self.erred, &self.messy, &self.ahead, &self.behind, &self.fetched, &self.journal] {
            all.extend(map.keys().cloned());
        }
        all.into_iter().collect()
    }

    /// True when no repository needs a look
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reviewable().is_empty()
    }

    /// Ordered copy for display and serialization
    #[must_use]
    pub fn sorted(&self) -> SortedCategories {
        SortedCategories {
            erred: sorted_map(&self.erred),
            messy: sorted_map(&self.messy),
            ahead: sorted_map(&self.ahead),
            behind: sorted_map(&self.behind),
            fetched: sorted_map(&self.fetched),
            journal: sorted_map(&self.journal),
            reviewable: self.reviewable(),
        }
    }
}

/// [`Categories`] with keys in lexicographic order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortedCategories {
    /// See [`Categories::erred`]
    pub erred: BTreeMap<PathBuf, String>,
    /// See [`Categories::messy`]
    pub messy: BTreeMap<PathBuf, String>,
    /// See [`Categories::ahead`]
    pub ahead: BTreeMap<PathBuf, String>,
    /// See [`Categories::behind`]
    pub behind: BTreeMap<PathBuf, String>,
    /// See [`Categories::fetched`]
    pub fetched: BTreeMap<PathBuf, String>,
    /// See [`Categories::journal`]
    pub journal: BTreeMap<PathBuf, String>,
    /// See [`Categories::reviewable`]
    pub reviewable: Vec<PathBuf>,
}

/// Keys of `map` in lexicographic order
#[must_use]
pub fn sorted_keys<V>(map: &HashMap<PathBuf, V>) -> Vec<&PathBuf> {
    let mut keys: Vec<_> = map.keys().collect();
    keys.sort();
    keys
}

fn sorted_map(map: &HashMap<PathBuf, String>) -> BTreeMap<PathBuf, String> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

fn append(map: &mut HashMap<PathBuf, String>, path: &Path, text: &str) {
    map.entry(path.to_path_buf()).or_default().push_str(text);
}

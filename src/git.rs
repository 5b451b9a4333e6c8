// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! The git command lines issued per repository, and parsers for their output
//!
//! | step         | command                                                   |
//! |--------------|-----------------------------------------------------------|
//! | config read  | `git config --bool --get review.skip` / `review.omit`     |
//! | status       | `git status --porcelain --untracked-files=all`            |
//! | fetch        | `git fetch` (or `git fetch --dry-run`)                    |
//! | default head | `git symbolic-ref --quiet --short refs/remotes/origin/HEAD` |
//! | fallback     | `git rev-parse --verify --quiet refs/remotes/origin/<b>`  |
//! | rev-list     | `git rev-list --left-right --oneline HEAD...origin/<b>`   |
//! | diff (AI)    | `git diff HEAD..origin/<b>`                               |

use crate::runner::CommandLine;
use crate::types::FetchMode;

/// Remote the default branch is compared against
pub const REMOTE: &str = "origin";

/// Config key that removes a repository from the analysis
pub const SKIP_KEY: &str = "review.skip";

/// Config key that keeps a repository out of the journal
pub const OMIT_KEY: &str = "review.omit";

/// Branch names tried, in order, when `origin/HEAD` is not set
pub const FALLBACK_BRANCHES: &[&str] = &["main", "master"];

/// Read a boolean config value
#[must_use]
pub fn config_bool(key: &str) -> CommandLine {
    CommandLine::git(["config", "--bool", "--get", key])
}

/// List uncommitted changes, one path per line
#[must_use]
pub fn status() -> CommandLine {
    CommandLine::git(["status", "--porcelain", "--untracked-files=all"])
}

/// Fetch from the configured remotes
#[must_use]
pub fn fetch(mode: FetchMode) -> CommandLine {
    let cmd = CommandLine::git(["fetch"]);
    match mode {
        FetchMode::Live => cmd,
        FetchMode::DryRun => cmd.arg("--dry-run"),
    }
}

/// Ask which branch `origin/HEAD` points at
#[must_use]
pub fn remote_head() -> CommandLine {
    CommandLine::git(["symbolic-ref", "--quiet", "--short"])
        .arg(format!("refs/remotes/{REMOTE}/HEAD"))
}

/// Check that a remote-tracking branch exists
#[must_use]
pub fn verify_remote_branch(branch: &str) -> CommandLine {
    CommandLine::git(["rev-parse", "--verify", "--quiet"])
        .arg(format!("refs/remotes/{REMOTE}/{branch}"))
}

/// Symmetric difference between `HEAD` and the remote default branch
#[must_use]
pub fn rev_list(branch: &str) -> CommandLine {
    CommandLine::git(["rev-list", "--left-right", "--oneline"])
        .arg(format!("HEAD...{REMOTE}/{branch}"))
}

/// Changes waiting on the remote default branch
#[must_use]
pub fn diff_to_remote(branch: &str) -> CommandLine {
    CommandLine::git(["diff"]).arg(format!("HEAD..{REMOTE}/{branch}"))
}

/// Interpret the output of `git config --bool --get`
#[must_use]
pub fn parse_bool(output: &str) -> bool {
    output.trim() == "true"
}

/// Branch name from `symbolic-ref --short` output (`origin/main` -> `main`)
#[must_use]
pub fn parse_remote_head(output: &str) -> Option<String> {
    let name = output.trim();
    let branch = name
        .strip_prefix(REMOTE)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(name);
    if branch.is_empty() || branch == "HEAD" {
        None
    } else {
        Some(branch.to_string())
    }
}

/// A rev-list listing split by side
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Divergence {
    /// `<` lines: reachable from `HEAD` only
    pub ahead: String,
    /// `>` lines: reachable from the remote branch only
    pub behind: String,
}

/// Split `rev-list --left-right` output into ahead and behind listings.
///
/// Markers are stripped; unmarked lines are ignored.
#[must_use]
pub fn parse_rev_list(output: &str) -> Divergence {
    let mut divergence = Divergence::default();
    for line in output.lines() {
        let (side, rest) = if let Some(rest) = line.strip_prefix('<') {
            (&mut divergence.ahead, rest)
        } else if let Some(rest) = line.strip_prefix('>') {
            (&mut divergence.behind, rest)
        } else {
            continue;
        };
        side.push_str(rest.trim_start());
        side.push('\n');
    }
    divergence
}

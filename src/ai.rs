// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! AI review - summarize incoming changes of journal repositories

use crate::aggregate::sorted_keys;
use crate::error::ToolError;
use crate::git;
use crate::runner::{CommandLine, CommandRunner};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

const PROMPT: &str = "Review the following git diff. Summarize the changes and flag \
                      any concerns (bugs, security, style). Be concise.";

const RULE: &str = "================================================================================";

/// Supported reviewers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiReviewer {
    /// The `claude` CLI in print mode
    ClaudeCode,
}

impl AiReviewer {
    /// Every supported reviewer
    pub const ALL: [Self; 1] = [Self::ClaudeCode];

    /// Configuration name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ClaudeCode => "claude-code",
        }
    }

    /// Executable that must be on `PATH`
    #[must_use]
    pub fn program(self) -> &'static str {
        match self {
            Self::ClaudeCode => "claude",
        }
    }

    /// Command reviewing `diff`, which is passed on stdin
    #[must_use]
    pub fn command(self, diff: &str) -> CommandLine {
        match self {
            Self::ClaudeCode => CommandLine::new(self.program()).args(["-p", PROMPT]).stdin(diff),
        }
    }

    /// Locate the executable on `PATH`
    pub fn ensure_installed(self) -> Result<PathBuf, ToolError> {
        self.locate(std::env::var_os("PATH"))
    }

    fn locate(self, paths: Option<OsString>) -> Result<PathBuf, ToolError> {
        which::which_in(self.program(), paths, ".").map_err(|_| ToolError::NotFound {
            program: self.program(),
        })
    }
}

impl FromStr for AiReviewer {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|reviewer| reviewer.name() == name)
            .ok_or_else(|| ToolError::Unsupported {
                kind: "AI reviewer",
                name: name.to_string(),
                supported: Self::ALL.iter().map(|r| r.name()).collect(),
            })
    }
}

/// Where reviews go and how long commands may take
#[derive(Debug, Clone)]
pub struct AiOptions {
    /// Directory holding one markdown file per day
    pub output_dir: PathBuf,
    /// Deadline for `git diff`
    pub git_timeout: Duration,
    /// Deadline for one reviewer invocation
    pub review_timeout: Duration,
}

/// Review every journal repository and append the results to today's file.
///
/// Per-repository failures are written into the file and logged. Returns
/// the file written, or `None` when the journal is empty.
pub async fn review_all(
    reviewer: AiReviewer,
    runner: &dyn CommandRunner,
    journal: &HashMap<PathBuf, String>,
    branches: &HashMap<PathBuf, String>,
    options: &AiOptions,
) -> Result<Option<PathBuf>> {
    if journal.is_empty() {
        return Ok(None);
    }

    let now = chrono::Local::now();
    let mut document = format!("# AI Code Review - {}\n", now.format("%Y-%m-%d %H:%M:%S"));

    for repo in sorted_keys(journal) {
        document.push_str(&format!("\n{RULE}\n## {}\n{RULE}\n\n", repo.display()));

        let branch = branches.get(repo).map_or("", String::as_str);
        match review_one(reviewer, runner, repo, branch, options).await {
            Ok(review) => {
                document.push_str(review.trim_end());
                document.push('\n');
            }
            Err(e) => {
                warn!("AI review error for {}: {:#}", repo.display(), e);
                document.push_str(&format!("ERROR: {e:#}\n"));
            }
        }
    }

    std::fs::create_dir_all(&options.output_dir).with_context(|| {
        format!("Could not create AI review directory {}", options.output_dir.display())
    })?;
    let path = options.output_dir.join(format!("{}.md", now.format("%Y-%m-%d")));
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Could not open AI review file {}", path.display()))?;
    file.write_all(document.as_bytes())
        .with_context(|| format!("Could not write AI review file {}", path.display()))?;

    info!("AI review written to {}", path.display());
    Ok(Some(path))
}

async fn review_one(
    reviewer: AiReviewer,
    runner: &dyn CommandRunner,
    repo: &Path,
    branch: &str,
    options: &AiOptions,
) -> Result<String> {
    anyhow::ensure!(!branch.is_empty(), "default branch of {} is unknown", git::REMOTE);

    let diff = runner
        .run(repo, &git::diff_to_remote(branch), options.git_timeout)
        .await
        .context("git diff failed")?;
    if diff.trim().is_empty() {
        return Ok("No differences found.".to_string());
    }

    runner
        .run(repo, &reviewer.command(&diff), options.review_timeout)
        .await
        .with_context(|| format!("{} failed", reviewer.program()))
}

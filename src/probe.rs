// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Repository probe - the per-repository sequence of git steps
//!
//! Steps run strictly in order: config read, status, fetch, rev-list. A
//! failing step is recorded in the report and ends the probe; later steps
//! never run. A repository with `review.skip` set produces no report.

use crate::git;
use crate::runner::{CommandLine, CommandRunner};
use crate::types::{FetchMode, RepoConfig, Report};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Default deadline for a single git command
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Settings shared by every probe of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Live fetch or `--dry-run`
    pub fetch_mode: FetchMode,
    /// Deadline applied to each git command separately
    pub timeout: Duration,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            fetch_mode: FetchMode::Live,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Runs the step sequence against one repository at a time
#[derive(Clone)]
pub struct Probe {
    runner: Arc<dyn CommandRunner>,
    options: ProbeOptions,
}

impl Probe {
    /// Create a probe issuing commands through `runner`
    pub fn new(runner: Arc<dyn CommandRunner>, options: ProbeOptions) -> Self {
        Self { runner, options }
    }

    /// Probe `repo`. `None` means the repository asked to be skipped.
    pub async fn run(&self, repo: &Path) -> Option<Report> {
        let config = self.read_config(repo).await;
        if config.skip {
            debug!("Skipping {} (review.skip)", repo.display());
            return None;
        }

        let mut report = Report::new(repo);
        report.omitted = config.omit;

        match self.step(repo, "status", &git::status()).await {
            Ok(output) => report.status_output = output,
            Err(error) => {
                report.status_error = error;
                return Some(report);
            }
        }

        match self
            .step(repo, "fetch", &git::fetch(self.options.fetch_mode))
            .await
        {
            Ok(output) => report.fetch_output = output,
            Err(error) => {
                report.fetch_error = error;
                return Some(report);
            }
        }

        match self.rev_list(repo).await {
            Ok((branch, output)) => {
                let divergence = git::parse_rev_list(&output);
                report.default_branch = branch;
                report.rev_list_ahead = divergence.ahead;
                report.rev_list_behind = divergence.behind;
                report.rev_list_output = output;
            }
            Err(error) => report.rev_list_error = error,
        }

        Some(report)
    }

    /// Read `review.skip` and `review.omit`. Unreadable or absent keys are false.
    pub async fn read_config(&self, repo: &Path) -> RepoConfig {
        RepoConfig {
            skip: self.read_flag(repo, git::SKIP_KEY).await,
            omit: self.read_flag(repo, git::OMIT_KEY).await,
        }
    }

    async fn read_flag(&self, repo: &Path, key: &str) -> bool {
        match self
            .runner
            .run(repo, &git::config_bool(key), self.options.timeout)
            .await
        {
            Ok(output) => git::parse_bool(&output),
            Err(e) => {
                trace!("{} unset in {}: {}", key, repo.display(), e);
                false
            }
        }
    }

    async fn step(&self, repo: &Path, name: &str, command: &CommandLine) -> Result<String, String> {
        debug!("{}: {}", repo.display(), command);
        self.runner
            .run(repo, command, self.options.timeout)
            .await
            .map_err(|e| {
                warn!("{} failed: {}", name, e);
                e.to_string()
            })
    }

    async fn rev_list(&self, repo: &Path) -> Result<(String, String), String> {
        let branch = self.default_branch(repo).await?;
        let output = self.step(repo, "rev-list", &git::rev_list(&branch)).await?;
        Ok((branch, output))
    }

    /// `origin/HEAD` if set, else the first fallback branch that exists.
    async fn default_branch(&self, repo: &Path) -> Result<String, String> {
        let timeout = self.options.timeout;

        match self.runner.run(repo, &git::remote_head(), timeout).await {
            Ok(output) => {
                if let Some(branch) = git::parse_remote_head(&output) {
                    return Ok(branch);
                }
            }
            Err(e) if e.is_timeout() => return Err(e.to_string()),
            Err(e) => trace!("origin/HEAD unset: {}", e),
        }

        for candidate in git::FALLBACK_BRANCHES {
            match self
                .runner
                .run(repo, &git::verify_remote_branch(candidate), timeout)
                .await
            {
                Ok(_) => return Ok((*candidate).to_string()),
                Err(e) if e.is_timeout() => return Err(e.to_string()),
                Err(_) => {}
            }
        }

        let error = format!(
            "[{}] could not resolve the default branch of {} (tried {}/HEAD, {})",
            repo.display(),
            git::REMOTE,
            git::REMOTE,
            git::FALLBACK_BRANCHES.join(", ")
        );
        warn!("rev-list failed: {}", error);
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RunnerError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers by exact command text; anything unscripted exits 1 silently
    #[derive(Default)]
    struct FakeRunner {
        answers: HashMap<String, Result<String, String>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeRunner {
        fn ok(mut self, command: &str, output: &str) -> Self {
            self.answers.insert(command.into(), Ok(output.into()));
            self
        }

        fn fail(mut self, command: &str, output: &str) -> Self {
            self.answers.insert(command.into(), Err(output.into()));
            self
        }

        fn called(&self, prefix: &str) -> bool {
            self.calls.lock().unwrap().iter().any(|c| c.starts_with(prefix))
        }
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(
            &self,
            dir: &Path,
            command: &CommandLine,
            _timeout: Duration,
        ) -> Result<String, RunnerError> {
            let text = command.to_string();
            self.calls.lock().unwrap().push(text.clone());
            match self.answers.get(&text) {
                Some(Ok(output)) => Ok(output.clone()),
                Some(Err(output)) => Err(RunnerError::failed(dir, command, Some(128), output.clone())),
                None => Err(RunnerError::failed(dir, command, Some(1), "")),
            }
        }
    }

    fn healthy() -> FakeRunner {
        FakeRunner::default()
            .ok("git status --porcelain --untracked-files=all", "")
            .ok("git fetch", "")
            .ok("git symbolic-ref --quiet --short refs/remotes/origin/HEAD", "origin/main\n")
            .ok("git rev-list --left-right --oneline HEAD...origin/main", "")
    }

    async fn probe(runner: Arc<FakeRunner>, options: ProbeOptions) -> Option<Report> {
        Probe::new(runner, options).run(Path::new("/repos/a")).await
    }

    #[tokio::test]
    async fn test_clean_repository_has_empty_fields() {
        let report = probe(Arc::new(healthy()), ProbeOptions::default()).await.unwrap();

        assert_eq!(report.repo_path, Path::new("/repos/a"));
        assert!(!report.has_error());
        assert!(report.status_output.is_empty());
        assert!(report.fetch_output.is_empty());
        assert_eq!(report.default_branch, "main");
    }

    #[tokio::test]
    async fn test_skip_produces_no_report_and_runs_nothing_else() {
        let runner = Arc::new(healthy().ok("git config --bool --get review.skip", "true\n"));
        assert!(probe(runner.clone(), ProbeOptions::default()).await.is_none());
        assert!(!runner.called("git status"));
        assert!(!runner.called("git fetch"));
    }

    #[tokio::test]
    async fn test_omit_is_copied_to_report() {
        let runner = Arc::new(healthy().ok("git config --bool --get review.omit", "true\n"));
        let report = probe(runner, ProbeOptions::default()).await.unwrap();
        assert!(report.omitted);
    }

    #[tokio::test]
    async fn test_status_failure_stops_the_sequence() {
        let runner = Arc::new(healthy().fail(
            "git status --porcelain --untracked-files=all",
            "fatal: not a git repository",
        ));
        let report = probe(runner.clone(), ProbeOptions::default()).await.unwrap();

        assert!(report.status_error.contains("not a git repository"));
        assert!(report.status_output.is_empty());
        assert!(report.fetch_output.is_empty() && report.fetch_error.is_empty());
        assert!(report.rev_list_output.is_empty() && report.rev_list_error.is_empty());
        assert!(!runner.called("git fetch"));
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_status_and_skips_rev_list() {
        let runner = Arc::new(
            healthy()
                .ok("git status --porcelain --untracked-files=all", " M src/lib.rs\n")
                .fail("git fetch", "fatal: could not read from remote repository"),
        );
        let report = probe(runner.clone(), ProbeOptions::default()).await.unwrap();

        assert_eq!(report.status_output, " M src/lib.rs\n");
        assert!(report.fetch_error.contains("could not read from remote"));
        assert!(report.fetch_output.is_empty());
        assert!(report.rev_list_error.is_empty());
        assert!(!runner.called("git rev-list"));
        assert!(!runner.called("git symbolic-ref"));
    }

    #[tokio::test]
    async fn test_dry_run_mode_is_threaded_into_fetch() {
        let runner = Arc::new(healthy().ok("git fetch --dry-run", "From example\n"));
        let options = ProbeOptions {
            fetch_mode: FetchMode::DryRun,
            ..ProbeOptions::default()
        };
        let report = probe(runner.clone(), options).await.unwrap();

        assert_eq!(report.fetch_output, "From example\n");
        assert!(runner.called("git fetch --dry-run"));
    }

    #[tokio::test]
    async fn test_default_branch_falls_back_to_master() {
        let runner = Arc::new(
            FakeRunner::default()
                .ok("git status --porcelain --untracked-files=all", "")
                .ok("git fetch", "")
                .ok("git rev-parse --verify --quiet refs/remotes/origin/master", "abc\n")
                .ok(
                    "git rev-list --left-right --oneline HEAD...origin/master",
                    "<aaaaaaa mine\n>bbbbbbb theirs\n>ccccccc theirs too\n",
                ),
        );
        let report = probe(runner, ProbeOptions::default()).await.unwrap();

        assert_eq!(report.default_branch, "master");
        assert_eq!(report.ahead_count(), 1);
        assert_eq!(report.behind_count(), 2);
        assert!(report.rev_list_error.is_empty());
    }

    #[tokio::test]
    async fn test_unresolvable_default_branch_is_a_rev_list_error() {
        let runner = Arc::new(
            FakeRunner::default()
                .ok("git status --porcelain --untracked-files=all", "")
                .ok("git fetch", ""),
        );
        let report = probe(runner, ProbeOptions::default()).await.unwrap();

        assert!(report.rev_list_error.contains("could not resolve the default branch"));
        assert!(report.rev_list_output.is_empty());
        assert!(report.default_branch.is_empty());
    }
}

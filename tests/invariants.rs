// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Invariant tests for the worker pool and the report aggregator
//!
//! These tests verify critical invariants:
//! 1. Completeness - every non-skipped path yields exactly one report
//! 2. Fail-fast - a failing step leaves later steps empty
//! 3. Determinism - pool size and report order never change the categories
//! 4. Bounded concurrency - never more probes in flight than workers

use async_trait::async_trait;
use gitreview::analyzer::{self, Analyzer};
use gitreview::prelude::*;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =============================================================================
// Test Helpers
// =============================================================================

const STEP_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
enum Outcome {
    Ok(&'static str),
    Fail(&'static str),
    Hang,
}

#[derive(Debug, Clone)]
struct Script {
    skip: bool,
    omit: bool,
    status: Outcome,
    fetch: Outcome,
    rev_list: Outcome,
    latency: Duration,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            skip: false,
            omit: false,
            status: Outcome::Ok(""),
            fetch: Outcome::Ok(""),
            rev_list: Outcome::Ok(""),
            latency: Duration::ZERO,
        }
    }
}

/// Plays back a [`Script`] per repository and tracks concurrency
#[derive(Default)]
struct ScriptedRunner {
    scripts: HashMap<PathBuf, Script>,
    calls: Mutex<Vec<(PathBuf, String)>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedRunner {
    fn new(scripts: impl IntoIterator<Item = (PathBuf, Script)>) -> Self {
        Self {
            scripts: scripts.into_iter().collect(),
            ..Self::default()
        }
    }

    fn ran(&self, repo: &Path, prefix: &str) -> bool {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .any(|(dir, cmd)| dir == repo && cmd.starts_with(prefix))
    }

    async fn play(
        &self,
        dir: &Path,
        command: &CommandLine,
        timeout: Duration,
        outcome: &Outcome,
    ) -> std::result::Result<String, RunnerError> {
        match outcome {
            Outcome::Ok(output) => Ok((*output).to_string()),
            Outcome::Fail(output) => Err(RunnerError::failed(dir, command, Some(128), *output)),
            Outcome::Hang => {
                tokio::time::sleep(timeout).await;
                Err(RunnerError::timed_out(dir, command, timeout))
            }
        }
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        dir: &Path,
        command: &CommandLine,
        timeout: Duration,
    ) -> std::result::Result<String, RunnerError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let text = command.to_string();
        self.calls.lock().unwrap().push((dir.to_path_buf(), text.clone()));
        let script = self.scripts.get(dir).cloned().unwrap_or_default();
        tokio::time::sleep(script.latency).await;

        let flag = |set: bool| {
            if set {
                Ok("true\n".to_string())
            } else {
                Err(RunnerError::failed(dir, command, Some(1), ""))
            }
        };
        let result = if text.ends_with("review.skip") {
            flag(script.skip)
        } else if text.ends_with("review.omit") {
            flag(script.omit)
        } else if text.starts_with("git status") {
            self.play(dir, command, timeout, &script.status).await
        } else if text.starts_with("git fetch") {
            self.play(dir, command, timeout, &script.fetch).await
        } else if text.starts_with("git symbolic-ref") {
            Ok("origin/main\n".to_string())
        } else if text.starts_with("git rev-list") {
            self.play(dir, command, timeout, &script.rev_list).await
        } else {
            Err(RunnerError::failed(dir, command, Some(1), "unscripted"))
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn repo(name: &str) -> PathBuf {
    PathBuf::from("/src").join(name)
}

fn analyze(runner: Arc<ScriptedRunner>, paths: &[PathBuf], workers: usize) -> Vec<Report> {
    let workers = NonZeroUsize::new(workers).unwrap();
    let options = ProbeOptions {
        fetch_mode: FetchMode::Live,
        timeout: STEP_TIMEOUT,
    };
    let analyzer = Analyzer::new(Probe::new(runner, options), workers);
    analyzer::runtime(workers).unwrap().block_on(analyzer.analyze_all(paths))
}

/// A mixed population: clean, messy, failing, hanging, fetched, diverged
fn population(count: usize) -> Vec<(PathBuf, Script)> {
    (0..count)
        .map(|i| {
            let owner = if i % 2 == 0 { "smarty" } else { "vendor" };
            let path = repo(&format!("{owner}/repo-{i:03}"));
            let mut script = Script {
                latency: Duration::from_millis((i % 4) as u64),
                ..Script::default()
            };
            match i % 8 {
                1 => script.status = Outcome::Ok(" M src/lib.rs\n"),
                2 => script.status = Outcome::Fail("fatal: not a git repository"),
                3 => script.fetch = Outcome::Hang,
                4 => {
                    script.fetch = Outcome::Ok("From github.com:x/y\n   1..2  main -> origin/main\n");
                    script.rev_list = Outcome::Ok("> 2222222 upstream change\n");
                }
                5 => script.rev_list = Outcome::Ok("< 1111111 local change\n"),
                6 => script.omit = true,
                7 => {
                    script.fetch = Outcome::Ok("From github.com:x/y\n");
                    script.rev_list = Outcome::Fail("fatal: bad revision 'HEAD...origin/main'");
                }
                _ => {}
            }
            (path, script)
        })
        .collect()
}

fn paths_of(scripts: &[(PathBuf, Script)]) -> Vec<PathBuf> {
    scripts.iter().map(|(p, _)| p.clone()).collect()
}

// =============================================================================
// Completeness
// =============================================================================

#[test]
fn test_every_path_yields_one_report_under_latency_and_timeouts() {
    let scripts = population(40);
    let paths = paths_of(&scripts);
    let runner = Arc::new(ScriptedRunner::new(scripts));

    let reports = analyze(runner, &paths, 4);

    assert_eq!(reports.len(), paths.len());
    let reported: HashSet<_> = reports.iter().map(|r| r.repo_path.clone()).collect();
    let expected: HashSet<_> = paths.iter().cloned().collect();
    assert_eq!(reported, expected);
}

#[test]
fn test_timeouts_are_recorded_as_fetch_errors() {
    let scripts = population(14);
    let paths = paths_of(&scripts);
    let runner = Arc::new(ScriptedRunner::new(scripts));

    let reports = analyze(runner, &paths, 4);

    let hung: Vec<_> = reports
        .iter()
        .filter(|r| r.repo_path.ends_with("repo-003") || r.repo_path.ends_with("repo-011"))
        .collect();
    assert_eq!(hung.len(), 2);
    for report in hung {
        assert!(report.fetch_error.contains("timed out"), "{report:?}");
        assert!(report.rev_list_output.is_empty());
    }
}

#[test]
fn test_skipped_repositories_never_report() {
    let scripts: Vec<_> = (0..12)
        .map(|i| {
            let script = Script {
                skip: i % 3 == 0,
                ..Script::default()
            };
            (repo(&format!("r{i}")), script)
        })
        .collect();
    let skipped: HashSet<_> = scripts
        .iter()
        .filter(|(_, s)| s.skip)
        .map(|(p, _)| p.clone())
        .collect();
    let paths = paths_of(&scripts);
    let runner = Arc::new(ScriptedRunner::new(scripts));

    let reports = analyze(Arc::clone(&runner), &paths, 3);

    assert_eq!(reports.len(), paths.len() - skipped.len());
    assert!(reports.iter().all(|r| !skipped.contains(&r.repo_path)));
    for path in &skipped {
        assert!(!runner.ran(path, "git status"));
    }
}

#[test]
fn test_duplicate_paths_are_probed_once() {
    let paths = vec![repo("a"), repo("b"), repo("a")];
    let runner = Arc::new(ScriptedRunner::default());

    let reports = analyze(runner, &paths, 2);
    assert_eq!(reports.len(), 2);
}

#[test]
fn test_empty_input_yields_no_reports() {
    let runner = Arc::new(ScriptedRunner::default());
    assert!(analyze(runner, &[], 16).is_empty());
}

// =============================================================================
// Fail-fast
// =============================================================================

#[test]
fn test_status_failure_leaves_fetch_and_rev_list_empty() {
    let path = repo("broken");
    let script = Script {
        status: Outcome::Fail("fatal: not a git repository"),
        fetch: Outcome::Ok("From x\n"),
        rev_list: Outcome::Ok("> 1 x\n"),
        ..Script::default()
    };
    let runner = Arc::new(ScriptedRunner::new([(path.clone(), script)]));

    let reports = analyze(Arc::clone(&runner), &[path.clone()], 1);
    let report = &reports[0];

    assert!(!report.status_error.is_empty());
    assert!(report.status_output.is_empty());
    assert!(report.fetch_output.is_empty() && report.fetch_error.is_empty());
    assert!(report.rev_list_output.is_empty() && report.rev_list_error.is_empty());
    assert!(!runner.ran(&path, "git fetch"));
    assert!(!runner.ran(&path, "git rev-list"));
}

#[test]
fn test_fetch_failure_keeps_status_and_leaves_rev_list_empty() {
    let path = repo("offline");
    let script = Script {
        status: Outcome::Ok("?? notes.txt\n"),
        fetch: Outcome::Fail("fatal: could not read from remote repository"),
        rev_list: Outcome::Ok("> 1 x\n"),
        ..Script::default()
    };
    let runner = Arc::new(ScriptedRunner::new([(path.clone(), script)]));

    let reports = analyze(Arc::clone(&runner), &[path.clone()], 1);
    let report = &reports[0];

    assert_eq!(report.status_output, "?? notes.txt\n");
    assert!(report.fetch_error.contains("could not read from remote"));
    assert!(report.rev_list_ahead.is_empty() && report.rev_list_behind.is_empty());
    assert!(report.rev_list_error.is_empty());
    assert!(!runner.ran(&path, "git rev-list"));
}

#[test]
fn test_rev_list_failure_keeps_fetch_and_leaves_divergence_empty() {
    let scripts = population(16);
    let paths = paths_of(&scripts);
    let runner = Arc::new(ScriptedRunner::new(scripts));

    let reports = analyze(runner, &paths, 4);
    let failed: Vec<_> = reports
        .iter()
        .filter(|r| r.repo_path.ends_with("repo-007") || r.repo_path.ends_with("repo-015"))
        .collect();
    assert_eq!(failed.len(), 2);
    for report in failed {
        assert!(report.rev_list_error.contains("bad revision"), "{report:?}");
        assert_eq!(report.fetch_output, "From github.com:x/y\n");
        assert!(report.rev_list_output.is_empty());
        assert!(report.rev_list_ahead.is_empty() && report.rev_list_behind.is_empty());
    }

    let categories = Categories::fold(&reports, &OwnershipFilter::default());
    let vendor = repo("vendor/repo-007");
    assert!(categories.erred.contains_key(&vendor));
    assert_eq!(categories.fetched.get(&vendor).map(String::as_str), Some("From github.com:x/y\n"));
}

// =============================================================================
// Determinism and concurrency
// =============================================================================

#[test]
fn test_worker_count_does_not_change_categories() {
    let scripts = population(30);
    let paths = paths_of(&scripts);
    let owner = OwnershipFilter::default();

    let fold = |workers| {
        let runner = Arc::new(ScriptedRunner::new(scripts.clone()));
        Categories::fold(&analyze(runner, &paths, workers), &owner)
    };

    let one = fold(1);
    assert!(!one.erred.is_empty() && !one.messy.is_empty() && !one.journal.is_empty());
    assert_eq!(one, fold(4));
    assert_eq!(one, fold(64));
}

#[test]
fn test_pool_never_exceeds_worker_count() {
    let scripts: Vec<_> = (0..24)
        .map(|i| {
            let script = Script {
                latency: Duration::from_millis(5),
                ..Script::default()
            };
            (repo(&format!("slow-{i}")), script)
        })
        .collect();
    let paths = paths_of(&scripts);
    let runner = Arc::new(ScriptedRunner::new(scripts));

    analyze(Arc::clone(&runner), &paths, 3);

    let peak = runner.peak.load(Ordering::SeqCst);
    assert!((1..=3).contains(&peak), "peak concurrency {peak}");
}

// =============================================================================
// Aggregator properties
// =============================================================================

fn arb_report() -> impl Strategy<Value = Report> {
    (
        prop::bool::ANY,
        prop::sample::select(vec!["", " M a.rs\n"]),
        prop::sample::select(vec!["", "fatal: boom"]),
        prop::sample::select(vec!["", "From x\n"]),
        prop::sample::select(vec!["", "1111 mine\n"]),
        prop::sample::select(vec!["", "2222 theirs\n"]),
    )
        .prop_map(|(omitted, status, error, fetch, ahead, behind)| Report {
            omitted,
            status_output: status.into(),
            fetch_error: error.into(),
            fetch_output: fetch.into(),
            rev_list_ahead: ahead.into(),
            rev_list_behind: behind.into(),
            rev_list_output: format!("{ahead}{behind}"),
            ..Report::default()
        })
}

fn arb_reports() -> impl Strategy<Value = Vec<Report>> {
    prop::collection::vec(arb_report(), 0..16).prop_map(|mut reports| {
        for (i, report) in reports.iter_mut().enumerate() {
            let owner = if i % 3 == 0 { "vendor" } else { "Smarty" };
            report.repo_path = repo(&format!("{owner}/r{i}"));
        }
        reports
    })
}

proptest! {
    #[test]
    fn prop_fold_ignores_report_order(
        (reports, shuffled) in arb_reports().prop_flat_map(|r| (Just(r.clone()), Just(r).prop_shuffle()))
    ) {
        let owner = OwnershipFilter::default();
        prop_assert_eq!(Categories::fold(&reports, &owner), Categories::fold(&shuffled, &owner));
    }

    #[test]
    fn prop_fold_is_idempotent(reports in arb_reports()) {
        let owner = OwnershipFilter::default();
        let first = Categories::fold(&reports, &owner);
        prop_assert_eq!(&first, &Categories::fold(&reports, &owner));
        prop_assert_eq!(first.sorted(), Categories::fold(&reports, &owner).sorted());
    }

    #[test]
    fn prop_journal_is_owned_subset_of_fetched(reports in arb_reports()) {
        let owner = OwnershipFilter::default();
        let categories = Categories::fold(&reports, &owner);
        for path in categories.journal.keys() {
            prop_assert!(categories.fetched.contains_key(path));
            prop_assert!(owner.matches(path));
        }
    }
}

// =============================================================================
// Scenarios
// =============================================================================

fn scenario(path: PathBuf, script: Script) -> Categories {
    let runner = Arc::new(ScriptedRunner::new([(path.clone(), script)]));
    Categories::fold(&analyze(runner, &[path], 2), &OwnershipFilter::default())
}

#[test]
fn test_scenario_messy_only() {
    let path = repo("smarty/a");
    let c = scenario(
        path.clone(),
        Script {
            status: Outcome::Ok(" M README.md\n"),
            ..Script::default()
        },
    );

    assert_eq!(c.messy.get(&path).map(String::as_str), Some(" M README.md\n"));
    assert!(c.erred.is_empty() && c.ahead.is_empty() && c.behind.is_empty());
    assert!(c.fetched.is_empty() && c.journal.is_empty());
}

#[test]
fn test_scenario_fetched_and_journaled() {
    let path = repo("smarty/b");
    let c = scenario(
        path.clone(),
        Script {
            fetch: Outcome::Ok("From github.com:smarty/b\n"),
            rev_list: Outcome::Ok("> abc1234 new upstream work\n"),
            ..Script::default()
        },
    );

    let expected = "From github.com:smarty/b\n> abc1234 new upstream work\n";
    assert_eq!(c.fetched.get(&path).map(String::as_str), Some(expected));
    assert_eq!(c.journal.get(&path).map(String::as_str), Some(expected));
    assert_eq!(c.behind.get(&path).map(String::as_str), Some("abc1234 new upstream work\n"));
    assert_eq!(c.branches.get(&path).map(String::as_str), Some("main"));
}

#[test]
fn test_scenario_unowned_fetch_is_not_journaled() {
    let path = repo("vendor/b");
    let c = scenario(
        path.clone(),
        Script {
            fetch: Outcome::Ok("From github.com:vendor/b\n"),
            ..Script::default()
        },
    );

    assert!(c.fetched.contains_key(&path));
    assert!(c.journal.is_empty());
}

#[test]
fn test_scenario_erred_only_with_exact_text() {
    let path = repo("smarty/c");
    let c = scenario(
        path.clone(),
        Script {
            status: Outcome::Fail("fatal: not a git repository (or any of the parent directories): .git"),
            ..Script::default()
        },
    );

    let expected = format!(
        "[{}] git status --porcelain --untracked-files=all: exit status 128\n\
         fatal: not a git repository (or any of the parent directories): .git",
        path.display()
    );
    assert_eq!(c.erred.get(&path), Some(&expected));
    assert!(c.messy.is_empty() && c.ahead.is_empty() && c.behind.is_empty());
    assert!(c.fetched.is_empty() && c.journal.is_empty());
}

#[test]
fn test_scenario_omitted_is_fetched_but_not_journaled() {
    let path = repo("smarty/d");
    let c = scenario(
        path.clone(),
        Script {
            omit: true,
            fetch: Outcome::Ok("From github.com:smarty/d\n"),
            ..Script::default()
        },
    );

    assert!(c.fetched.contains_key(&path));
    assert!(!c.journal.contains_key(&path));
    assert!(c.branches.is_empty());
}

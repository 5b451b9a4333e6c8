// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Worker pool - fans repository paths out to a fixed number of probes
//!
//! Workers pull paths from a shared queue one at a time and push reports
//! into a shared collection. [`Analyzer::analyze_all`] returns only after
//! every worker has been joined, so callers never see a partial result.

use crate::probe::Probe;
use crate::types::Report;
use std::collections::{HashSet, VecDeque};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

/// Pool size used when nothing else is configured
pub const DEFAULT_WORKERS: NonZeroUsize = match NonZeroUsize::new(16) {
    Some(n) => n,
    None => unreachable!(),
};

/// Multi-threaded runtime with one OS thread per pool worker
pub fn runtime(workers: NonZeroUsize) -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers.get())
        .thread_name("gitreview-worker")
        .enable_all()
        .build()
}

/// Runs one [`Probe`] per repository across a bounded pool
#[derive(Clone)]
pub struct Analyzer {
    probe: Probe,
    workers: NonZeroUsize,
}

impl Analyzer {
    /// Pool of `workers` concurrent probes
    #[must_use]
    pub fn new(probe: Probe, workers: NonZeroUsize) -> Self {
        Self { probe, workers }
    }

    /// Probe every path and collect the reports, in no particular order.
    ///
    /// Duplicate paths are probed once. Skipped repositories yield nothing,
    /// every other path yields exactly one report.
    pub async fn analyze_all(&self, paths: &[PathBuf]) -> Vec<Report> {
        let queue = unique(paths);
        let total = queue.len();
        info!("Analyzing {} git repositories...", total);

        let queue = Arc::new(Mutex::new(queue));
        let results = Arc::new(Mutex::new(Vec::with_capacity(total)));
        let mut workers = JoinSet::new();

        for id in 0..self.workers.get().min(total) {
            let queue = Arc::clone(&queue);
            let results = Arc::clone(&results);
            let probe = self.probe.clone();

            workers.spawn(async move {
                let mut probed = 0usize;
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some(path) = next else { break };

                    if let Some(report) = probe.run(&path).await {
                        results.lock().await.push(report);
                    }
                    probed += 1;
                }
                trace!("worker {} finished after {} repositories", id, probed);
            });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    std::panic::resume_unwind(e.into_panic());
                }
                warn!("worker cancelled: {}", e);
            }
        }

        let reports = std::mem::take(&mut *results.lock().await);
        info!(
            "Analysis complete: {} reports, {} skipped",
            reports.len(),
            total - reports.len()
        );
        reports
    }
}

fn unique(paths: &[PathBuf]) -> VecDeque<PathBuf> {
    let mut seen = HashSet::with_capacity(paths.len());
    paths
        .iter()
        .filter(|path| {
            let first = seen.insert(path.as_path());
            if !first {
                debug!("Dropping duplicate path {}", path.display());
            }
            first
        })
        .cloned()
        .collect()
}

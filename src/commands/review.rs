// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Review command - analyze, summarize, open GUIs, write the journal

use super::AnalysisArgs;
use crate::aggregate::Categories;
use crate::ai::{self, AiOptions, AiReviewer};
use crate::analyzer;
use crate::config::Settings;
use crate::journal::{self, OutputTarget};
use crate::review;
use crate::runner::{CommandRunner, SystemRunner};
use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

/// Flags of `gitreview review`
#[derive(Debug, Clone, Default, Args)]
pub struct ReviewArgs {
    /// Discovery and probe flags
    #[command(flatten)]
    pub analysis: AnalysisArgs,

    /// GUI launcher (smerge, gitk, git-gui)
    #[arg(long)]
    pub gui: Option<String>,

    /// Journal destination: environment variable name or file path
    #[arg(long, value_name = "VALUE")]
    pub outfile: Option<String>,

    /// AI reviewer to run over the journal diffs (claude-code)
    #[arg(long, value_name = "NAME")]
    pub ai: Option<String>,

    /// Do not wait for <ENTER> at prompts
    #[arg(short, long)]
    pub yes: bool,

    /// Do not open any GUI
    #[arg(long)]
    pub no_gui: bool,
}

impl ReviewArgs {
    fn apply(&self, settings: &mut Settings) {
        self.analysis.apply(settings);
        if let Some(gui) = &self.gui {
            settings.gui.clone_from(gui);
        }
        if let Some(outfile) = &self.outfile {
            settings.outfile.clone_from(outfile);
        }
        if let Some(ai) = &self.ai {
            settings.ai_reviewer = Some(ai.clone());
        }
    }
}

/// Run the review command
pub fn run(args: &ReviewArgs, mut settings: Settings, color: bool) -> Result<()> {
    args.apply(&mut settings);
    settings.validate()?;
    let launcher = settings.gui_launcher()?;
    let reviewer = settings.ai()?;

    let runtime = analyzer::runtime(settings.worker_count()?).context("Failed to start the worker pool")?;
    let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner);
    let analysis = super::analyze(&args.analysis, &settings, &runtime, Arc::clone(&runner))?;
    let categories = &analysis.categories;

    review::print_summary(&mut std::io::stdout().lock(), categories, color)?;

    if let Some(reviewer) = reviewer {
        ai_review(reviewer, &runtime, &*runner, categories, &settings);
    }

    if args.no_gui {
        info!("GUI review disabled");
    } else {
        let opened = review::review_all(categories, launcher, args.yes)?;
        info!("Opened {} of {} repositories", opened, categories.reviewable().len());
    }

    if !categories.journal.is_empty() {
        let target = OutputTarget::resolve(&settings.outfile);
        review::prompt("Press <ENTER> to write the final report...", args.yes)?;
        journal::publish(&target, &categories.journal).context("Failed to write the final report")?;
    }
    Ok(())
}

fn ai_review(
    reviewer: AiReviewer,
    runtime: &Runtime,
    runner: &dyn CommandRunner,
    categories: &Categories,
    settings: &Settings,
) {
    if categories.journal.is_empty() {
        return;
    }
    match reviewer.ensure_installed() {
        Ok(path) => debug!("Using {}", path.display()),
        Err(e) => {
            warn!("Skipping AI review: {}", e);
            return;
        }
    }

    let options = AiOptions {
        output_dir: settings.ai_output_dir.clone(),
        git_timeout: settings.timeout(),
        review_timeout: settings.ai_timeout(),
    };
    info!("Running {} over {} repositories", reviewer.name(), categories.journal.len());
    let written = runtime.block_on(ai::review_all(
        reviewer,
        runner,
        &categories.journal,
        &categories.branches,
        &options,
    ));
    match written {
        Ok(Some(path)) => println!("AI review written to {}", path.display()),
        Ok(None) => {}
        Err(e) => warn!("AI review failed: {:#}", e),
    }
}

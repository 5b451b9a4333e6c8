// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Status command - analyze and report, without prompts or side effects

use super::AnalysisArgs;
use crate::aggregate::SortedCategories;
use crate::analyzer;
use crate::config::Settings;
use crate::review;
use crate::runner::SystemRunner;
use crate::types::Report;
use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::sync::Arc;

/// Flags of `gitreview status`
#[derive(Debug, Clone, Default, Args)]
pub struct StatusArgs {
    /// Discovery and probe flags
    #[command(flatten)]
    pub analysis: AnalysisArgs,

    /// Emit reports and categories as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct StatusDocument<'a> {
    reports: &'a [Report],
    categories: SortedCategories,
}

/// Run the status command
pub fn run(args: &StatusArgs, mut settings: Settings, color: bool) -> Result<()> {
    args.analysis.apply(&mut settings);
    settings.validate()?;

    let runtime = analyzer::runtime(settings.worker_count()?).context("Failed to start the worker pool")?;
    let analysis = super::analyze(&args.analysis, &settings, &runtime, Arc::new(SystemRunner))?;

    if args.json {
        let document = StatusDocument {
            reports: &analysis.reports,
            categories: analysis.categories.sorted(),
        };
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        review::print_summary(&mut std::io::stdout().lock(), &analysis.categories, color)?;
    }
    Ok(())
}

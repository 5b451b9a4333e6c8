// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! gitreview CLI - find the repositories that need a human

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use gitreview::commands::{self, review::ReviewArgs, status::StatusArgs};
use gitreview::config;
use std::io::IsTerminal;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

#[derive(Parser)]
#[command(name = "gitreview")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "GITREVIEW_CONFIG", global = true)]
    config: Option<std::path::PathBuf>,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze repositories, open the ones needing attention, write the journal
    Review(ReviewArgs),

    /// Analyze repositories and print the summary only
    Status(StatusArgs),

    /// Print the effective configuration as TOML
    Config,

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 if cli.quiet => tracing::Level::ERROR,
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(log_level).into())
                .from_env_lossy(),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Completions { shell } = cli.command {
        return commands::completions::run(shell, &mut Cli::command());
    }

    let settings = config::load(cli.config.as_deref())?;
    let color = !cli.no_color && std::io::stdout().is_terminal();

    // Execute command
    match cli.command {
        Commands::Review(args) => commands::review::run(&args, settings, color),
        Commands::Status(args) => commands::status::run(&args, settings, color),
        Commands::Config => commands::config::run(&settings),
        Commands::Completions { .. } => Ok(()),
    }
}

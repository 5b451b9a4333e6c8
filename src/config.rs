// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Layers, lowest first: built-in defaults, the TOML config file,
//! `GITREVIEW_*` environment variables, then command-line flags.

use crate::aggregate::{OwnershipFilter, DEFAULT_OWNER};
use crate::ai::AiReviewer;
use crate::analyzer::DEFAULT_WORKERS;
use crate::probe::{ProbeOptions, DEFAULT_TIMEOUT};
use crate::review::GuiLauncher;
use crate::scanner::ScanOptions;
use crate::types::FetchMode;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix of the environment variables read as settings
pub const ENV_PREFIX: &str = "GITREVIEW";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory scanned when no roots are given (`~/src` when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// Concurrent probes
    pub workers: usize,
    /// Real fetch when true, `git fetch --dry-run` when false
    pub fetch: bool,
    /// Deadline for each git command, in seconds
    pub timeout_secs: u64,
    /// GUI launcher opened once per reviewable repository
    pub gui: String,
    /// Journal destination: an environment variable name or a file path
    pub outfile: String,
    /// Journal only repositories whose path contains this (case-insensitive)
    pub journal_owner: String,
    /// AI reviewer to run over journal diffs, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_reviewer: Option<String>,
    /// Where AI reviews are written
    pub ai_output_dir: PathBuf,
    /// Deadline for one AI review, in seconds
    pub ai_timeout_secs: u64,
    /// Glob patterns excluded from discovery
    pub exclude: Vec<String>,
    /// Deepest directory level searched below a root (unlimited when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    /// Follow symbolic links during discovery
    pub follow_symlinks: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: None,
            workers: DEFAULT_WORKERS.get(),
            fetch: true,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            gui: GuiLauncher::default().name().to_string(),
            outfile: "GITREVIEW_LOG".to_string(),
            journal_owner: DEFAULT_OWNER.to_string(),
            ai_reviewer: None,
            ai_output_dir: std::env::temp_dir().join("code-review"),
            ai_timeout_secs: 600,
            exclude: Vec::new(),
            max_depth: None,
            follow_symlinks: false,
        }
    }
}

impl Settings {
    /// Pool size, rejecting zero
    pub fn worker_count(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.workers).context("workers must be at least 1")
    }

    /// Per-command deadline
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Deadline for one AI review
    #[must_use]
    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs)
    }

    /// Options handed to every probe
    #[must_use]
    pub fn probe_options(&self) -> ProbeOptions {
        ProbeOptions {
            fetch_mode: FetchMode::from_enabled(self.fetch),
            timeout: self.timeout(),
        }
    }

    /// How discovery walks the scan roots
    #[must_use]
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            exclude: self.exclude.clone(),
            follow_symlinks: self.follow_symlinks,
            max_depth: self.max_depth,
        }
    }

    /// Journal ownership predicate
    #[must_use]
    pub fn ownership(&self) -> OwnershipFilter {
        OwnershipFilter::new(&self.journal_owner)
    }

    /// Configured GUI launcher
    pub fn gui_launcher(&self) -> Result<GuiLauncher> {
        Ok(self.gui.parse()?)
    }

    /// Configured AI reviewer, if one is set
    pub fn ai(&self) -> Result<Option<AiReviewer>> {
        match self.ai_reviewer.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(name) => Ok(Some(name.parse()?)),
        }
    }

    /// Scan root, defaulting to `~/src`
    pub fn scan_root(&self) -> Result<PathBuf> {
        if let Some(root) = &self.root {
            return Ok(root.clone());
        }
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join("src"))
            .context("Could not determine the home directory; pass a root explicitly")
    }

    /// Reject values that would make the run meaningless
    pub fn validate(&self) -> Result<()> {
        self.worker_count()?;
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be at least 1");
        }
        if self.ai_timeout_secs == 0 {
            bail!("ai_timeout_secs must be at least 1");
        }
        self.gui_launcher()?;
        self.ai()?;
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize settings")
    }
}

/// Default config file location (`<config dir>/gitreview/config.toml`)
#[must_use]
pub fn default_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "hyperpolymath", "gitreview")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Load settings from `path` (or the default location) and the environment.
///
/// A missing file is not an error; a malformed one is.
pub fn load(path: Option<&Path>) -> Result<Settings> {
    let mut builder = config::Config::builder();

    match path.map(Path::to_path_buf).or_else(default_path) {
        Some(file) => {
            tracing::debug!("Config file: {}", file.display());
            builder = builder.add_source(
                config::File::from(file.as_path())
                    .format(config::FileFormat::Toml)
                    .required(path.is_some()),
            );
        }
        None => tracing::debug!("No config directory available"),
    }

    let settings: Settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("exclude"),
        )
        .build()
        .context("Failed to read configuration")?
        .try_deserialize()
        .context("Invalid configuration")?;

    Ok(settings)
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Journal writer - the dated code review log entry

use crate::aggregate::sorted_keys;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{info, warn};

/// Where the journal entry goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Standard output
    Stdout,
    /// Appended to an existing file
    File(PathBuf),
}

impl OutputTarget {
    /// Resolve the `outfile` setting.
    ///
    /// Blank means stdout. Otherwise the value names an environment variable
    /// holding a path, or is a path itself. Only an existing file is used;
    /// anything else falls back to stdout.
    #[must_use]
    pub fn resolve(setting: &str) -> Self {
        Self::resolve_with(setting, |name| std::env::var(name).ok())
    }

    fn resolve_with(setting: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let setting = setting.trim();
        if setting.is_empty() {
            info!("Final report will be written to stdout.");
            return Self::Stdout;
        }

        let path = match lookup(setting) {
            Some(path) => {
                info!("Found output path in environment variable: {}={}", setting, path);
                PathBuf::from(path)
            }
            None => PathBuf::from(setting),
        };

        if path.is_file() {
            info!("Final report will be appended to {}", path.display());
            Self::File(path)
        } else {
            info!("Final report will be written to stdout.");
            Self::Stdout
        }
    }

    /// Open for appending
    pub fn open(&self) -> io::Result<Box<dyn Write>> {
        match self {
            Self::Stdout => Ok(Box::new(io::stdout())),
            Self::File(path) => {
                let file = OpenOptions::new().append(true).open(path)?;
                Ok(Box::new(file))
            }
        }
    }
}

/// Write the entry for `date`, repositories in path order.
///
/// Nothing is written when the journal is empty.
pub fn write_entry(out: &mut dyn Write, journal: &HashMap<PathBuf, String>, date: NaiveDate) -> io::Result<()> {
    if journal.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out)?;
    writeln!(out, "## {}", date.format("%Y-%m-%d"))?;
    writeln!(out)?;
    for path in sorted_keys(journal) {
        writeln!(out, "{}", journal[path])?;
    }
    out.flush()
}

/// Write today's entry to `target`, falling back to stdout if the file
/// cannot be opened.
pub fn publish(target: &OutputTarget, journal: &HashMap<PathBuf, String>) -> io::Result<()> {
    let today = chrono::Local::now().date_naive();
    let mut out = match target.open() {
        Ok(out) => out,
        Err(e) => {
            warn!("Could not open file for appending: {:?} Error: {}", target, e);
            Box::new(io::stdout())
        }
    };
    write_entry(out.as_mut(), journal, today)
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Interactive review - summary, prompts and GUI launchers

use crate::aggregate::{sorted_keys, Categories};
use crate::error::ToolError;
use owo_colors::{OwoColorize, Style};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;
use tracing::{info, warn};

/// Git GUIs a repository can be opened in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GuiLauncher {
    /// Sublime Merge
    #[default]
    Smerge,
    /// gitk, showing all refs
    Gitk,
    /// `git gui`
    GitGui,
}

impl GuiLauncher {
    /// Every supported launcher
    pub const ALL: [Self; 3] = [Self::Smerge, Self::Gitk, Self::GitGui];

    /// Configuration name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Smerge => "smerge",
            Self::Gitk => "gitk",
            Self::GitGui => "git-gui",
        }
    }

    /// Process that opens `repo`
    #[must_use]
    pub fn command(self, repo: &Path) -> Command {
        match self {
            Self::Smerge => {
                let mut cmd = Command::new("smerge");
                cmd.arg(repo);
                cmd
            }
            Self::Gitk => {
                let mut cmd = Command::new("gitk");
                cmd.arg("--all").current_dir(repo);
                cmd
            }
            Self::GitGui => {
                let mut cmd = Command::new("git");
                cmd.arg("gui").current_dir(repo);
                cmd
            }
        }
    }

    fn program(self) -> &'static str {
        match self {
            Self::Smerge => "smerge",
            Self::Gitk => "gitk",
            Self::GitGui => "git",
        }
    }

    /// Open `repo` and wait for the launcher to return
    pub fn launch(self, repo: &Path) -> Result<(), ToolError> {
        let program = self.program();
        let status = self
            .command(repo)
            .status()
            .map_err(|source| ToolError::Launch { program, source })?;
        if status.success() {
            Ok(())
        } else {
            Err(ToolError::Exited { program, status })
        }
    }
}

impl fmt::Display for GuiLauncher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GuiLauncher {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|launcher| launcher.name() == name)
            .ok_or_else(|| ToolError::Unsupported {
                kind: "GUI launcher",
                name: name.to_string(),
                supported: Self::ALL.iter().map(|l| l.name()).collect(),
            })
    }
}

/// Print the categories, each sorted by path.
///
/// Errors are shown under their repository. Ends with the full review list
/// and the journal list.
pub fn print_summary(out: &mut impl Write, categories: &Categories, color: bool) -> io::Result<()> {
    let paint = |style: Style| if color { style } else { Style::new() };
    let reviewable = categories.reviewable();

    if reviewable.is_empty() {
        writeln!(out, "{}", "Nothing to review at this time.".style(paint(Style::new().green())))?;
        return Ok(());
    }

    let header = paint(Style::new().bold());
    let sections: [(&str, &HashMap<PathBuf, String>, Style); 5] = [
        ("Repositories with git errors", &categories.erred, paint(Style::new().red())),
        ("Repositories with uncommitted changes", &categories.messy, paint(Style::new().yellow())),
        ("Repositories ahead of origin", &categories.ahead, paint(Style::new().cyan())),
        ("Repositories behind origin", &categories.behind, paint(Style::new().cyan())),
        ("Repositories with new content since the last review", &categories.fetched, paint(Style::new().green())),
    ];

    for (title, map, style) in sections {
        writeln!(out, "{}", format!("{title}: {}", map.len()).style(header))?;
        for path in sorted_keys(map) {
            writeln!(out, "  {}", path.display().style(style))?;
        }
    }

    // Full error text, indented under its repository.
    for path in sorted_keys(&categories.erred) {
        writeln!(out)?;
        writeln!(out, "{}", format!("[ERROR] {}", path.display()).style(paint(Style::new().red().bold())))?;
        for line in categories.erred[path].lines() {
            writeln!(out, "    {line}")?;
        }
    }

    writeln!(out, "{}", format!("Repositories to be reviewed: {}", reviewable.len()).style(header))?;
    for path in &reviewable {
        writeln!(out, "  {}", path.display())?;
    }

    writeln!(
        out,
        "{}",
        format!("Repositories to be included in the final report: {}", categories.journal.len()).style(header)
    )?;
    for path in sorted_keys(&categories.journal) {
        writeln!(out, "  {}", path.display())?;
    }
    Ok(())
}

/// Show `message` and wait for a line on stdin, unless `assume_yes`
pub fn prompt(message: &str, assume_yes: bool) -> io::Result<()> {
    if assume_yes {
        return Ok(());
    }
    eprint!("{message}");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(())
}

/// Open every reviewable repository, in path order.
///
/// Launch failures are logged and do not stop the loop. Returns how many
/// repositories were opened successfully.
pub fn review_all(categories: &Categories, launcher: GuiLauncher, assume_yes: bool) -> io::Result<usize> {
    let reviewable = categories.reviewable();
    if reviewable.is_empty() {
        return Ok(0);
    }

    prompt(
        &format!(
            "Press <ENTER> to initiate the review process (will open {} review windows)...",
            reviewable.len()
        ),
        assume_yes,
    )?;

    let mut opened = 0;
    for path in &reviewable {
        info!("Opening {} at {}", launcher, path.display());
        match launcher.launch(path) {
            Ok(()) => opened += 1,
            Err(e) => warn!("Failed to open git GUI: {}", e),
        }
    }
    Ok(opened)
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Errors raised by the external tools gitreview hands repositories to

use thiserror::Error;

/// Failures of GUI launchers and AI reviewers
#[derive(Debug, Error)]
pub enum ToolError {
    /// The configured name is not one of the supported tools
    #[error("unsupported {kind}: {name:?} (supported: {})", .supported.join(", "))]
    Unsupported {
        /// "GUI launcher" or "AI reviewer"
        kind: &'static str,
        /// Name as configured
        name: String,
        /// Names that would have been accepted
        supported: Vec<&'static str>,
    },

    /// The tool's executable is not on `PATH`
    #[error("{program} not found in PATH")]
    NotFound {
        /// Executable name
        program: &'static str,
    },

    /// The tool could not be started
    #[error("failed to launch {program}: {source}")]
    Launch {
        /// Executable name
        program: &'static str,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and reported failure
    #[error("{program} exited with {status}")]
    Exited {
        /// Executable name
        program: &'static str,
        /// Exit status as reported by the OS
        status: std::process::ExitStatus,
    },
}

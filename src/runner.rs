// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Process runner - one external command, one working directory, one deadline

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// A program plus its arguments, and optionally text for its stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
    stdin: Option<String>,
}

impl CommandLine {
    /// Command line for `program` with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    /// `git` with the given arguments
    pub fn git<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("git").args(args)
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Feed `input` to the child's stdin
    #[must_use]
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Program name
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments after the program name
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Text destined for stdin, if any
    #[must_use]
    pub fn input(&self) -> Option<&str> {
        self.stdin.as_deref()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Why a command did not succeed
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The program could not be started or waited on
    #[error("[{}] {command}: {source}", .dir.display())]
    Spawn {
        /// Command as typed
        command: String,
        /// Working directory
        dir: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully
    #[error("[{}] {command}: {}{}", .dir.display(), exit_text(.code), trailing(.output))]
    Failed {
        /// Command as typed
        command: String,
        /// Working directory
        dir: PathBuf,
        /// Exit code, `None` when killed by a signal
        code: Option<i32>,
        /// Whatever the program printed before exiting
        output: String,
    },

    /// The deadline passed and the child was killed
    #[error("[{}] {command}: timed out after {}s", .dir.display(), .timeout.as_secs_f64())]
    TimedOut {
        /// Command as typed
        command: String,
        /// Working directory
        dir: PathBuf,
        /// The deadline that was exceeded
        timeout: Duration,
    },
}

impl RunnerError {
    /// Non-zero exit of `command` in `dir`
    pub fn failed(
        dir: &Path,
        command: &CommandLine,
        code: Option<i32>,
        output: impl Into<String>,
    ) -> Self {
        Self::Failed {
            command: command.to_string(),
            dir: dir.to_path_buf(),
            code,
            output: output.into(),
        }
    }

    /// Deadline exceeded for `command` in `dir`
    #[must_use]
    pub fn timed_out(dir: &Path, command: &CommandLine, timeout: Duration) -> Self {
        Self::TimedOut {
            command: command.to_string(),
            dir: dir.to_path_buf(),
            timeout,
        }
    }

    /// True for the deadline variant
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

fn exit_text(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

fn trailing(output: &str) -> String {
    let output = output.trim_end();
    if output.is_empty() {
        String::new()
    } else {
        format!("\n{output}")
    }
}

/// Executes commands on behalf of the probe.
///
/// Implementations must honor `timeout` for the whole call, including
/// waiting for the child to exit.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` in `dir`, returning stdout followed by stderr
    async fn run(
        &self,
        dir: &Path,
        command: &CommandLine,
        timeout: Duration,
    ) -> Result<String, RunnerError>;
}

/// Runs real subprocesses with `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        dir: &Path,
        command: &CommandLine,
        timeout: Duration,
    ) -> Result<String, RunnerError> {
        let spawn_error = |source| RunnerError::Spawn {
            command: command.to_string(),
            dir: dir.to_path_buf(),
            source,
        };

        let mut cmd = Command::new(command.program());
        cmd.args(command.arguments())
            .current_dir(dir)
            // git must never sit on a credential prompt inside a worker
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(if command.input().is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so helpers like ssh can be signalled with git.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(spawn_error)?;

        if let (Some(input), Some(mut stdin)) = (command.input(), child.stdin.take()) {
            let input = input.to_owned();
            // Dropping the handle at the end closes the pipe.
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    tracing::debug!("stdin write failed: {}", e);
                }
            });
        }

        let pid = child.id();
        let wait = child.wait_with_output();
        tokio::pin!(wait);

        match tokio::time::timeout(timeout, &mut wait).await {
            Ok(Ok(output)) => {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                if output.status.success() {
                    Ok(text)
                } else {
                    Err(RunnerError::failed(dir, command, output.status.code(), text))
                }
            }
            Ok(Err(source)) => Err(spawn_error(source)),
            Err(_) => {
                // Terminate the group, then kill whatever outlives the grace period.
                signal_group(pid, Signal::Terminate);
                if tokio::time::timeout(TERMINATE_GRACE, &mut wait).await.is_err() {
                    tracing::debug!("{} ignored SIGTERM", command);
                }
                signal_group(pid, Signal::Kill);
                Err(RunnerError::timed_out(dir, command, timeout))
            }
        }
    }
}

/// How long a timed-out process group gets between SIGTERM and SIGKILL
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
enum Signal {
    Terminate,
    Kill,
}

#[cfg(unix)]
fn signal_group(pid: Option<u32>, signal: Signal) {
    let Some(pid) = pid.and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    let signal = match signal {
        Signal::Terminate => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    // SAFETY: a negative pid addresses only the group the child leads.
    unsafe {
        libc::kill(-pid, signal);
    }
}

// Elsewhere kill_on_drop ends the direct child.
#[cfg(not(unix))]
fn signal_group(_pid: Option<u32>, _signal: Signal) {}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Config command - prints the effective settings

use crate::config::Settings;
use anyhow::Result;

/// Print `settings` as TOML
pub fn run(settings: &Settings) -> Result<()> {
    settings.validate()?;
    print!("{}", settings.to_toml()?);
    Ok(())
}

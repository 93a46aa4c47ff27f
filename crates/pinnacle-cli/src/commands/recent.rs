//! Recent command implementation

use super::common::print_json;
use anyhow::{Context, Result};
use colored::Colorize;
use pinnacle_tools::RecentFiles;
use std::process::ExitCode;

pub fn run(clear: bool, json: bool) -> Result<ExitCode> {
    let mut recent = RecentFiles::load().context("Failed to load recent files")?;
    if clear {
        recent.clear().context("Failed to clear recent files")?;
    }

    if json {
        print_json(&recent.paths())?;
    } else if recent.is_empty() {
        println!("{}", "No recent files".dimmed());
    } else {
        for (i, path) in recent.paths().iter().enumerate() {
            let marker = if path.exists() { "".normal() } else { " (missing)".red() };
            println!("  {:>2}. {}{}", i + 1, path.display(), marker);
        }
    }
    Ok(ExitCode::SUCCESS)
}

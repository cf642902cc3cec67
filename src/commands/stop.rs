//! `hive stop <name>` (spec §6). `kill` is a hidden clap alias for this
//! command — see the Open Question resolution in the design notes.

use anyhow::Result;
use colored::Colorize;

use crate::lifecycle;

pub fn run(name: String) -> Result<()> {
    let root = super::project_root()?;
    lifecycle::stop(&root, &name)?;
    println!("{} Stopped drone '{}'", "✓".green().bold(), name.bright_cyan());
    Ok(())
}

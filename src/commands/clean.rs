//! `hive clean <name>` (spec §6): stop, remove the worktree, remove the
//! drone directory.

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;

use crate::lifecycle;

pub fn run(name: String, force: bool) -> Result<()> {
    let root = super::project_root()?;

    if !force {
        let proceed = Confirm::new()
            .with_prompt(format!("Remove drone '{name}' and its worktree?"))
            .default(false)
            .interact()?;
        if !proceed {
            println!("Aborted.");
            return Ok(());
        }
    }

    lifecycle::clean(&root, &name, true)?;
    println!("{} Cleaned drone '{}'", "✓".green().bold(), name.bright_cyan());
    Ok(())
}

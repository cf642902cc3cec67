//! `hive start <name>` (spec §6).

use anyhow::Result;
use colored::Colorize;

use crate::lifecycle::{self, StartOptions};

pub fn run(
    name: String,
    model: Option<String>,
    profile: Option<String>,
    local: bool,
    dry_run: bool,
) -> Result<()> {
    let root = super::project_root()?;
    let outcome = lifecycle::start(
        &root,
        &name,
        StartOptions {
            local,
            model,
            profile,
            dry_run,
        },
    )?;

    if dry_run {
        println!(
            "{} dry run: would {} drone '{}' on branch '{}' ({} tasks)",
            "→".yellow(),
            if outcome.resumed { "resume" } else { "start" },
            name.bright_cyan(),
            outcome.status.branch,
            outcome.status.total
        );
        return Ok(());
    }

    println!(
        "{} {} drone '{}' on branch '{}'",
        "✓".green().bold(),
        if outcome.resumed { "Resumed" } else { "Started" },
        name.bright_cyan(),
        outcome.status.branch
    );
    if !outcome.status.local_mode {
        println!("  worktree: {}", outcome.status.worktree_path.display());
    }
    Ok(())
}

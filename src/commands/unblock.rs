//! `hive unblock <name>` (spec §4.6, §6): surface why a drone blocked and
//! collect a resolution string to respawn it with.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use dialoguer::Input;

use crate::config;
use crate::lifecycle;
use crate::types::DroneState;

pub fn run(name: String, resolution: Option<String>) -> Result<()> {
    let root = super::project_root()?;
    let drone_dir = config::drone_dir(&root, &name);
    if !drone_dir.exists() {
        bail!("no such drone: {name}");
    }
    let status = crate::state::load_status(&drone_dir).context("loading drone status")?;
    if status.status != DroneState::Blocked {
        println!(
            "{} drone '{}' is not blocked (current: {})",
            "→".yellow(),
            name,
            status.status
        );
        return Ok(());
    }

    println!("{}", format!("Unblocking drone: {name}").bright_cyan().bold());
    if let Some(reason) = &status.blocked_reason {
        println!("{}", "Blocked reason:".red().bold());
        println!("{reason}");
        println!();
    }

    let resolution = match resolution {
        Some(r) => r,
        None => Input::<String>::new()
            .with_prompt("Resolution (what should the drone do now?)")
            .interact_text()?,
    };

    let outcome = lifecycle::unblock(&root, &name, &resolution)?;
    println!(
        "{} Resumed drone '{}' (branch '{}')",
        "✓".green().bold(),
        name.bright_cyan(),
        outcome.status.branch
    );
    Ok(())
}

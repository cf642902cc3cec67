//! `hive status` / `hive list` (spec §6): show drones, optionally as an
//! interactive TUI or a polling plain-text follow loop.

use anyhow::Result;
use colored::Colorize;

use crate::aggregator::{self, DroneSnapshot};
use crate::types::DroneState;

const FOLLOW_REFRESH: std::time::Duration = std::time::Duration::from_secs(2);

pub fn run(interactive: bool, follow: bool) -> Result<()> {
    let root = super::project_root()?;

    if interactive {
        return crate::tui::run_dashboard(&root);
    }

    if follow {
        loop {
            print!("\x1b[2J\x1b[H"); // clear screen, home cursor
            print_table(&aggregator::scan(&root)?);
            std::thread::sleep(FOLLOW_REFRESH);
        }
    }

    print_table(&aggregator::scan(&root)?);
    Ok(())
}

fn colorize_state(state: DroneState) -> colored::ColoredString {
    match state {
        DroneState::Completed => state.to_string().green(),
        DroneState::Failed => state.to_string().red(),
        DroneState::Blocked => state.to_string().yellow(),
        DroneState::Zombie => state.to_string().bright_red(),
        DroneState::InProgress | DroneState::Resuming | DroneState::Starting => {
            state.to_string().bright_cyan()
        }
        DroneState::Stopped => state.to_string().dimmed(),
    }
}

fn print_table(snapshots: &[DroneSnapshot]) {
    if snapshots.is_empty() {
        println!("No drones yet. Run 'hive start <name>' to launch one.");
        return;
    }
    println!(
        "{:<20} {:<12} {:<10} {:<20}",
        "DRONE".bold(),
        "STATE".bold(),
        "PROGRESS".bold(),
        "BRANCH".bold()
    );
    for snap in snapshots {
        println!(
            "{:<20} {:<12} {:<10} {:<20}",
            snap.name,
            colorize_state(snap.effective_state),
            format!("{}/{}", snap.progress.0, snap.progress.1),
            snap.status.branch
        );
    }
}

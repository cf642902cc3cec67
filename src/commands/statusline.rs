//! `hive statusline` (spec §6): reads one JSON object on stdin and writes up
//! to two ANSI-colored lines describing the project and its active drones.

use anyhow::Result;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use crate::aggregator;
use crate::config;
use crate::types::DroneState;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const LIGHT_BLUE: &str = "\x1b[94m";
const SEP: &str = " \x1b[90m\u{2502}\x1b[0m ";

#[derive(Deserialize, Default)]
struct StatuslineInput {
    workspace: Option<Workspace>,
    model: Option<Model>,
    context_window: Option<ContextWindow>,
}

#[derive(Deserialize)]
struct Workspace {
    current_dir: String,
}

#[derive(Deserialize)]
struct Model {
    display_name: String,
}

#[derive(Deserialize)]
struct ContextWindow {
    used_percentage: f64,
}

pub fn run() -> Result<()> {
    let input = read_input();
    let current_dir = std::env::var("CLAUDE_PROJECT_DIR").ok().unwrap_or_else(|| {
        input
            .workspace
            .as_ref()
            .map(|w| w.current_dir.clone())
            .unwrap_or_else(|| ".".to_string())
    });

    let line1 = build_line1(&current_dir, &input);
    match build_line2(&current_dir) {
        Some(line2) => println!("{line1}\n{line2}"),
        None => println!("{line1}"),
    }
    Ok(())
}

fn read_input() -> StatuslineInput {
    let mut buf = String::new();
    if std::io::stdin().read_to_string(&mut buf).is_ok() && !buf.trim().is_empty() {
        serde_json::from_str(&buf).unwrap_or_default()
    } else {
        StatuslineInput::default()
    }
}

fn build_line1(current_dir: &str, input: &StatuslineInput) -> String {
    let mut parts = Vec::new();
    let project = Path::new(current_dir)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| current_dir.to_string());
    parts.push(format!("{CYAN}{BOLD}{project}{RESET}"));

    if let Some(model) = &input.model {
        parts.push(format!("{LIGHT_BLUE}{}{RESET}", model.display_name));
    }
    if let Some(ctx) = &input.context_window {
        parts.push(format!("{:.0}%", ctx.used_percentage));
    }
    parts.join(SEP)
}

fn build_line2(current_dir: &str) -> Option<String> {
    let root = config::find_project_root(Path::new(current_dir)).ok()?;
    let snapshots = aggregator::scan(&root).ok()?;
    let now = chrono::Utc::now();

    let parts: Vec<String> = snapshots
        .into_iter()
        .filter(|s| match s.effective_state {
            DroneState::Stopped | DroneState::Zombie => false,
            DroneState::Completed => s
                .last_activity
                .map(|t| (now - t).num_seconds() <= 3600)
                .unwrap_or(false),
            _ => true,
        })
        .map(|s| format!("{} {}/{}", s.name, s.progress.0, s.progress.1))
        .collect();

    if parts.is_empty() {
        return None;
    }
    let version = env!("CARGO_PKG_VERSION");
    Some(format!(
        "{YELLOW}{BOLD}hive v{version}{RESET}{SEP}{}",
        parts.join(SEP)
    ))
}

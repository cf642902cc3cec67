//! TUI Presenter (spec §4.9, component C9): Dashboard, Session Viewer, and
//! Unblock Workflow, all driven by polling the Status Aggregator and Log
//! Streamer rather than holding any authoritative state of their own.

mod dashboard;
mod session_viewer;
pub mod theme;
mod unblock_workflow;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::Path;

/// Aggregator refresh cadence (spec §4.9: "500ms aggregator refresh").
pub const REFRESH_INTERVAL: std::time::Duration = std::time::Duration::from_millis(500);
/// Input/log poll cadence (spec §4.9: "100ms tail poll").
pub const POLL_TIMEOUT_MS: u64 = 100;

fn with_terminal<F>(body: F) -> Result<()>
where
    F: FnOnce(&mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()>,
{
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = body(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    let _ = std::panic::take_hook();

    result
}

pub fn run_dashboard(root: &Path) -> Result<()> {
    with_terminal(|terminal| dashboard::run(terminal, root))
}

pub fn run_session_viewer(root: &Path, drone: Option<&str>) -> Result<()> {
    with_terminal(|terminal| session_viewer::run(terminal, root, drone))
}

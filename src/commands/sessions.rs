//! `hive sessions` (spec §6): browse captured session transcripts via the
//! TUI Session Viewer.

use anyhow::Result;

pub fn run(name: Option<String>) -> Result<()> {
    let root = super::project_root()?;
    crate::tui::run_session_viewer(&root, name.as_deref())
}

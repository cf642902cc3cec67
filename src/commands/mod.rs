//! CLI command implementations, one module per subcommand (spec §6).

pub mod clean;
pub mod init;
pub mod logs;
pub mod profile;
pub mod sessions;
pub mod start;
pub mod status;
pub mod statusline;
pub mod stop;
pub mod unblock;

use crate::config;
use anyhow::Result;
use std::path::PathBuf;

/// Every command resolves the project root the same way: walk up from cwd
/// looking for `.hive/` (spec §4.1).
pub fn project_root() -> Result<PathBuf> {
    config::project_root()
}

//! Paths & Config (spec §4.1, component C1).

use crate::error::HiveError;
use crate::types::{Profile, ProjectConfig, UserConfig};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

const PROJECT_MARKER: &str = ".hive";

/// Walk upward from `start` looking for a `.hive` directory, rejecting a
/// symlinked marker (spec §4.3 tie-break: "symlinked `.hive` paths are
/// rejected at `init`").
pub fn find_project_root(start: &Path) -> Result<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let marker = dir.join(PROJECT_MARKER);
        if marker.is_dir() && !marker.is_symlink() {
            return Ok(dir);
        }
        if !dir.pop() {
            bail!(
                HiveError::not_found(format!(
                    "not a Hive project (no {PROJECT_MARKER} found above {})",
                    start.display()
                ))
            );
        }
    }
}

pub fn project_root() -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("reading current directory")?;
    find_project_root(&cwd)
}

pub fn drones_dir(root: &Path) -> PathBuf {
    root.join(PROJECT_MARKER).join("drones")
}

pub fn drone_dir(root: &Path, name: &str) -> PathBuf {
    drones_dir(root).join(name)
}

pub fn plans_dir(root: &Path) -> PathBuf {
    root.join(PROJECT_MARKER).join("plans")
}

pub fn project_config_path(root: &Path) -> PathBuf {
    root.join(PROJECT_MARKER).join("config")
}

fn user_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("resolving user config directory")?
        .join("hive"))
}

fn user_config_path() -> Result<PathBuf> {
    Ok(user_config_dir()?.join("config"))
}

/// `worktree_base(project_name) = worktree_base/{project_name}`. Resolution
/// order: `HIVE_WORKTREE_BASE` env var, then user config, then
/// `~/.hive/worktrees` default (spec §4.1).
pub fn worktree_base() -> Result<PathBuf> {
    if let Ok(env_base) = std::env::var("HIVE_WORKTREE_BASE") {
        return Ok(PathBuf::from(env_base));
    }
    if let Ok(user) = load_user_config() {
        if let Some(base) = user.worktree_base {
            return Ok(PathBuf::from(base));
        }
    }
    let home = dirs::home_dir().context("resolving home directory")?;
    Ok(home.join(".hive").join("worktrees"))
}

pub fn worktree_path(project_name: &str, drone_name: &str) -> Result<PathBuf> {
    Ok(worktree_base()?.join(project_name).join(drone_name))
}

/// Load the user config, returning the default (with a `default` profile)
/// if no file exists yet.
pub fn load_user_config() -> Result<UserConfig> {
    let path = user_config_path()?;
    if !path.exists() {
        return Ok(UserConfig::default());
    }
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("reading user config at {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parsing user config at {}", path.display()))
}

pub fn save_user_config(config: &UserConfig) -> Result<()> {
    let path = user_config_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    atomic_write_json(&path, config)
}

pub fn load_project_config(root: &Path) -> Result<ProjectConfig> {
    let path = project_config_path(root);
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("reading project config at {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parsing project config at {}", path.display()))
}

pub fn save_project_config(root: &Path, config: &ProjectConfig) -> Result<()> {
    atomic_write_json(&project_config_path(root), config)
}

/// Serialize `value` to a sibling temp file and rename it over `path`, the
/// same atomic-rewrite discipline used for the drone status record (spec
/// §4.4). Config files are small and rewritten rarely, but using the same
/// discipline means a crash mid-write never corrupts them either.
fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path.parent().context("config path has no parent")?;
    std::fs::create_dir_all(parent)?;
    let contents = serde_json::to_string_pretty(value)?;
    let tmp = parent.join(format!(
        ".{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("config")
    ));
    std::fs::write(&tmp, &contents)
        .with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("renaming into {}", path.display()))?;
    Ok(())
}

/// `hive init`'s idempotent project-structure creation (spec §4.1).
pub fn init_project(root: &Path, project_name: &str) -> Result<bool> {
    let hive_dir = root.join(PROJECT_MARKER);
    std::fs::create_dir_all(plans_dir(root)).context("creating .hive/plans")?;
    std::fs::create_dir_all(drones_dir(root)).context("creating .hive/drones")?;

    let config_path = project_config_path(root);
    let already_existed = config_path.exists();
    if !already_existed {
        let config = ProjectConfig {
            version: "1".to_string(),
            project_name: project_name.to_string(),
            created_at: Utc::now(),
            extra: serde_json::Map::new(),
        };
        save_project_config(root, &config).context("writing .hive/config")?;
    }
    let _ = hive_dir; // directory itself created as a side effect of the subdirs above
    Ok(!already_existed)
}

// ---------------------------------------------------------------------
// Profile management (spec §4.1: add_profile, remove_profile,
// set_default_profile, list_profiles). The `default` profile is reserved:
// it may be redefined but never removed.
// ---------------------------------------------------------------------

pub fn list_profiles() -> Result<Vec<Profile>> {
    let config = load_user_config()?;
    Ok(config.profiles.into_values().collect())
}

pub fn add_profile(profile: Profile) -> Result<()> {
    let mut config = load_user_config()?;
    config.profiles.insert(profile.name.clone(), profile);
    save_user_config(&config)
}

pub fn remove_profile(name: &str) -> Result<()> {
    if name == "default" {
        bail!(HiveError::user_input("the 'default' profile cannot be removed"));
    }
    let mut config = load_user_config()?;
    if config.profiles.remove(name).is_none() {
        bail!(HiveError::not_found(format!("no such profile: {name}")));
    }
    if config.default_profile == name {
        config.default_profile = "default".to_string();
    }
    save_user_config(&config)
}

pub fn set_default_profile(name: &str) -> Result<()> {
    let mut config = load_user_config()?;
    if !config.profiles.contains_key(name) {
        bail!(HiveError::not_found(format!("no such profile: {name}")));
    }
    config.default_profile = name.to_string();
    save_user_config(&config)
}

pub fn default_profile() -> Result<Profile> {
    let config = load_user_config()?;
    config
        .profiles
        .get(&config.default_profile)
        .cloned()
        .or_else(|| config.profiles.get("default").cloned())
        .context("no default profile configured")
}

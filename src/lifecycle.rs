//! Lifecycle Engine (spec §4.6, component C6): the drone state machine and
//! the orchestrating transitions start / stop / clean / unblock.

use crate::error::HiveError;
use crate::types::{DroneState, DroneStatus, Plan};
use crate::{config, plan, state, supervisor, worktree};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::info;

/// A lightweight advisory lock in the drone directory, serializing
/// concurrent lifecycle operations on the same drone (spec §4.6, §5).
/// Held for the lifetime of the guard; contention reports "busy" rather
/// than blocking, matching "the later call reports busy and exits
/// non-fatally".
pub struct DroneLock {
    path: PathBuf,
}

impl DroneLock {
    pub fn acquire(drone_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(drone_dir)?;
        let path = drone_dir.join(".lock");
        match std::fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&path)
        {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                bail!(HiveError::Busy(
                    drone_dir
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default()
                ))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Drop for DroneLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

pub struct StartOptions {
    pub local: bool,
    pub model: Option<String>,
    pub profile: Option<String>,
    pub dry_run: bool,
}

pub struct StartOutcome {
    pub status: DroneStatus,
    pub resumed: bool,
}

fn find_plan_file(root: &Path, name: &str) -> Result<PathBuf> {
    let plans = config::plans_dir(root);
    for ext in ["md", "json"] {
        let candidate = plans.join(format!("{name}.{ext}"));
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    bail!(HiveError::not_found(format!(
        "no plan file found for '{name}' under {}",
        plans.display()
    )))
}

/// §4.6 Start orchestration.
pub fn start(root: &Path, name: &str, opts: StartOptions) -> Result<StartOutcome> {
    let drone_dir = config::drone_dir(root, name);
    let _lock = DroneLock::acquire(&drone_dir)?;

    let existing = drone_dir.join("status").exists();
    if existing {
        let current = state::load_status(&drone_dir)?;
        match current.status {
            DroneState::Blocked => {
                bail!(
                    HiveError::user_input(format!(
                        "drone '{name}' is blocked: {}. Run 'hive unblock {name}' first.",
                        current.blocked_reason.clone().unwrap_or_default()
                    ))
                );
            }
            DroneState::InProgress | DroneState::Starting | DroneState::Resuming
                if supervisor::is_live(&drone_dir) =>
            {
                bail!(
                    HiveError::user_input(format!("drone '{name}' is already running"))
                );
            }
            _ => {}
        }
    }

    // 1. Load plan, fail early on validation errors.
    let plan_path = find_plan_file(root, name)?;
    let loaded_plan = plan::load(&plan_path)?;

    let profile = match &opts.profile {
        Some(p) => config::list_profiles()?
            .into_iter()
            .find(|pr| &pr.name == p)
            .with_context(|| format!("no such profile: {p}"))?,
        None => config::default_profile().unwrap_or_default(),
    };
    let model = opts.model.clone().unwrap_or_else(|| "sonnet".to_string());
    let branch = loaded_plan.default_branch();

    // 2. Either create or ensure_reusable the worktree.
    let (worktree_path, resumed) = if opts.local {
        (root.to_path_buf(), existing)
    } else {
        let project = worktree::project_name(root)?;
        let path = config::worktree_path(&project, name)?;
        let live_pid = state::read_pid(&drone_dir)
            .filter(|&pid| supervisor::process_exists(pid))
            .map(|pid| pid as i32);
        match worktree::ensure_reusable(&path, &branch, live_pid)? {
            Ok(worktree::ReuseOutcome::Fresh) => {
                worktree::create(&path, &branch, loaded_plan.base_branch.as_deref(), root)?;
                worktree::link_hive_dir(&path, root)?;
                state::append_activity(&drone_dir, "drone_created", name)?;
                (path, false)
            }
            Ok(worktree::ReuseOutcome::ResumedExisting) => (path, true),
            Err(refusal) => bail!(
                HiveError::not_found(format!("cannot reuse worktree for '{name}': {refusal}"))
            ),
        }
    };

    // 3. Write the initial status record.
    let mut status = if resumed && existing {
        let mut s = state::load_status(&drone_dir)?;
        s.status = DroneState::Resuming;
        s.last_resumed_at = Some(Utc::now());
        s.updated_at = Utc::now();
        s
    } else {
        new_status(name, &plan_path, &worktree_path, &branch, &loaded_plan, &profile.name, &model, opts.local)
    };
    state::push_event(
        &mut status,
        if resumed { "drone_resumed" } else { "drone_started" },
        None,
        name,
    );
    state::store_status(&drone_dir, &status)?;
    state::append_activity(
        &drone_dir,
        if resumed { "drone_resumed" } else { "drone_started" },
        name,
    )?;

    if opts.dry_run {
        return Ok(StartOutcome { status, resumed });
    }

    // 4. Spawn via Supervisor; record pid.
    let spawn_config = supervisor::SpawnConfig {
        drone_name: name,
        drone_dir: &drone_dir,
        worktree_path: &worktree_path,
        plan_path: &plan_path,
        command: &profile.command,
        args: &profile.args,
        model: &model,
        extra_env: &[],
    };
    let child = supervisor::spawn(&spawn_config)
        .inspect_err(|e| {
            let _ = fail_to_spawn(&drone_dir, &mut status.clone(), &e.to_string());
        })?;
    state::write_pid(&drone_dir, child.id())?;

    Ok(StartOutcome { status, resumed })
}

fn fail_to_spawn(drone_dir: &Path, status: &mut DroneStatus, message: &str) -> Result<()> {
    status.status = DroneState::Failed;
    status.blocked_reason = None;
    status.current_task = None;
    status.updated_at = Utc::now();
    state::push_event(status, "spawn_failed", None, message);
    state::store_status(drone_dir, status)?;
    state::append_activity(drone_dir, "spawn_failed", message)
}

#[allow(clippy::too_many_arguments)]
fn new_status(
    name: &str,
    plan_path: &Path,
    worktree_path: &Path,
    branch: &str,
    loaded_plan: &Plan,
    profile: &str,
    model: &str,
    local: bool,
) -> DroneStatus {
    DroneStatus {
        drone: name.to_string(),
        plan_ref: plan_path.to_path_buf(),
        worktree_path: worktree_path.to_path_buf(),
        branch: branch.to_string(),
        base_branch: loaded_plan.base_branch.clone(),
        profile: profile.to_string(),
        model: model.to_string(),
        local_mode: local,
        status: DroneState::Starting,
        total: loaded_plan.tasks.len(),
        completed: Vec::new(),
        failed: Vec::new(),
        current_task: None,
        blocked_reason: None,
        logs: Default::default(),
        created_at: Utc::now(),
        started_at: Some(Utc::now()),
        last_resumed_at: None,
        updated_at: Utc::now(),
        extra: serde_json::Map::new(),
    }
}

/// §4.6 Stop orchestration: resolve pid, escalate, clear pid, write
/// `stopped` preserving completed/failed lists.
pub fn stop(root: &Path, name: &str) -> Result<()> {
    let drone_dir = config::drone_dir(root, name);
    if !drone_dir.exists() {
        bail!(HiveError::not_found(format!("no such drone: {name}")));
    }
    let _lock = DroneLock::acquire(&drone_dir)?;

    supervisor::stop_or_fail(&drone_dir)?;

    if drone_dir.join("status").exists() {
        let mut status = state::load_status(&drone_dir)?;
        status.status = DroneState::Stopped;
        status.blocked_reason = None;
        status.current_task = None;
        status.updated_at = Utc::now();
        state::push_event(&mut status, "drone_stopped", None, name);
        state::store_status(&drone_dir, &status)?;
    }
    state::append_activity(&drone_dir, "drone_stopped", name)?;
    info!(drone = name, "stop orchestration complete");
    Ok(())
}

/// §4.6 Clean orchestration: stop if live (unless already confirmed by the
/// caller), remove the worktree, delete the drone directory.
pub fn clean(root: &Path, name: &str, force: bool) -> Result<()> {
    let drone_dir = config::drone_dir(root, name);
    if !drone_dir.exists() {
        bail!(HiveError::not_found(format!("no such drone: {name}")));
    }

    let status = state::load_status(&drone_dir).ok();

    if supervisor::is_live(&drone_dir) {
        if !force {
            bail!(
                HiveError::user_input(format!(
                    "drone '{name}' is still running; pass --force or stop it first"
                ))
            );
        }
        supervisor::stop_or_fail(&drone_dir)?;
    }

    if let Some(status) = &status {
        if !status.local_mode {
            worktree::remove(&status.worktree_path, &status.branch, root)?;
        }
    }

    std::fs::remove_dir_all(&drone_dir)
        .with_context(|| format!("removing {}", drone_dir.display()))?;
    Ok(())
}

/// §4.6 Unblock orchestration: collect the blocked reason, write a
/// resolution marker, transition back to `resuming`, and respawn.
pub fn unblock(root: &Path, name: &str, resolution: &str) -> Result<StartOutcome> {
    let drone_dir = config::drone_dir(root, name);
    if !drone_dir.exists() {
        bail!(HiveError::not_found(format!("no such drone: {name}")));
    }
    let status = state::load_status(&drone_dir)?;
    if status.status != DroneState::Blocked {
        bail!(
            HiveError::user_input(format!("drone '{name}' is not blocked"))
        );
    }

    std::fs::write(drone_dir.join("resolution"), resolution)
        .with_context(|| format!("writing resolution marker for '{name}'"))?;
    state::append_activity(&drone_dir, "unblocked", resolution)?;

    // `start`'s re-entry guard refuses a drone whose persisted status is
    // still `Blocked`, so clear it here before handing off — otherwise
    // unblock could never actually respawn anything.
    let mut cleared = status.clone();
    cleared.status = DroneState::Stopped;
    cleared.blocked_reason = None;
    cleared.updated_at = Utc::now();
    state::store_status(&drone_dir, &cleared)?;

    start(
        root,
        name,
        StartOptions {
            local: status.local_mode,
            model: Some(status.model.clone()),
            profile: Some(status.profile.clone()),
            dry_run: false,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_rejects_concurrent_acquisition() {
        let tmp = tempfile::TempDir::new().unwrap();
        let _first = DroneLock::acquire(tmp.path()).unwrap();
        let second = DroneLock::acquire(tmp.path());
        assert!(second.is_err());
    }

    #[test]
    fn lock_releases_on_drop() {
        let tmp = tempfile::TempDir::new().unwrap();
        {
            let _first = DroneLock::acquire(tmp.path()).unwrap();
        }
        let second = DroneLock::acquire(tmp.path());
        assert!(second.is_ok());
    }

    #[test]
    fn stop_on_unknown_drone_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join(".hive/drones")).unwrap();
        let err = stop(tmp.path(), "nonexistent").unwrap_err();
        assert!(err.to_string().contains("no such drone"));
    }
}

//! Status Aggregator (spec §4.7, component C7): scans `.hive/drones/`,
//! reconciles stored status against observed liveness, and produces the
//! read-only snapshots the CLI and TUI render from.

use crate::types::{DroneState, DroneStatus};
use crate::{config, state, supervisor};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;

/// One drone's point-in-time view, derived from its status record plus
/// live-process reconciliation. Never mutates the status record itself
/// (spec §4.7: "read-only; never rewrites a drone's status").
#[derive(Debug, Clone)]
pub struct DroneSnapshot {
    pub name: String,
    pub status: DroneStatus,
    /// The state actually displayed, which may differ from
    /// `status.status` when reconciliation detects a mismatch (e.g. `Zombie`).
    pub effective_state: DroneState,
    pub progress: (usize, usize),
    pub running_duration: Option<chrono::Duration>,
    pub last_activity: Option<DateTime<Utc>>,
}

/// Reconcile a drone's recorded state against whether its process is
/// actually alive, per the table in §4.7:
///
/// | recorded state        | pid file | process alive | effective state |
/// |------------------------|----------|----------------|------------------|
/// | in_progress/starting/resuming | present | yes     | unchanged        |
/// | in_progress/starting/resuming | present | no      | `Zombie`         |
/// | in_progress/starting/resuming | absent  | n/a     | `Stopped`        |
/// | completed/failed/stopped/blocked | n/a  | n/a     | unchanged        |
fn reconcile(drone_dir: &Path, status: &DroneStatus) -> DroneState {
    match status.status {
        DroneState::InProgress | DroneState::Starting | DroneState::Resuming => {
            match state::read_pid(drone_dir) {
                Some(pid) if supervisor::process_exists(pid) => status.status,
                Some(_) => DroneState::Zombie,
                None => DroneState::Stopped,
            }
        }
        other => other,
    }
}

fn last_activity(drone_dir: &Path) -> Option<DateTime<Utc>> {
    let path = state::activity_log_path(drone_dir);
    let contents = std::fs::read_to_string(path).ok()?;
    let last_line = contents.lines().last()?;
    let ts = last_line.split_whitespace().next()?;
    DateTime::parse_from_rfc3339(ts).ok().map(|dt| dt.with_timezone(&Utc))
}

pub fn snapshot_one(root: &Path, name: &str) -> Result<DroneSnapshot> {
    let drone_dir = config::drone_dir(root, name);
    let status = state::load_status(&drone_dir)
        .with_context(|| format!("loading status for drone '{name}'"))?;
    let effective_state = reconcile(&drone_dir, &status);
    let running_duration = status.started_at.map(|start| {
        let end = if matches!(
            effective_state,
            DroneState::Completed | DroneState::Failed | DroneState::Stopped
        ) {
            status.updated_at
        } else {
            Utc::now()
        };
        end - start
    });
    Ok(DroneSnapshot {
        name: name.to_string(),
        progress: (status.completed.len(), status.total),
        last_activity: last_activity(&drone_dir),
        running_duration,
        effective_state,
        status,
    })
}

/// Scan every drone directory under the project and return snapshots
/// ordered by creation time (spec §4.7 `scan`).
pub fn scan(root: &Path) -> Result<Vec<DroneSnapshot>> {
    let dir = config::drones_dir(root);
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(&dir).with_context(|| format!("reading {}", dir.display()))? {
        let entry = entry?;
        if entry.path().is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }

    let mut snapshots = Vec::new();
    for name in names {
        match snapshot_one(root, &name) {
            Ok(s) => snapshots.push(s),
            Err(_) => continue, // a drone dir mid-creation or corrupted is skipped, not fatal
        }
    }
    snapshots.sort_by_key(|s| s.status.created_at);
    Ok(snapshots)
}

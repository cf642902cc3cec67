//! State Store (spec §4.4, component C4): the single source of truth for
//! per-drone durable state, with crash-consistent atomic rewrites.

use crate::error::HiveError;
use crate::types::{AttemptMeta, DroneStatus, LogEvent};
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub fn status_path(drone_dir: &Path) -> PathBuf {
    drone_dir.join("status")
}

pub fn pid_path(drone_dir: &Path) -> PathBuf {
    drone_dir.join(".pid")
}

pub fn activity_log_path(drone_dir: &Path) -> PathBuf {
    drone_dir.join("activity.log")
}

pub fn drone_log_path(drone_dir: &Path) -> PathBuf {
    drone_dir.join("drone.log")
}

pub fn attempt_dir(drone_dir: &Path, task: usize) -> PathBuf {
    drone_dir.join("logs").join(task.to_string())
}

pub fn attempt_log_path(drone_dir: &Path, task: usize, attempt: u32) -> PathBuf {
    attempt_dir(drone_dir, task).join(format!("attempt-{attempt}"))
}

pub fn attempt_meta_path(drone_dir: &Path, task: usize, attempt: u32) -> PathBuf {
    attempt_dir(drone_dir, task).join(format!("attempt-{attempt}.meta"))
}

/// Load the status record, tolerating the destination being momentarily
/// absent mid-rename by retrying once (spec §4.4).
pub fn load_status(drone_dir: &Path) -> Result<DroneStatus> {
    let path = status_path(drone_dir);
    let contents = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            std::thread::sleep(std::time::Duration::from_millis(20));
            std::fs::read_to_string(&path)
                .with_context(|| format!("reading status at {}", path.display()))?
        }
        Err(e) => {
            return Err(HiveError::io(format!("reading status at {}", path.display()), e).into())
        }
    };
    serde_json::from_str(&contents)
        .with_context(|| format!("parsing status at {}", path.display()))
}

/// Write the new record to a sibling temp file, then rename over the
/// destination. Rename is atomic within a directory on supported
/// filesystems, so readers never observe a partial write (spec §4.4,
/// tested property #1). One retry on a transient rename collision (spec §7).
pub fn store_status(drone_dir: &Path, status: &DroneStatus) -> Result<()> {
    std::fs::create_dir_all(drone_dir)
        .with_context(|| format!("creating {}", drone_dir.display()))?;
    let path = status_path(drone_dir);
    let tmp = drone_dir.join(format!(".status.{}.tmp", std::process::id()));
    let contents = serde_json::to_string_pretty(status)?;

    std::fs::write(&tmp, &contents)
        .with_context(|| format!("writing {}", tmp.display()))?;

    match std::fs::rename(&tmp, &path) {
        Ok(()) => Ok(()),
        Err(_) => {
            // One retry: another writer may have momentarily held the
            // destination (e.g. on a filesystem without atomic same-dir
            // rename guarantees under contention).
            std::fs::rename(&tmp, &path)
                .with_context(|| format!("renaming into {}", path.display()))
        }
    }
}

pub fn write_pid(drone_dir: &Path, pid: u32) -> Result<()> {
    std::fs::create_dir_all(drone_dir)?;
    std::fs::write(pid_path(drone_dir), pid.to_string())
        .with_context(|| format!("writing pid file in {}", drone_dir.display()))
}

pub fn read_pid(drone_dir: &Path) -> Option<u32> {
    std::fs::read_to_string(pid_path(drone_dir))
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

pub fn clear_pid(drone_dir: &Path) -> Result<()> {
    let path = pid_path(drone_dir);
    if path.exists() {
        std::fs::remove_file(&path)
            .with_context(|| format!("removing {}", path.display()))?;
    }
    Ok(())
}

/// Append a line to `activity.log`, opened in append mode so the OS's
/// atomic-append guarantee is all the coordination a writer needs (spec
/// §4.4; tested property #8: never reopen in a truncating mode).
pub fn append_activity(drone_dir: &Path, kind: &str, message: &str) -> Result<()> {
    std::fs::create_dir_all(drone_dir)?;
    let path = activity_log_path(drone_dir);
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;
    writeln!(file, "{} {kind} {message}", Utc::now().to_rfc3339())
        .with_context(|| format!("appending to {}", path.display()))
}

/// Open the next attempt log for `(drone, task)`. Attempt numbers are
/// monotonic with no gaps or reuse (spec §3 Attempt, tested property #5):
/// we scan existing `attempt-N` files and take `max(N) + 1`.
pub fn open_attempt_log(drone_dir: &Path, task: usize) -> Result<(std::fs::File, u32)> {
    let dir = attempt_dir(drone_dir, task);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating {}", dir.display()))?;

    let mut max_attempt = 0u32;
    if let Ok(entries) = std::fs::read_dir(&dir) {
        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                if let Some(rest) = name.strip_prefix("attempt-") {
                    if let Ok(n) = rest.parse::<u32>() {
                        max_attempt = max_attempt.max(n);
                    }
                }
            }
        }
    }
    let attempt = max_attempt + 1;
    let path = attempt_log_path(drone_dir, task, attempt);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;
    Ok((file, attempt))
}

pub fn write_attempt_meta(drone_dir: &Path, meta: &AttemptMeta) -> Result<()> {
    let path = attempt_meta_path(drone_dir, meta.task, meta.attempt);
    let contents = serde_json::to_string_pretty(meta)?;
    std::fs::write(&path, contents)
        .with_context(|| format!("writing {}", path.display()))
}

pub fn read_attempt_meta(drone_dir: &Path, task: usize, attempt: u32) -> Result<AttemptMeta> {
    let path = attempt_meta_path(drone_dir, task, attempt);
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

/// List every `(task, attempt)` pair with a metadata record, for the
/// streamer (spec §4.8 `read_attempts`).
pub fn list_attempts(drone_dir: &Path) -> Vec<(usize, u32)> {
    let logs_dir = drone_dir.join("logs");
    let mut out = Vec::new();
    let Ok(task_dirs) = std::fs::read_dir(&logs_dir) else {
        return out;
    };
    for task_entry in task_dirs.flatten() {
        let Ok(task) = task_entry.file_name().to_str().unwrap_or_default().parse() else {
            continue;
        };
        let Ok(attempts) = std::fs::read_dir(task_entry.path()) else {
            continue;
        };
        for attempt_entry in attempts.flatten() {
            let name = attempt_entry.file_name().to_string_lossy().to_string();
            if let Some(rest) = name.strip_prefix("attempt-") {
                if let Ok(n) = rest.parse::<u32>() {
                    out.push((task, n));
                }
            }
        }
    }
    out.sort();
    out
}

pub fn push_event(status: &mut DroneStatus, kind: &str, task: Option<usize>, message: &str) {
    crate::types::push_ring(
        &mut status.logs,
        LogEvent {
            time: Utc::now(),
            kind: kind.to_string(),
            task,
            message: message.to_string(),
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DroneState;
    use std::collections::VecDeque;
    use tempfile::TempDir;

    fn sample_status(dir_name: &str) -> DroneStatus {
        DroneStatus {
            drone: dir_name.to_string(),
            plan_ref: PathBuf::from("plan.md"),
            worktree_path: PathBuf::from("/tmp/x"),
            branch: "hive/x".into(),
            base_branch: None,
            profile: "default".into(),
            model: "sonnet".into(),
            local_mode: false,
            status: DroneState::Starting,
            total: 2,
            completed: vec![],
            failed: vec![],
            current_task: None,
            blocked_reason: None,
            logs: VecDeque::new(),
            created_at: Utc::now(),
            started_at: None,
            last_resumed_at: None,
            updated_at: Utc::now(),
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn store_and_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let status = sample_status("demo");
        store_status(tmp.path(), &status).unwrap();
        let loaded = load_status(tmp.path()).unwrap();
        assert_eq!(loaded.drone, "demo");
        assert_eq!(loaded.total, 2);
        // No leftover temp file.
        let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn pid_lifecycle() {
        let tmp = TempDir::new().unwrap();
        assert!(read_pid(tmp.path()).is_none());
        write_pid(tmp.path(), 4242).unwrap();
        assert_eq!(read_pid(tmp.path()), Some(4242));
        clear_pid(tmp.path()).unwrap();
        assert!(read_pid(tmp.path()).is_none());
        // clearing an already-absent pid file is a no-op, not an error.
        clear_pid(tmp.path()).unwrap();
    }

    #[test]
    fn attempt_numbers_are_monotonic_with_no_gaps() {
        let tmp = TempDir::new().unwrap();
        let (_f1, a1) = open_attempt_log(tmp.path(), 1).unwrap();
        let (_f2, a2) = open_attempt_log(tmp.path(), 1).unwrap();
        let (_f3, a3) = open_attempt_log(tmp.path(), 1).unwrap();
        assert_eq!((a1, a2, a3), (1, 2, 3));

        let (_f, other_task_a1) = open_attempt_log(tmp.path(), 2).unwrap();
        assert_eq!(other_task_a1, 1);
    }

    #[test]
    fn activity_log_is_append_only() {
        let tmp = TempDir::new().unwrap();
        append_activity(tmp.path(), "drone_created", "hello").unwrap();
        append_activity(tmp.path(), "drone_started", "world").unwrap();
        let contents = std::fs::read_to_string(activity_log_path(tmp.path())).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.contains("drone_created"));
        assert!(contents.contains("drone_started"));
    }

    #[test]
    fn list_attempts_discovers_every_task() {
        let tmp = TempDir::new().unwrap();
        open_attempt_log(tmp.path(), 1).unwrap();
        open_attempt_log(tmp.path(), 1).unwrap();
        open_attempt_log(tmp.path(), 2).unwrap();
        let mut attempts = list_attempts(tmp.path());
        attempts.sort();
        assert_eq!(attempts, vec![(1, 1), (1, 2), (2, 1)]);
    }
}

//! Shared data model (see spec §3: Plan, Task, Drone, DroneStatus, Attempt).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;

/// Task kind. The first task of a plan must be `Setup`, the last `Pr`;
/// everything else defaults to `Work`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Setup,
    #[default]
    Work,
    Pr,
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskType::Setup => write!(f, "setup"),
            TaskType::Work => write!(f, "work"),
            TaskType::Pr => write!(f, "pr"),
        }
    }
}

/// One task in a plan's `## Tasks` section.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// 1-based position in the plan.
    pub index: usize,
    pub title: String,
    pub body: String,
    pub task_type: TaskType,
    pub model: Option<String>,
    pub parallel: bool,
    pub files: Vec<String>,
    pub depends_on: Vec<usize>,
}

/// A validated, in-memory plan (spec §3 Plan, §4.2 Plan Loader).
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub id: String,
    pub title: String,
    pub goal: String,
    pub tasks: Vec<Task>,
    pub definition_of_done: Vec<String>,
    pub target_branch: Option<String>,
    pub base_branch: Option<String>,
}

impl Plan {
    pub fn default_branch(&self) -> String {
        self.target_branch
            .clone()
            .unwrap_or_else(|| format!("hive/{}", self.id))
    }
}

/// The legacy serialized plan shape accepted for backward compatibility
/// (spec §4.2).
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyPlan {
    pub id: String,
    #[serde(alias = "name")]
    pub title: String,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub tasks: Vec<LegacyTask>,
    pub target_branch: Option<String>,
    pub base_branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub task_type: Option<TaskType>,
}

/// Drone execution state (spec §3 DroneStatus, §4.6 Lifecycle Engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DroneState {
    Starting,
    InProgress,
    Resuming,
    Completed,
    Failed,
    Blocked,
    Stopped,
    /// Never persisted — a derived display state (spec §4.7 reconciliation table).
    Zombie,
}

impl std::fmt::Display for DroneState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DroneState::Starting => "starting",
            DroneState::InProgress => "in_progress",
            DroneState::Resuming => "resuming",
            DroneState::Completed => "completed",
            DroneState::Failed => "failed",
            DroneState::Blocked => "blocked",
            DroneState::Stopped => "stopped",
            DroneState::Zombie => "zombie",
        };
        write!(f, "{s}")
    }
}

/// One entry in the bounded ring of recent events kept inline in the status
/// record (spec §3: "logs — a bounded ring of structured events").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub time: DateTime<Utc>,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<usize>,
    pub message: String,
}

/// Maximum entries kept in `DroneStatus::logs` (spec §4.4 policy: 500).
pub const LOG_RING_CAPACITY: usize = 500;

/// Append an event to a bounded ring, evicting the oldest entry once full.
pub fn push_ring(ring: &mut VecDeque<LogEvent>, event: LogEvent) {
    if ring.len() >= LOG_RING_CAPACITY {
        ring.pop_front();
    }
    ring.push_back(event);
}

/// The mutable, atomically-rewritten per-drone progress record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroneStatus {
    pub drone: String,
    pub plan_ref: PathBuf,
    pub worktree_path: PathBuf,
    pub branch: String,
    pub base_branch: Option<String>,
    pub profile: String,
    pub model: String,
    pub local_mode: bool,
    pub status: DroneState,
    pub total: usize,
    #[serde(default)]
    pub completed: Vec<usize>,
    #[serde(default)]
    pub failed: Vec<FailedTask>,
    #[serde(default)]
    pub current_task: Option<usize>,
    #[serde(default)]
    pub blocked_reason: Option<String>,
    #[serde(default)]
    pub logs: VecDeque<LogEvent>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_resumed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    /// Keys this version doesn't know about yet, preserved on rewrite.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedTask {
    pub task: usize,
    pub reason: String,
}

impl DroneStatus {
    /// §3 invariant: `|completed| + |failed| <= total`.
    pub fn within_progress_bounds(&self) -> bool {
        self.completed.len() + self.failed.len() <= self.total
    }

    /// §3 invariant: `current_task` only set while running.
    pub fn current_task_valid(&self) -> bool {
        if self.current_task.is_some() {
            matches!(
                self.status,
                DroneState::InProgress | DroneState::Resuming
            )
        } else {
            true
        }
    }

    /// §3 invariant: `blocked_reason` required iff `status == Blocked`.
    pub fn blocked_reason_valid(&self) -> bool {
        self.blocked_reason.is_some() == (self.status == DroneState::Blocked)
    }
}

/// One execution of one task (spec §3 Attempt).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptMeta {
    pub task: usize,
    pub attempt: u32,
    pub model: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: Option<f64>,
    pub exit_code: Option<i32>,
    pub iteration: u32,
}

/// A named invocation recipe for the assistant binary (spec §3 Profile).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub description: Option<String>,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            description: Some("Default assistant profile".to_string()),
            command: "claude".to_string(),
            args: Vec::new(),
        }
    }
}

/// Two-tier configuration record (spec §4.1). Used for both the user-level
/// and project-level config files; unknown fields round-trip via `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    pub version: String,
    #[serde(default)]
    pub worktree_base: Option<String>,
    #[serde(default)]
    pub profiles: std::collections::BTreeMap<String, Profile>,
    #[serde(default = "default_profile_name")]
    pub default_profile: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_profile_name() -> String {
    "default".to_string()
}

impl Default for UserConfig {
    fn default() -> Self {
        let mut profiles = std::collections::BTreeMap::new();
        profiles.insert("default".to_string(), Profile::default());
        Self {
            version: "1".to_string(),
            worktree_base: None,
            profiles,
            default_profile: default_profile_name(),
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub version: String,
    pub project_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drone_status_round_trips_through_json() {
        let status = DroneStatus {
            drone: "demo".into(),
            plan_ref: PathBuf::from(".hive/plans/demo.md"),
            worktree_path: PathBuf::from("/tmp/demo"),
            branch: "hive/demo".into(),
            base_branch: Some("main".into()),
            profile: "default".into(),
            model: "sonnet".into(),
            local_mode: false,
            status: DroneState::Starting,
            total: 3,
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
        };
        let json = serde_json::to_string_pretty(&status).unwrap();
        let parsed: DroneStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.drone, "demo");
        assert_eq!(parsed.status, DroneState::Starting);
        assert!(parsed.within_progress_bounds());
        assert!(parsed.current_task_valid());
        assert!(parsed.blocked_reason_valid());
    }

    #[test]
    fn forward_compatible_extra_fields_survive_round_trip() {
        let json = r#"{
            "drone": "demo", "plan_ref": "a.md", "worktree_path": "/tmp/demo",
            "branch": "hive/demo", "base_branch": null, "profile": "default",
            "model": "sonnet", "local_mode": false, "status": "starting",
            "total": 1, "created_at": "2024-01-01T00:00:00Z",
            "started_at": null, "last_resumed_at": null,
            "updated_at": "2024-01-01T00:00:00Z",
            "future_field": "kept"
        }"#;
        let status: DroneStatus = serde_json::from_str(json).unwrap();
        assert_eq!(
            status.extra.get("future_field").and_then(|v| v.as_str()),
            Some("kept")
        );
        let back = serde_json::to_string(&status).unwrap();
        assert!(back.contains("future_field"));
    }

    #[test]
    fn log_ring_evicts_oldest_when_full() {
        let mut ring = VecDeque::new();
        for i in 0..LOG_RING_CAPACITY + 10 {
            push_ring(
                &mut ring,
                LogEvent {
                    time: Utc::now(),
                    kind: "test".into(),
                    task: None,
                    message: format!("event {i}"),
                },
            );
        }
        assert_eq!(ring.len(), LOG_RING_CAPACITY);
        assert_eq!(ring.front().unwrap().message, "event 10");
    }

    #[test]
    fn blocked_status_requires_reason() {
        let mut status_json = serde_json::json!({
            "drone": "demo", "plan_ref": "a.md", "worktree_path": "/tmp/demo",
            "branch": "hive/demo", "base_branch": null, "profile": "default",
            "model": "sonnet", "local_mode": false, "status": "blocked",
            "total": 1, "created_at": "2024-01-01T00:00:00Z",
            "started_at": null, "last_resumed_at": null,
            "updated_at": "2024-01-01T00:00:00Z"
        });
        let status: DroneStatus =
            serde_json::from_value(status_json.clone()).unwrap();
        assert!(!status.blocked_reason_valid());

        status_json["blocked_reason"] = serde_json::json!("waiting on input");
        let status: DroneStatus = serde_json::from_value(status_json).unwrap();
        assert!(status.blocked_reason_valid());
    }
}

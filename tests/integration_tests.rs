//! Broader end-to-end coverage: a full init -> start -> list -> stop -> clean
//! workflow across several drones at once, plus the legacy JSON plan shape
//! staying accepted alongside the markdown one.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn get_binary_path() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.push("hive");
    path
}

const TEST_PLAN: &str = "# Test Plan\n\n\
## Goal\n\nBuild the test drone.\n\n\
## Tasks\n\n\
### 1. Environment Setup\n- type: setup\n\nSet up the environment.\n\n\
### 2. Do the work\n\nDo the work.\n\n\
### 3. Open PR\n- type: pr\n\nOpen the pull request.\n\n\
## Definition of Done\n\n- [ ] tests pass\n";

const LEGACY_PLAN_JSON: &str = r#"{
    "id": "legacy-demo",
    "title": "Legacy Demo",
    "plan": "Ship the legacy path.",
    "tasks": [
        {"title": "Environment Setup", "task_type": "setup"},
        {"title": "Do work"},
        {"title": "Open PR", "task_type": "pr"}
    ]
}"#;

fn setup_test_env(test_name: &str) -> PathBuf {
    use std::time::SystemTime;
    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_nanos();

    let temp_dir = std::env::temp_dir().join(format!(
        "hive-test-integration-{}-{}-{}",
        test_name,
        std::process::id(),
        timestamp
    ));
    if temp_dir.exists() {
        fs::remove_dir_all(&temp_dir).unwrap();
    }
    fs::create_dir_all(&temp_dir).unwrap();

    Command::new("git").args(["init"]).current_dir(&temp_dir).output().unwrap();

    let binary = get_binary_path();
    let init = Command::new(&binary)
        .args(["init"])
        .current_dir(&temp_dir)
        .env("HIVE_SKIP_PROMPTS", "1")
        .output()
        .unwrap();
    assert!(init.status.success(), "init failed: {}", String::from_utf8_lossy(&init.stderr));

    temp_dir
}

fn cleanup(path: &PathBuf) {
    if path.exists() {
        fs::remove_dir_all(path).ok();
    }
}

#[test]
fn test_complete_hive_workflow() {
    let binary = get_binary_path();
    let temp_dir = setup_test_env("complete");
    fs::write(temp_dir.join(".hive/plans/test-drone.md"), TEST_PLAN).unwrap();

    let start = Command::new(&binary)
        .args(["start", "test-drone", "--local", "--dry-run"])
        .current_dir(&temp_dir)
        .output()
        .unwrap();
    assert!(start.status.success(), "start failed: {}", String::from_utf8_lossy(&start.stderr));

    let drone_dir = temp_dir.join(".hive/drones/test-drone");
    assert!(drone_dir.join("status").exists());
    assert!(drone_dir.join("activity.log").exists());

    let list = Command::new(&binary).args(["list"]).current_dir(&temp_dir).output().unwrap();
    assert!(list.status.success());
    assert!(String::from_utf8_lossy(&list.stdout).contains("test-drone"));

    let stop = Command::new(&binary)
        .args(["stop", "test-drone"])
        .current_dir(&temp_dir)
        .output()
        .unwrap();
    assert!(stop.status.success());

    let clean = Command::new(&binary)
        .args(["clean", "test-drone", "--force"])
        .current_dir(&temp_dir)
        .output()
        .unwrap();
    assert!(clean.status.success());
    assert!(!drone_dir.exists());

    cleanup(&temp_dir);
}

#[test]
fn test_multiple_drones_workflow() {
    let binary = get_binary_path();
    let temp_dir = setup_test_env("multiple");

    for i in 1..=3 {
        let name = format!("drone-{i}");
        fs::write(temp_dir.join(format!(".hive/plans/{name}.md")), TEST_PLAN).unwrap();
        let start = Command::new(&binary)
            .args(["start", &name, "--local", "--dry-run"])
            .current_dir(&temp_dir)
            .output()
            .unwrap();
        assert!(start.status.success(), "start {name} failed: {}", String::from_utf8_lossy(&start.stderr));
    }

    let list = Command::new(&binary).args(["list"]).current_dir(&temp_dir).output().unwrap();
    assert!(list.status.success());
    let stdout = String::from_utf8_lossy(&list.stdout);
    for i in 1..=3 {
        assert!(stdout.contains(&format!("drone-{i}")));
    }

    cleanup(&temp_dir);
}

#[test]
fn test_legacy_json_plan_is_still_accepted() {
    let binary = get_binary_path();
    let temp_dir = setup_test_env("legacy");
    fs::write(temp_dir.join(".hive/plans/legacy-demo.json"), LEGACY_PLAN_JSON).unwrap();

    let start = Command::new(&binary)
        .args(["start", "legacy-demo", "--local", "--dry-run"])
        .current_dir(&temp_dir)
        .output()
        .unwrap();
    assert!(
        start.status.success(),
        "legacy plan start failed: {}",
        String::from_utf8_lossy(&start.stderr)
    );
    assert!(temp_dir.join(".hive/drones/legacy-demo/status").exists());

    cleanup(&temp_dir);
}

#[test]
fn test_activity_log_accumulates_across_stop_and_resume() {
    let binary = get_binary_path();
    let temp_dir = setup_test_env("activity-log");
    fs::write(temp_dir.join(".hive/plans/test-drone.md"), TEST_PLAN).unwrap();

    let start = Command::new(&binary)
        .args(["start", "test-drone", "--local", "--dry-run"])
        .current_dir(&temp_dir)
        .output()
        .unwrap();
    assert!(start.status.success());

    let stop = Command::new(&binary)
        .args(["stop", "test-drone"])
        .current_dir(&temp_dir)
        .output()
        .unwrap();
    assert!(stop.status.success());

    let resume = Command::new(&binary)
        .args(["start", "test-drone", "--local", "--dry-run"])
        .current_dir(&temp_dir)
        .output()
        .unwrap();
    assert!(resume.status.success());
    assert!(String::from_utf8_lossy(&resume.stdout).contains("would resume"));

    let activity = fs::read_to_string(temp_dir.join(".hive/drones/test-drone/activity.log")).unwrap();
    assert!(activity.contains("drone_started"));
    assert!(activity.contains("drone_stopped"));
    assert!(activity.contains("drone_resumed"));

    cleanup(&temp_dir);
}

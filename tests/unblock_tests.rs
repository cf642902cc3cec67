//! `hive unblock`: a blocked drone records a reason, `unblock` writes a
//! resolution marker and respawns it, and resuming an unblocked drone
//! transitions the status record back to `resuming`.

use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

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

struct Env {
    repo: PathBuf,
    home: PathBuf,
}

impl Env {
    fn hive(&self) -> Command {
        let mut cmd = Command::new(get_binary_path());
        cmd.current_dir(&self.repo).env("HOME", &self.home);
        cmd
    }
}

fn setup(test_name: &str) -> Env {
    use std::time::SystemTime;
    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let root = std::env::temp_dir().join(format!(
        "hive-test-unblock-{}-{}-{}",
        test_name,
        std::process::id(),
        timestamp
    ));
    if root.exists() {
        fs::remove_dir_all(&root).unwrap();
    }
    let repo = root.join("repo");
    let home = root.join("home");
    fs::create_dir_all(&repo).unwrap();
    fs::create_dir_all(&home).unwrap();

    for args in [vec!["init"], vec!["config", "user.email", "test@example.com"], vec![
        "config", "user.name", "Test User",
    ]] {
        Command::new("git").args(args).current_dir(&repo).output().unwrap();
    }
    fs::write(repo.join("README.md"), "test").unwrap();
    Command::new("git").args(["add", "."]).current_dir(&repo).output().unwrap();
    Command::new("git")
        .args(["commit", "-m", "initial"])
        .current_dir(&repo)
        .output()
        .unwrap();

    let env = Env { repo, home };

    let init = env.hive().args(["init"]).env("HIVE_SKIP_PROMPTS", "1").output().unwrap();
    assert!(init.status.success(), "init failed: {}", String::from_utf8_lossy(&init.stderr));

    let stub = env.home.join("stub-assistant.sh");
    fs::write(&stub, "#!/bin/sh\nsleep 30\n").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&stub).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&stub, perms).unwrap();
    }
    let add_profile = env
        .hive()
        .args(["profile", "add", "sleeper", stub.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(
        add_profile.status.success(),
        "profile add failed: {}",
        String::from_utf8_lossy(&add_profile.stderr)
    );

    fs::write(env.repo.join(".hive/plans/demo.md"), TEST_PLAN).unwrap();
    env
}

fn cleanup(env: &Env) {
    let _ = env.hive().args(["stop", "demo"]).output();
    let _ = env.hive().args(["clean", "demo", "--force"]).output();
    if let Some(root) = env.repo.parent() {
        fs::remove_dir_all(root).ok();
    }
}

fn mark_blocked(env: &Env, reason: &str) {
    let status_path = env.repo.join(".hive/drones/demo/status");
    let mut raw: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&status_path).unwrap()).unwrap();
    raw["status"] = serde_json::Value::String("blocked".to_string());
    raw["blocked_reason"] = serde_json::Value::String(reason.to_string());
    fs::write(&status_path, serde_json::to_string_pretty(&raw).unwrap()).unwrap();
}

#[test]
fn test_unblock_respawns_and_writes_resolution_marker() {
    let env = setup("respawn");

    let start = env
        .hive()
        .args(["start", "demo", "--local", "--profile", "sleeper"])
        .output()
        .unwrap();
    assert!(start.status.success(), "start failed: {}", String::from_utf8_lossy(&start.stderr));

    std::thread::sleep(Duration::from_millis(300));
    let stop = env.hive().args(["stop", "demo"]).output().unwrap();
    assert!(stop.status.success());

    mark_blocked(&env, "needs a decision");

    let unblock = env
        .hive()
        .args(["unblock", "demo", "--resolution", "go ahead with option A"])
        .output()
        .unwrap();
    assert!(
        unblock.status.success(),
        "unblock failed: {}",
        String::from_utf8_lossy(&unblock.stderr)
    );
    let stdout = String::from_utf8_lossy(&unblock.stdout);
    assert!(stdout.contains("Resumed"));

    let drone_dir = env.repo.join(".hive/drones/demo");
    let resolution = fs::read_to_string(drone_dir.join("resolution")).unwrap();
    assert_eq!(resolution, "go ahead with option A");

    let status: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(drone_dir.join("status")).unwrap()).unwrap();
    assert_eq!(status["status"], "resuming");

    let activity = fs::read_to_string(drone_dir.join("activity.log")).unwrap();
    assert!(activity.contains("unblocked"));

    std::thread::sleep(Duration::from_millis(300));
    cleanup(&env);
}

#[test]
fn test_unblock_on_non_blocked_drone_is_a_noop() {
    let env = setup("not-blocked");

    let start = env
        .hive()
        .args(["start", "demo", "--local", "--dry-run"])
        .output()
        .unwrap();
    assert!(start.status.success());

    let unblock = env
        .hive()
        .args(["unblock", "demo", "--resolution", "whatever"])
        .output()
        .unwrap();
    assert!(unblock.status.success());
    let stdout = String::from_utf8_lossy(&unblock.stdout);
    assert!(stdout.contains("is not blocked"));

    cleanup(&env);
}

#[test]
fn test_unblock_nonexistent_drone_fails() {
    let env = setup("noexist");

    let unblock = env
        .hive()
        .args(["unblock", "nope", "--resolution", "whatever"])
        .output()
        .unwrap();
    assert!(!unblock.status.success());
    let stderr = String::from_utf8_lossy(&unblock.stderr);
    assert!(stderr.contains("no such drone"));

    cleanup(&env);
}

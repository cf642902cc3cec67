//! Process Supervisor (spec §4.5, component C5): launches the drone child
//! detached from the CLI, captures its output, and handles liveness/stop.

use crate::error::HiveError;
use crate::state;
use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Bounded waits for the stop escalation sequence (spec §4.5, §5).
pub const INTERRUPT_WAIT: Duration = Duration::from_secs(5);
pub const TERMINATE_WAIT: Duration = Duration::from_secs(5);
pub const KILL_WAIT: Duration = Duration::from_secs(2);

pub struct SpawnConfig<'a> {
    pub drone_name: &'a str,
    pub drone_dir: &'a Path,
    pub worktree_path: &'a Path,
    pub plan_path: &'a Path,
    pub command: &'a str,
    pub args: &'a [String],
    pub model: &'a str,
    pub extra_env: &'a [(String, String)],
}

/// Spawn the assistant as a detached child: working directory is the
/// worktree, stdout/stderr redirect to `drone.log`, environment carries the
/// fixed set of `HIVE_*` vars plus the plan path (spec §4.5, §6).
pub fn spawn(config: &SpawnConfig) -> Result<Child> {
    let log_path = state::drone_log_path(config.drone_dir);
    let log_file = File::create(&log_path)
        .with_context(|| format!("creating {}", log_path.display()))?;

    let mut cmd = Command::new(config.command);
    cmd.args(config.args)
        .arg("--model")
        .arg(config.model)
        .current_dir(config.worktree_path)
        .env("HIVE_DRONE_NAME", config.drone_name)
        .env("HIVE_DRONE_DIR", config.drone_dir)
        .env("HIVE_PLAN_PATH", config.plan_path)
        .stdin(Stdio::null())
        .stdout(log_file.try_clone().context("cloning log file handle")?)
        .stderr(log_file);

    for (key, value) in config.extra_env {
        cmd.env(key, value);
    }

    detach_new_session(&mut cmd);

    let child = cmd.spawn().with_context(|| {
        format!(
            "spawning assistant binary '{}' (is it installed and on PATH?)",
            config.command
        )
    })?;

    info!(drone = config.drone_name, pid = child.id(), "spawned drone process");
    Ok(child)
}

#[cfg(unix)]
fn detach_new_session(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    unsafe {
        cmd.pre_exec(|| {
            // Detach from the CLI's controlling terminal so CLI exit
            // doesn't signal the child (spec §4.5: "new session").
            nix::unistd::setsid().map_err(|e| std::io::Error::from_raw_os_error(e as i32))?;
            Ok(())
        });
    }
}

#[cfg(not(unix))]
fn detach_new_session(_cmd: &mut Command) {}

/// §4.5: a process with that pid exists.
pub fn process_exists(pid: u32) -> bool {
    #[cfg(unix)]
    {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;
        match kill(Pid::from_raw(pid as i32), None) {
            Ok(()) => true,
            Err(nix::errno::Errno::ESRCH) => false,
            Err(_) => true,
        }
    }
    #[cfg(not(unix))]
    {
        PathBuf::from(format!("/proc/{pid}")).exists()
    }
}

/// §4.5 Liveness detection: pid file present AND process exists.
/// (Binary-name matching is a platform-specific refinement we skip here —
/// the pid+existence check is what the reconciliation table in §4.7 keys
/// off of.)
pub fn is_live(drone_dir: &Path) -> bool {
    match state::read_pid(drone_dir) {
        Some(pid) => process_exists(pid),
        None => false,
    }
}

#[derive(Debug)]
pub enum StopOutcome {
    /// Was not live; clearing the pid file (if any) was the only action.
    NotRunning,
    StoppedBySignal { signal: &'static str, after: Duration },
    StillAlive { pid: u32 },
}

#[cfg(unix)]
fn send_signal(pid: u32, sig: nix::sys::signal::Signal) {
    let _ = nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), sig);
}

/// Graceful stop: interrupt, wait T1; terminate, wait T2; kill, wait T3.
/// Idempotent — stopping a non-live drone is a no-op that still clears the
/// pid file (spec §4.5, tested property #3).
pub fn stop(drone_dir: &Path) -> Result<StopOutcome> {
    let Some(pid) = state::read_pid(drone_dir) else {
        return Ok(StopOutcome::NotRunning);
    };
    if !process_exists(pid) {
        state::clear_pid(drone_dir)?;
        return Ok(StopOutcome::NotRunning);
    }

    #[cfg(unix)]
    {
        use nix::sys::signal::Signal;
        let stages: [(Signal, Duration, &'static str); 3] = [
            (Signal::SIGINT, INTERRUPT_WAIT, "SIGINT"),
            (Signal::SIGTERM, TERMINATE_WAIT, "SIGTERM"),
            (Signal::SIGKILL, KILL_WAIT, "SIGKILL"),
        ];
        for (signal, wait, label) in stages {
            send_signal(pid, signal);
            let start = Instant::now();
            while start.elapsed() < wait {
                if !process_exists(pid) {
                    state::clear_pid(drone_dir)?;
                    info!(pid, signal = label, elapsed = ?start.elapsed(), "drone stopped");
                    return Ok(StopOutcome::StoppedBySignal {
                        signal: label,
                        after: start.elapsed(),
                    });
                }
                std::thread::sleep(Duration::from_millis(100));
            }
            warn!(pid, signal = label, "drone still alive after escalation step");
        }
        Ok(StopOutcome::StillAlive { pid })
    }

    #[cfg(not(unix))]
    {
        Err(anyhow::anyhow!(HiveError::invariant(
            "signal escalation is only implemented on unix"
        )))
    }
}

pub fn stop_or_fail(drone_dir: &Path) -> Result<()> {
    match stop(drone_dir)? {
        StopOutcome::StillAlive { pid } => Err(anyhow::anyhow!(HiveError::invariant(format!(
            "could not stop process {pid}: escalation exhausted"
        )))),
        _ => Ok(()),
    }
}

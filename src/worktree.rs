//! Worktree Manager (spec §4.3, component C3).

use crate::error::HiveError;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

pub enum ReuseOutcome {
    Fresh,
    ResumedExisting,
}

/// Result of probing an existing worktree for reuse (spec §4.3
/// `ensure_reusable`).
pub enum ReuseRefusal {
    BranchMismatch { found: String, expected: String },
    ProcessRunning { pid: i32 },
    Dirty,
}

impl std::fmt::Display for ReuseRefusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReuseRefusal::BranchMismatch { found, expected } => write!(
                f,
                "worktree is on branch '{found}', expected '{expected}'"
            ),
            ReuseRefusal::ProcessRunning { pid } => {
                write!(f, "a process (pid {pid}) is still using this worktree")
            }
            ReuseRefusal::Dirty => write!(f, "worktree has uncommitted changes"),
        }
    }
}

fn git(args: &[&str], cwd: Option<&Path>) -> Result<std::process::Output> {
    let mut cmd = Command::new("git");
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    cmd.output()
        .with_context(|| format!("running git {}", args.join(" ")))
}

fn ref_exists(reference: &str, cwd: Option<&Path>) -> bool {
    git(&["rev-parse", "--verify", reference], cwd)
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Probe `main`, `master`, `develop` in order (spec §4.3 step 1).
pub fn auto_detect_base_branch(cwd: Option<&Path>) -> Result<String> {
    for candidate in ["main", "master", "develop"] {
        if ref_exists(candidate, cwd) || ref_exists(&format!("origin/{candidate}"), cwd) {
            return Ok(candidate.to_string());
        }
    }
    anyhow::bail!(
        HiveError::not_found("no base branch found (tried main, master, develop)")
    )
}

/// Materialize a worktree at `path` on a new branch derived from
/// `base_branch` (spec §4.3 `create`).
pub fn create(
    path: &Path,
    branch: &str,
    base_branch: Option<&str>,
    repo_root: &Path,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let base = match base_branch {
        Some(b) => b.to_string(),
        None => auto_detect_base_branch(Some(repo_root))?,
    };

    let remote_base = format!("origin/{base}");
    let resolved_base = if ref_exists(&remote_base, Some(repo_root)) {
        remote_base
    } else {
        base
    };

    let output = git(
        &[
            "worktree",
            "add",
            "-b",
            branch,
            path.to_str().context("worktree path is not valid UTF-8")?,
            &resolved_base,
        ],
        Some(repo_root),
    )?;

    if !output.status.success() {
        anyhow::bail!(
            HiveError::vcs(
                format!("creating worktree '{}'", path.display()),
                String::from_utf8_lossy(&output.stderr).trim().to_string()
            )
        );
    }
    Ok(())
}

pub fn exists(path: &Path) -> bool {
    path.join(".git").exists()
}

fn current_branch(worktree: &Path) -> Option<String> {
    let output = git(&["rev-parse", "--abbrev-ref", "HEAD"], Some(worktree)).ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// A worktree's `.hive` entry is a symlink Hive itself manages (see
/// `link_hive_dir`), not user content, and untracked-symlink porcelain lines
/// for it shouldn't count toward dirtiness.
fn is_dirty(worktree: &Path) -> bool {
    let Ok(output) = git(&["status", "--porcelain"], Some(worktree)) else {
        return true;
    };
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .any(|line| line.get(3..) != Some(".hive"))
}

/// spec §4.3 `ensure_reusable`: reuse iff the worktree is on
/// `target_branch`, no live PID is recorded, and the tree is clean.
pub fn ensure_reusable(
    path: &Path,
    target_branch: &str,
    live_pid: Option<i32>,
) -> Result<Result<ReuseOutcome, ReuseRefusal>> {
    if !exists(path) {
        return Ok(Ok(ReuseOutcome::Fresh));
    }

    if let Some(pid) = live_pid {
        return Ok(Err(ReuseRefusal::ProcessRunning { pid }));
    }

    let branch = current_branch(path)
        .ok_or_else(|| anyhow::anyhow!(HiveError::vcs(
            format!("reading branch of {}", path.display()),
            "git rev-parse failed".to_string()
        )))?;
    if branch != target_branch {
        return Ok(Err(ReuseRefusal::BranchMismatch {
            found: branch,
            expected: target_branch.to_string(),
        }));
    }

    if is_dirty(path) {
        return Ok(Err(ReuseRefusal::Dirty));
    }

    Ok(Ok(ReuseOutcome::ResumedExisting))
}

/// Remove the working copy and (best-effort) the branch. Resilient to a
/// partially deleted filesystem state (spec §4.3 `remove`).
pub fn remove(path: &Path, branch: &str, repo_root: &Path) -> Result<()> {
    if path.exists() {
        let output = git(
            &[
                "worktree",
                "remove",
                "--force",
                path.to_str().unwrap_or_default(),
            ],
            Some(repo_root),
        );
        match output {
            Ok(o) if !o.status.success() => {
                // Fall back to a plain directory removal — the worktree
                // metadata may already be gone even though the directory
                // remains (or vice versa).
                let _ = std::fs::remove_dir_all(path);
            }
            Err(_) => {
                let _ = std::fs::remove_dir_all(path);
            }
            _ => {}
        }
    }
    let _ = git(&["worktree", "prune"], Some(repo_root));
    let _ = git(&["branch", "-D", branch], Some(repo_root));
    Ok(())
}

pub fn project_name(repo_root: &Path) -> Result<String> {
    repo_root
        .file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_string())
        .context("resolving project name from repo root")
}

/// Create a `.hive` symlink inside the worktree pointing back at the
/// project's own `.hive` directory so the drone child can read its plan and
/// write its own status without needing the full repo path.
pub fn link_hive_dir(worktree: &Path, project_root: &Path) -> Result<()> {
    let target = project_root.join(".hive");
    let link = worktree.join(".hive");
    if link.exists() || link.is_symlink() {
        if link.is_dir() && !link.is_symlink() {
            std::fs::remove_dir_all(&link)?;
        } else {
            std::fs::remove_file(&link)?;
        }
    }
    #[cfg(unix)]
    std::os::unix::fs::symlink(&target, &link)
        .with_context(|| format!("symlinking {} -> {}", link.display(), target.display()))?;
    let _ = PathBuf::from(&link); // keep `link` used on non-unix builds too
    Ok(())
}

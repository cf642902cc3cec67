//! `hive init` (spec §6): create the `.hive/` structure in the current git
//! repository and, on first run anywhere, the user-level config.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use dialoguer::{Confirm, Input};
use std::path::PathBuf;

use crate::config;

pub fn run() -> Result<()> {
    if !is_git_repo()? {
        bail!("Not a git repository. Please run 'git init' first.");
    }

    println!("{}", "Initializing Hive...".bright_blue());

    let root = std::env::current_dir().context("reading current directory")?;
    let project_name = get_project_name()?;
    let created = config::init_project(&root, &project_name)?;

    if created {
        println!("  {} Created .hive directory structure", "✓".green());
    } else {
        println!("  {} .hive already initialized", "→".yellow());
    }

    add_to_gitignore(".hive/")?;
    println!("  {} Updated .gitignore", "✓".green());

    let skip_prompts = std::env::var("HIVE_SKIP_PROMPTS").is_ok();
    if config::load_user_config().map(|c| c.profiles.is_empty()).unwrap_or(true) {
        println!("\n{}", "First-time setup".bright_yellow().bold());

        let worktree_base = if skip_prompts
            || Confirm::new()
                .with_prompt("Use default worktree location (~/.hive/worktrees)?")
                .default(true)
                .interact()?
        {
            dirs::home_dir().context("resolving home directory")?.join(".hive/worktrees")
        } else {
            let input: String = Input::new()
                .with_prompt("Enter custom worktree base directory")
                .interact_text()?;
            PathBuf::from(input)
        };

        let mut user_config = config::load_user_config().unwrap_or_default();
        user_config.worktree_base = Some(worktree_base.to_string_lossy().to_string());
        config::save_user_config(&user_config).context("writing user config")?;
        println!("  {} Created user config at ~/.config/hive/config", "✓".green());
    }

    println!(
        "\n{} Hive initialized for project '{}'",
        "✓".green().bold(),
        project_name.bright_cyan()
    );
    println!("\nNext steps:");
    println!("  1. Write a plan in .hive/plans/<name>.md");
    println!("  2. Run 'hive start <name>' to launch a drone");

    Ok(())
}

fn is_git_repo() -> Result<bool> {
    let output = std::process::Command::new("git")
        .args(["rev-parse", "--git-dir"])
        .output()
        .context("running git rev-parse")?;
    Ok(output.status.success())
}

fn get_project_name() -> Result<String> {
    if let Ok(output) = std::process::Command::new("git")
        .args(["remote", "get-url", "origin"])
        .output()
    {
        if output.status.success() {
            let url = String::from_utf8_lossy(&output.stdout);
            if let Some(name) = extract_repo_name(&url) {
                return Ok(name);
            }
        }
    }
    std::env::current_dir()?
        .file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_string())
        .context("resolving directory name")
}

fn extract_repo_name(url: &str) -> Option<String> {
    let url = url.trim();
    url.split('/')
        .next_back()
        .map(|s| s.trim_end_matches(".git").to_string())
}

fn add_to_gitignore(pattern: &str) -> Result<()> {
    let path = PathBuf::from(".gitignore");
    let content = if path.exists() {
        std::fs::read_to_string(&path).context("reading .gitignore")?
    } else {
        String::new()
    };
    if content.lines().any(|line| line.trim() == pattern) {
        return Ok(());
    }
    let new_content = if content.is_empty() || content.ends_with('\n') {
        format!("{content}{pattern}\n")
    } else {
        format!("{content}\n{pattern}\n")
    };
    std::fs::write(&path, new_content).context("writing .gitignore")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_repo_name_from_various_url_shapes() {
        assert_eq!(
            extract_repo_name("https://github.com/user/repo.git"),
            Some("repo".to_string())
        );
        assert_eq!(
            extract_repo_name("git@github.com:user/repo.git"),
            Some("repo".to_string())
        );
        assert_eq!(
            extract_repo_name("https://github.com/user/repo"),
            Some("repo".to_string())
        );
    }
}

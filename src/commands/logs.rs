//! `hive logs <name>` (spec §6): read `activity.log`, or a specific task's
//! attempt log with `--attempt N`.

use anyhow::{bail, Context, Result};
use colored::Colorize;

use crate::state;
use crate::streamer::{self, Tail};

pub fn run(name: String, task: Option<usize>, attempt: Option<u32>, follow: bool, raw: bool) -> Result<()> {
    let root = super::project_root()?;
    let drone_dir = crate::config::drone_dir(&root, &name);
    if !drone_dir.exists() {
        bail!("no such drone: {name}");
    }

    let mut tail = match task {
        Some(task) => {
            let attempts = streamer::read_attempts(&drone_dir);
            let attempt = attempt.unwrap_or_else(|| {
                attempts
                    .iter()
                    .filter(|(t, _, _)| *t == task)
                    .map(|(_, a, _)| *a)
                    .max()
                    .unwrap_or(1)
            });
            Tail::new(state::attempt_log_path(&drone_dir, task, attempt))
        }
        None => streamer::tail_drone_log(&drone_dir),
    };

    print_new_lines(&mut tail, raw)?;
    if !follow {
        return Ok(());
    }
    loop {
        std::thread::sleep(std::time::Duration::from_millis(500));
        print_new_lines(&mut tail, raw)?;
    }
}

fn print_new_lines(tail: &mut Tail, raw: bool) -> Result<()> {
    for line in tail.poll().context("tailing log")? {
        if raw {
            println!("{line}");
        } else {
            println!("{}", format_line(&line));
        }
    }
    Ok(())
}

fn format_line(line: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(line) {
        Ok(v) => {
            let kind = v.get("type").and_then(|t| t.as_str()).unwrap_or("event");
            format!("[{}] {}", kind.bright_blue(), v)
        }
        Err(_) => line.to_string(),
    }
}

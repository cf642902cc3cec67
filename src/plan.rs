//! Plan Loader (spec §4.2, component C2).
//!
//! Parses both the structured-markdown plan shape and the legacy JSON shape
//! into a validated [`Plan`], never executing shell and never mutating the
//! source file.

use crate::error::HiveError;
use crate::types::{LegacyPlan, Plan, Task, TaskType};
use anyhow::{Context, Result};
use std::path::Path;

pub fn load(path: &Path) -> Result<Plan> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading plan {}", path.display()))?;

    let id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("plan")
        .to_string();

    let plan = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => parse_legacy(&id, &content)?,
        _ => parse_markdown(&id, &content)?,
    };

    validate(&plan)?;
    Ok(plan)
}

fn parse_legacy(_id: &str, content: &str) -> Result<Plan> {
    let legacy: LegacyPlan =
        serde_json::from_str(content).context("parsing legacy JSON plan")?;
    let tasks = legacy
        .tasks
        .iter()
        .enumerate()
        .map(|(i, t)| Task {
            index: i + 1,
            title: t.title.clone(),
            body: t.description.clone(),
            task_type: t.task_type.unwrap_or(TaskType::Work),
            model: None,
            parallel: true,
            files: Vec::new(),
            depends_on: Vec::new(),
        })
        .collect();
    Ok(Plan {
        id: legacy.id,
        title: legacy.title,
        goal: legacy.plan,
        tasks,
        definition_of_done: Vec::new(),
        target_branch: legacy.target_branch,
        base_branch: legacy.base_branch,
    })
}

/// Frontmatter block: `---\nkey: value\n---` at the top of the file,
/// recognizing only `target_branch` / `base_branch` (spec §4.2).
fn parse_frontmatter(content: &str) -> (Option<String>, Option<String>, &str) {
    let Some(rest) = content.strip_prefix("---\n") else {
        return (None, None, content);
    };
    let Some(end) = rest.find("\n---") else {
        return (None, None, content);
    };
    let frontmatter = &rest[..end];
    let body_start = end + 4;
    let body = rest[body_start..].trim_start_matches('\n');

    let mut target_branch = None;
    let mut base_branch = None;
    for line in frontmatter.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            let value = value.trim().trim_matches('"').to_string();
            match key {
                "target_branch" => target_branch = Some(value),
                "base_branch" => base_branch = Some(value),
                _ => {}
            }
        }
    }
    (target_branch, base_branch, body)
}

fn section(body: &str, heading: &str) -> Option<String> {
    let lines: Vec<&str> = body.lines().collect();
    let start = lines
        .iter()
        .position(|l| l.trim().eq_ignore_ascii_case(heading))?;
    let end = lines
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, l)| {
            let t = l.trim();
            t.starts_with("## ") && !t.starts_with("### ")
        })
        .map(|(i, _)| i)
        .unwrap_or(lines.len());
    Some(lines[start + 1..end].join("\n").trim().to_string())
}

fn parse_markdown(id: &str, content: &str) -> Result<Plan> {
    let (target_branch, base_branch, body) = parse_frontmatter(content);

    let title = body
        .lines()
        .find(|l| l.starts_with("# "))
        .map(|l| l.trim_start_matches("# ").trim().to_string())
        .unwrap_or_else(|| id.to_string());

    let goal = section(body, "## Goal").ok_or_else(|| {
        anyhow::anyhow!(HiveError::user_input(format!(
            "plan '{id}' is missing a '## Goal' section"
        )))
    })?;

    let dod_section = section(body, "## Definition of Done").ok_or_else(|| {
        anyhow::anyhow!(HiveError::user_input(format!(
            "plan '{id}' is missing a '## Definition of Done' section"
        )))
    })?;
    let definition_of_done = dod_section
        .lines()
        .filter_map(|l| {
            let t = l.trim();
            t.strip_prefix("- [ ]")
                .or_else(|| t.strip_prefix("- [x]"))
                .or_else(|| t.strip_prefix("-"))
                .map(|s| s.trim().to_string())
        })
        .filter(|s| !s.is_empty())
        .collect();

    let tasks_start = body
        .lines()
        .position(|l| l.trim().eq_ignore_ascii_case("## tasks"))
        .ok_or_else(|| {
            anyhow::anyhow!(HiveError::user_input(format!(
                "plan '{id}' is missing a '## Tasks' section"
            )))
        })?;
    let tasks = parse_tasks(body, tasks_start, id)?;

    Ok(Plan {
        id: id.to_string(),
        title,
        goal,
        tasks,
        definition_of_done,
        target_branch,
        base_branch,
    })
}

fn parse_tasks(body: &str, tasks_heading_idx: usize, plan_id: &str) -> Result<Vec<Task>> {
    let lines: Vec<&str> = body.lines().collect();
    let tasks_end = lines
        .iter()
        .enumerate()
        .skip(tasks_heading_idx + 1)
        .find(|(_, l)| {
            let t = l.trim();
            t.starts_with("## ") && !t.starts_with("### ")
        })
        .map(|(i, _)| i)
        .unwrap_or(lines.len());
    let task_lines = &lines[tasks_heading_idx + 1..tasks_end];

    let mut headings: Vec<(usize, usize, String)> = Vec::new(); // (offset, number, title)
    for (i, line) in task_lines.iter().enumerate() {
        if let Some((number, title)) = parse_task_heading(line) {
            headings.push((i, number, title));
        }
    }

    if headings.is_empty() {
        anyhow::bail!(
            HiveError::user_input(format!(
                "plan '{plan_id}' has a '## Tasks' section but no '### N. Title' entries"
            ))
        );
    }

    let mut tasks = Vec::with_capacity(headings.len());
    for (idx, (offset, number, title)) in headings.iter().enumerate() {
        let end = headings
            .get(idx + 1)
            .map(|(o, _, _)| *o)
            .unwrap_or(task_lines.len());
        let task = parse_single_task(*number, title.clone(), &task_lines[offset + 1..end]);
        tasks.push(task);
    }
    Ok(tasks)
}

fn parse_task_heading(line: &str) -> Option<(usize, String)> {
    let rest = line.trim().strip_prefix("### ")?;
    let dot = rest.find('.')?;
    let number: usize = rest[..dot].trim().parse().ok()?;
    let title = rest[dot + 1..].trim().to_string();
    if title.is_empty() {
        None
    } else {
        Some((number, title))
    }
}

fn parse_single_task(number: usize, title: String, lines: &[&str]) -> Task {
    let mut task_type = TaskType::Work;
    let mut model = None;
    let mut parallel = true;
    let mut files = Vec::new();
    let mut depends_on = Vec::new();
    let mut body_lines = Vec::new();
    let mut in_metadata = true;

    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            in_metadata = false;
            body_lines.push(*line);
            continue;
        }
        if in_metadata {
            if let Some(rest) = trimmed.strip_prefix("- ") {
                if let Some((key, value)) = rest.split_once(':') {
                    let key = key.trim().to_lowercase();
                    let value = value.trim();
                    match key.as_str() {
                        "type" => {
                            task_type = match value.to_lowercase().as_str() {
                                "setup" => TaskType::Setup,
                                "pr" => TaskType::Pr,
                                _ => TaskType::Work,
                            };
                            continue;
                        }
                        "model" => {
                            model = Some(value.to_string());
                            continue;
                        }
                        "parallel" => {
                            parallel = value.eq_ignore_ascii_case("true");
                            continue;
                        }
                        "files" => {
                            files = value
                                .split(',')
                                .map(|s| s.trim().to_string())
                                .filter(|s| !s.is_empty())
                                .collect();
                            continue;
                        }
                        "depends_on" => {
                            depends_on = value
                                .split(',')
                                .filter_map(|s| s.trim().parse::<usize>().ok())
                                .collect();
                            continue;
                        }
                        _ => {}
                    }
                }
            }
            in_metadata = false;
        }
        body_lines.push(*line);
    }

    Task {
        index: number,
        title,
        body: body_lines.join("\n").trim().to_string(),
        task_type,
        model,
        parallel,
        files,
        depends_on,
    }
}

/// Enforce the §3 Plan invariants.
fn validate(plan: &Plan) -> Result<()> {
    if plan.tasks.is_empty() {
        anyhow::bail!(
            HiveError::user_input(format!("plan '{}' has zero tasks", plan.id))
        );
    }

    let first = &plan.tasks[0];
    if first.task_type != TaskType::Setup {
        anyhow::bail!(
            HiveError::user_input(format!(
                "plan '{}': task 1 ('{}') must have type=setup",
                plan.id, first.title
            ))
        );
    }

    let last = plan.tasks.last().unwrap();
    if last.task_type != TaskType::Pr {
        anyhow::bail!(
            HiveError::user_input(format!(
                "plan '{}': task {} ('{}') must have type=pr",
                plan.id, last.index, last.title
            ))
        );
    }

    for task in &plan.tasks {
        for &dep in &task.depends_on {
            if dep >= task.index {
                anyhow::bail!(
                    HiveError::user_input(format!(
                        "plan '{}': task {} depends_on {dep}, which is not a prior task",
                        plan.id, task.index
                    ))
                );
            }
            if !plan.tasks.iter().any(|t| t.index == dep) {
                anyhow::bail!(
                    HiveError::user_input(format!(
                        "plan '{}': task {} depends_on unknown task {dep}",
                        plan.id, task.index
                    ))
                );
            }
        }
    }

    Ok(())
}

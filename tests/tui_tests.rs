//! Rendering coverage for the dashboard's drone list (mirrors
//! `tui::dashboard::render_list`) and the state-to-color mapping it's built
//! on, driven through `ratatui::backend::TestBackend` against real
//! `DroneStatus`/`DroneSnapshot` values rather than a mocked shape.

use chrono::Utc;
use hive_lib::aggregator::DroneSnapshot;
use hive_lib::tui::theme;
use hive_lib::types::{DroneState, DroneStatus};
use ratatui::{
    backend::TestBackend,
    layout::{Constraint, Layout},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Terminal,
};
use std::collections::VecDeque;

fn render_to_string<F>(width: u16, height: u16, render_fn: F) -> String
where
    F: FnOnce(&mut ratatui::Frame),
{
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal.draw(|f| render_fn(f)).unwrap();
    let buffer = terminal.backend().buffer().clone();
    let mut result = String::new();
    for y in 0..height {
        for x in 0..width {
            result.push_str(buffer[(x, y)].symbol());
        }
        if y < height - 1 {
            result.push('\n');
        }
    }
    result
}

fn snapshot(name: &str, effective_state: DroneState, completed: usize, total: usize, branch: &str) -> DroneSnapshot {
    let status = DroneStatus {
        drone: name.to_string(),
        plan_ref: format!(".hive/plans/{name}.md").into(),
        worktree_path: format!("/tmp/hive/{name}").into(),
        branch: branch.to_string(),
        base_branch: Some("main".to_string()),
        profile: "default".to_string(),
        model: "sonnet".to_string(),
        local_mode: false,
        status: effective_state,
        total,
        completed: (1..=completed).collect(),
        failed: Vec::new(),
        current_task: None,
        blocked_reason: None,
        logs: VecDeque::new(),
        created_at: Utc::now(),
        started_at: Some(Utc::now()),
        last_resumed_at: None,
        updated_at: Utc::now(),
        extra: serde_json::Map::new(),
    };
    DroneSnapshot {
        name: name.to_string(),
        progress: (completed, total),
        running_duration: None,
        last_activity: None,
        effective_state,
        status,
    }
}

/// Same layout `dashboard::render_list` builds, kept local since that
/// function is private to the `tui` module.
fn render_drone_list(frame: &mut ratatui::Frame, snapshots: &[DroneSnapshot]) {
    let items: Vec<ListItem> = snapshots
        .iter()
        .map(|snap| {
            let color = theme::state_color(snap.effective_state);
            let line = Line::from(vec![
                Span::styled(format!("{:<18}", snap.name), Style::default()),
                Span::styled(format!("{:<12}", snap.effective_state.to_string()), Style::default().fg(color)),
                Span::raw(format!("{}/{}  {}", snap.progress.0, snap.progress.1, snap.status.branch)),
            ]);
            ListItem::new(line)
        })
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" drones "));
    frame.render_widget(list, frame.area());
}

#[test]
fn state_color_matches_the_reconciliation_table_severity() {
    assert_eq!(theme::state_color(DroneState::Completed), theme::ACCENT_SUCCESS);
    assert_eq!(theme::state_color(DroneState::Failed), theme::ACCENT_ERROR);
    assert_eq!(theme::state_color(DroneState::Zombie), theme::ACCENT_ERROR);
    assert_eq!(theme::state_color(DroneState::Blocked), theme::ACCENT_WARNING);
    assert_eq!(theme::state_color(DroneState::InProgress), theme::ACCENT_INFO);
    assert_eq!(theme::state_color(DroneState::Resuming), theme::ACCENT_INFO);
    assert_eq!(theme::state_color(DroneState::Starting), theme::ACCENT_INFO);
    assert_eq!(theme::state_color(DroneState::Stopped), theme::FG_MUTED);
}

#[test]
fn dashboard_list_renders_single_drone_with_progress_and_branch() {
    let snapshots = vec![snapshot("test-drone", DroneState::InProgress, 2, 5, "hive/test-drone")];
    let output = render_to_string(80, 10, |f| render_drone_list(f, &snapshots));

    assert!(output.contains("test-drone"));
    assert!(output.contains("in_progress"));
    assert!(output.contains("2/5"));
    assert!(output.contains("hive/test-drone"));
}

#[test]
fn dashboard_list_renders_multiple_drones_in_scan_order() {
    let snapshots = vec![
        snapshot("frontend", DroneState::InProgress, 1, 3, "hive/frontend"),
        snapshot("backend", DroneState::Completed, 3, 3, "hive/backend"),
        snapshot("database", DroneState::Zombie, 1, 5, "hive/database"),
    ];
    let output = render_to_string(80, 10, |f| render_drone_list(f, &snapshots));

    for name in ["frontend", "backend", "database"] {
        assert!(output.contains(name), "missing {name} in:\n{output}");
    }
    let frontend_row = output.lines().find(|l| l.contains("frontend")).unwrap();
    let database_row = output.lines().find(|l| l.contains("database")).unwrap();
    assert!(output.find(frontend_row) < output.find(database_row));
}

#[test]
fn dashboard_list_shows_zero_total_as_zero_over_zero() {
    let snapshots = vec![snapshot("empty-plan", DroneState::Starting, 0, 0, "hive/empty-plan")];
    let output = render_to_string(80, 10, |f| render_drone_list(f, &snapshots));
    assert!(output.contains("0/0"));
}

#[test]
fn layout_splits_leave_room_for_a_one_line_footer() {
    let backend = TestBackend::new(80, 24);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal
        .draw(|f| {
            let chunks = Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).split(f.area());
            assert_eq!(chunks[1].height, 1);
            assert!(chunks[0].height >= 3);
        })
        .unwrap();
}

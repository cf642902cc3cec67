//! Dashboard view: list of drones with progress and state, selectable;
//! `u` launches the Unblock Workflow on a blocked drone, `Enter` opens the
//! Session Viewer, `q` quits (spec §4.9).

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};
use std::path::Path;
use std::time::Instant;

use super::{theme, unblock_workflow, POLL_TIMEOUT_MS, REFRESH_INTERVAL};
use crate::aggregator::{self, DroneSnapshot};

struct State {
    snapshots: Vec<DroneSnapshot>,
    list_state: ListState,
    last_refresh: Instant,
    message: Option<String>,
}

impl State {
    fn refresh(&mut self, root: &Path) {
        if let Ok(snapshots) = aggregator::scan(root) {
            let selected_name = self
                .list_state
                .selected()
                .and_then(|i| self.snapshots.get(i))
                .map(|s| s.name.clone());
            self.snapshots = snapshots;
            let new_index = selected_name
                .and_then(|name| self.snapshots.iter().position(|s| s.name == name))
                .unwrap_or(0);
            if self.snapshots.is_empty() {
                self.list_state.select(None);
            } else {
                self.list_state.select(Some(new_index.min(self.snapshots.len() - 1)));
            }
        }
        self.last_refresh = Instant::now();
    }

    fn selected(&self) -> Option<&DroneSnapshot> {
        self.list_state.selected().and_then(|i| self.snapshots.get(i))
    }

    fn move_selection(&mut self, delta: isize) {
        if self.snapshots.is_empty() {
            return;
        }
        let current = self.list_state.selected().unwrap_or(0) as isize;
        let len = self.snapshots.len() as isize;
        let next = (current + delta).rem_euclid(len);
        self.list_state.select(Some(next as usize));
    }
}

pub fn run<B: Backend>(terminal: &mut Terminal<B>, root: &Path) -> Result<()> {
    let mut state = State {
        snapshots: Vec::new(),
        list_state: ListState::default(),
        last_refresh: Instant::now() - REFRESH_INTERVAL,
        message: None,
    };

    loop {
        if state.last_refresh.elapsed() >= REFRESH_INTERVAL {
            state.refresh(root);
        }
        terminal.draw(|f| render(f, &mut state))?;

        if event::poll(std::time::Duration::from_millis(POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
                {
                    break;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Down | KeyCode::Char('j') => state.move_selection(1),
                    KeyCode::Up | KeyCode::Char('k') => state.move_selection(-1),
                    KeyCode::Char('u') => {
                        if let Some(snap) = state.selected() {
                            if snap.effective_state == crate::types::DroneState::Blocked {
                                let name = snap.name.clone();
                                unblock_workflow::run(terminal, root, &name)?;
                                state.refresh(root);
                            } else {
                                state.message = Some(format!("'{}' is not blocked", snap.name));
                            }
                        }
                    }
                    KeyCode::Enter => {
                        if let Some(snap) = state.selected() {
                            let name = snap.name.clone();
                            super::session_viewer::run(terminal, root, Some(&name))?;
                        }
                    }
                    _ => {}
                }
            }
        }
    }
    Ok(())
}

fn render(frame: &mut Frame, state: &mut State) {
    let area = frame.area();
    let chunks = Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).split(area);
    render_list(frame, chunks[0], state);
    render_footer(frame, chunks[1], state);
}

fn render_list(frame: &mut Frame, area: Rect, state: &mut State) {
    let items: Vec<ListItem> = state
        .snapshots
        .iter()
        .map(|snap| {
            let color = theme::state_color(snap.effective_state);
            let line = Line::from(vec![
                Span::styled(format!("{:<18}", snap.name), Style::default()),
                Span::styled(
                    format!("{:<12}", snap.effective_state.to_string()),
                    Style::default().fg(color),
                ),
                Span::raw(format!("{}/{}  {}", snap.progress.0, snap.progress.1, snap.status.branch)),
            ]);
            ListItem::new(line)
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme::BORDER_FOCUSED))
                .title(" drones "),
        )
        .highlight_style(Style::default().bg(theme::SELECTION_BG).add_modifier(Modifier::BOLD));

    frame.render_stateful_widget(list, area, &mut state.list_state);
}

fn render_footer(frame: &mut Frame, area: Rect, state: &State) {
    let text = state
        .message
        .clone()
        .unwrap_or_else(|| "j/k move  Enter sessions  u unblock  q quit".to_string());
    frame.render_widget(Paragraph::new(text).style(Style::default().fg(theme::FG_MUTED)), area);
}

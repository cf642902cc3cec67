//! Session Viewer: ordered turns of a chosen session transcript, with
//! scroll and search (spec §4.9).

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use ratatui::{Frame, Terminal};
use std::path::Path;

use super::{theme, POLL_TIMEOUT_MS};
use crate::streamer::{self, SessionLine, SessionTurn};

struct State {
    lines: Vec<SessionLine>,
    scroll: usize,
    search: Option<String>,
}

fn turn_text(turn: &SessionTurn) -> (String, &'static str, Color) {
    match turn {
        SessionTurn::SystemInit { subtype } => {
            (subtype.clone().unwrap_or_default(), "system/init", theme::FG_MUTED)
        }
        SessionTurn::User { message } => (message.to_string(), "user", Color::Cyan),
        SessionTurn::Assistant { message } => (message.to_string(), "assistant", Color::Magenta),
        SessionTurn::ToolUse { name, input } => (format!("{name} {input}"), "tool_use", Color::Yellow),
        SessionTurn::ToolResult { content } => (content.to_string(), "tool_result", Color::Green),
        SessionTurn::Result { result } => (
            result.as_ref().map(|r| r.to_string()).unwrap_or_default(),
            "result",
            Color::Blue,
        ),
        SessionTurn::Usage { usage } => (usage.to_string(), "usage", theme::FG_MUTED),
        SessionTurn::SessionCompleted => (String::new(), "session.completed", theme::FG_MUTED),
        SessionTurn::Other => (String::new(), "other", theme::FG_MUTED),
    }
}

fn matches_search(line: &SessionLine, needle: &str) -> bool {
    let text = match line {
        SessionLine::Turn(turn) => turn_text(turn).0,
        SessionLine::Unrecognized(v) => v.to_string(),
    };
    text.to_lowercase().contains(&needle.to_lowercase())
}

pub fn run<B: Backend>(terminal: &mut Terminal<B>, root: &Path, drone: Option<&str>) -> Result<()> {
    let Some(name) = drone else {
        return Ok(());
    };
    let drone_dir = crate::config::drone_dir(root, name);
    let attempts = streamer::read_attempts(&drone_dir);
    let Some((task, attempt, _)) = attempts.into_iter().next() else {
        return Ok(());
    };
    let path = crate::state::attempt_log_path(&drone_dir, task, attempt);
    let lines = streamer::load_session_transcript(&path).unwrap_or_default();

    let mut state = State {
        lines,
        scroll: 0,
        search: None,
    };

    loop {
        terminal.draw(|f| render(f, &state, name))?;
        if event::poll(std::time::Duration::from_millis(POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
                {
                    break;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => break,
                    KeyCode::Down | KeyCode::Char('j') => {
                        state.scroll = (state.scroll + 1).min(state.lines.len().saturating_sub(1))
                    }
                    KeyCode::Up | KeyCode::Char('k') => state.scroll = state.scroll.saturating_sub(1),
                    KeyCode::Char('/') => {
                        state.search = Some(String::new());
                    }
                    KeyCode::Char(c) if state.search.is_some() => {
                        state.search.as_mut().unwrap().push(c);
                    }
                    KeyCode::Backspace if state.search.is_some() => {
                        state.search.as_mut().unwrap().pop();
                    }
                    KeyCode::Enter if state.search.is_some() => {
                        if let Some(needle) = state.search.clone() {
                            if let Some(pos) = state.lines.iter().position(|l| matches_search(l, &needle)) {
                                state.scroll = pos;
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }
    Ok(())
}

fn render(frame: &mut Frame, state: &State, name: &str) {
    let area = frame.area();
    let chunks = Layout::vertical([Constraint::Min(3), Constraint::Length(1)]).split(area);

    let items: Vec<ListItem> = state
        .lines
        .iter()
        .map(|line| match line {
            SessionLine::Turn(turn) => {
                let (text, kind, color) = turn_text(turn);
                ListItem::new(Line::from(vec![
                    Span::styled(format!("[{kind}] "), Style::default().fg(color)),
                    Span::raw(text),
                ]))
            }
            SessionLine::Unrecognized(v) => {
                ListItem::new(Line::from(Span::styled(v.to_string(), Style::default().fg(theme::FG_MUTED))))
            }
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" session: {name} ")),
    );
    frame.render_widget(list, chunks[0]);

    let footer = match &state.search {
        Some(needle) => format!("search: {needle}_"),
        None => "j/k scroll  / search  q quit".to_string(),
    };
    frame.render_widget(Paragraph::new(footer).style(Style::default().fg(theme::FG_MUTED)), chunks[1]);
}

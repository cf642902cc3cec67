//! Unblock Workflow: surfaces `blocked_reason` and collects a resolution
//! string to respawn the drone with (spec §4.9).

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::{Frame, Terminal};
use std::path::Path;

use super::theme;
use crate::lifecycle;

pub fn run<B: Backend>(terminal: &mut Terminal<B>, root: &Path, name: &str) -> Result<()> {
    let drone_dir = crate::config::drone_dir(root, name);
    let status = crate::state::load_status(&drone_dir)?;
    let reason = status.blocked_reason.clone().unwrap_or_default();
    let mut input = String::new();
    let mut message = None;

    loop {
        terminal.draw(|f| render(f, name, &reason, &input, &message))?;
        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Esc => return Ok(()),
                KeyCode::Enter => {
                    if !input.trim().is_empty() {
                        lifecycle::unblock(root, name, &input)?;
                        return Ok(());
                    }
                    message = Some("resolution cannot be empty".to_string());
                }
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Char(c) => input.push(c),
                _ => {}
            }
        }
    }
}

fn render(frame: &mut Frame, name: &str, reason: &str, input: &str, message: &Option<String>) {
    let area = frame.area();
    let chunks = Layout::vertical([
        Constraint::Length(5),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .split(area);

    frame.render_widget(
        Paragraph::new(reason.to_string())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" blocked: {name} ")),
            )
            .style(Style::default().fg(theme::ACCENT_WARNING)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(format!("{input}_")).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" resolution (Enter to resume, Esc to cancel) "),
        ),
        chunks[1],
    );
    if let Some(msg) = message {
        frame.render_widget(
            Paragraph::new(msg.clone()).style(Style::default().fg(theme::ACCENT_ERROR)),
            chunks[2],
        );
    }
}

//! A small fixed palette, grounded in the same dark-theme conventions as
//! the rest of the presenter layer.

use ratatui::style::Color;

pub const BORDER_FOCUSED: Color = Color::Cyan;
pub const ACCENT_SUCCESS: Color = Color::Green;
pub const ACCENT_WARNING: Color = Color::Yellow;
pub const ACCENT_ERROR: Color = Color::Red;
pub const ACCENT_INFO: Color = Color::Cyan;
pub const FG_MUTED: Color = Color::DarkGray;
pub const SELECTION_BG: Color = Color::Rgb(40, 44, 52);

use crate::types::DroneState;

pub fn state_color(state: DroneState) -> Color {
    match state {
        DroneState::Completed => ACCENT_SUCCESS,
        DroneState::Failed | DroneState::Zombie => ACCENT_ERROR,
        DroneState::Blocked => ACCENT_WARNING,
        DroneState::InProgress | DroneState::Resuming | DroneState::Starting => ACCENT_INFO,
        DroneState::Stopped => FG_MUTED,
    }
}

//! Shared UI theme constants.

use ratatui::style::Color;
use vllmtop::types::ServerState;

// Scrollbar colors (same look as before)
pub const SB_TRACK: Color = Color::Rgb(170, 170, 180);
pub const SB_THUMB: Color = Color::Rgb(170, 170, 180);

pub const SELECTED_BG: Color = Color::Rgb(40, 44, 60);

pub fn state_color(state: ServerState) -> Color {
    match state {
        ServerState::Running => Color::Green,
        ServerState::Stopped => Color::Gray,
        ServerState::Starting | ServerState::Stopping => Color::Yellow,
        ServerState::Error => Color::Red,
        ServerState::ShuttingDown => Color::Magenta,
    }
}

/// Green below `yellow`, yellow below `red`, red above.
pub fn threshold_color(value: f64, yellow: f64, red: f64) -> Color {
    if value >= red {
        Color::Red
    } else if value >= yellow {
        Color::Yellow
    } else {
        Color::Green
    }
}

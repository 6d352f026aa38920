//! Vertical scrollbar and keyboard scrolling shared by the model list and the
//! service log view.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::ui::theme::{SB_THUMB, SB_TRACK};

/// Handle keyboard scrolling (Up/Down/PageUp/PageDown/Home/End).
/// Returns true if the key was a scroll key.
pub fn handle_scroll_key(offset: &mut usize, key: KeyEvent, page: usize, total: usize) -> bool {
    let page = page.max(1);
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => *offset = offset.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => *offset = offset.saturating_add(1),
        KeyCode::PageUp => *offset = offset.saturating_sub(page),
        KeyCode::PageDown => *offset = offset.saturating_add(page),
        KeyCode::Home => *offset = 0,
        KeyCode::End => *offset = usize::MAX,
        _ => return false,
    }
    clamp_offset(offset, total, page);
    true
}

pub fn clamp_offset(offset: &mut usize, total: usize, view: usize) {
    let max_off = total.saturating_sub(view);
    if *offset > max_off {
        *offset = max_off;
    }
}

/// Draw a 1-column scrollbar in `area` for `total` rows with `view` visible.
pub fn draw_scrollbar(f: &mut ratatui::Frame<'_>, area: Rect, total: usize, view: usize, offset: usize) {
    if area.height < 1 {
        return;
    }
    let track = area.height as usize;
    let total = total.max(1);
    let view = view.clamp(1, total);
    let max_off = total.saturating_sub(view);
    let offset = offset.min(max_off);

    let thumb_len = (track * view).div_ceil(total).max(1).min(track);
    let thumb_top = if max_off == 0 {
        0
    } else {
        ((track - thumb_len) * offset + max_off / 2) / max_off
    };

    let lines: Vec<Line> = (0..track)
        .map(|i| {
            if i >= thumb_top && i < thumb_top + thumb_len {
                Line::from(Span::styled("█", Style::default().fg(SB_THUMB)))
            } else {
                Line::from(Span::styled("│", Style::default().fg(SB_TRACK)))
            }
        })
        .collect();
    f.render_widget(Paragraph::new(lines), area);
}

//! Model table: most recently used first, active marker, selection cursor and
//! a scrollbar.

use chrono::{Local, TimeZone};
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table},
};
use vllmtop::session::SessionState;

use crate::ui::scroll::draw_scrollbar;
use crate::ui::theme::SELECTED_BG;
use crate::ui::util::truncate_middle;

// Keep the header widths here so drawing and paging agree.
const COLS: [Constraint; 3] = [
    Constraint::Length(3),      // active marker
    Constraint::Percentage(60), // id
    Constraint::Min(16),        // last used
];

/// Rows that fit in the table body for a pane of `area`.
pub fn models_viewport_rows(area: Rect) -> usize {
    // borders (2) + header (1)
    area.height.saturating_sub(3) as usize
}

/// Offset that keeps `selected` visible.
pub fn follow_selection(offset: usize, selected: usize, view: usize) -> usize {
    let view = view.max(1);
    if selected < offset {
        selected
    } else if selected >= offset + view {
        selected + 1 - view
    } else {
        offset
    }
}

fn last_used_label(ts: Option<i64>) -> String {
    match ts.and_then(|t| Local.timestamp_millis_opt(t).single()) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => "never".into(),
    }
}

pub fn draw_models(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    s: &SessionState,
    selected: usize,
    scroll_offset: usize,
) {
    let title = format!("Models ({}) — ↑/↓ select, Enter switch", s.models.len());
    f.render_widget(Block::default().borders(Borders::ALL).title(title), area);

    let inner = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    };
    if inner.height < 2 || inner.width < 4 {
        return;
    }
    // reserve 2 columns for the scrollbar
    let content = Rect {
        width: inner.width.saturating_sub(2),
        ..inner
    };

    let total = s.models.len();
    let view = models_viewport_rows(area);
    let offset = scroll_offset.min(total.saturating_sub(view));
    let id_width = (content.width as usize * 60 / 100).max(4);

    let rows = s.models.iter().enumerate().skip(offset).take(view).map(|(i, m)| {
        let marker = if m.active { "●" } else { " " };
        let mut style = Style::default();
        if m.active {
            style = style.fg(Color::Green).add_modifier(Modifier::BOLD);
        }
        if i == selected {
            style = style.bg(SELECTED_BG);
        }
        Row::new(vec![
            Cell::from(marker),
            Cell::from(truncate_middle(&m.id, id_width)),
            Cell::from(last_used_label(s.usage.get(&m.id).copied()))
                .style(Style::default().fg(Color::DarkGray)),
        ])
        .style(style)
    });

    let header = Row::new(vec!["", "Model", "Last used"]).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    let table = Table::new(rows, COLS.to_vec()).header(header).column_spacing(1);
    f.render_widget(table, content);

    let bar = Rect {
        x: inner.x + inner.width.saturating_sub(1),
        y: inner.y + 1,
        width: 1,
        height: inner.height.saturating_sub(1),
    };
    draw_scrollbar(f, bar, total, view, offset);
}

//! Top header with server URL, state chip and the transition timer.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use vllmtop::session::SessionState;

use crate::ui::theme::state_color;
use crate::ui::util::format_elapsed;

pub fn draw_header(f: &mut ratatui::Frame<'_>, area: Rect, s: &SessionState, now_ms: i64) {
    let mut spans = vec![Span::styled(
        "vllmtop",
        Style::default().add_modifier(Modifier::BOLD),
    )];
    match s.server_url.as_deref() {
        Some(url) => spans.push(Span::raw(format!(" — {url}"))),
        None => spans.push(Span::raw(" — no server configured")),
    }
    if let Some(st) = s.status.as_ref() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!(" {} ", st.state.label()),
            Style::default()
                .fg(ratatui::style::Color::Black)
                .bg(state_color(st.state))
                .add_modifier(Modifier::BOLD),
        ));
        if let Some(ms) = s.elapsed_ms(now_ms) {
            spans.push(Span::raw(format!(" {}", format_elapsed(ms))));
        }
    } else if s.is_configured() {
        spans.push(Span::raw("  connecting..."));
    }
    if s.busy {
        spans.push(Span::styled(
            "  working…",
            Style::default().fg(ratatui::style::Color::Cyan),
        ));
    }
    spans.push(Span::raw("  (press 'q' to quit)"));
    f.render_widget(
        Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::BOTTOM)),
        area,
    );
}

//! Service status card and the unreachable banner.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use vllmtop::session::SessionState;

use crate::ui::theme::state_color;

pub fn draw_status(f: &mut ratatui::Frame<'_>, area: Rect, s: &SessionState) {
    let block = Block::default().borders(Borders::ALL).title("Service");
    let Some(st) = s.status.as_ref() else {
        let msg = if s.is_configured() { "Waiting for first status..." } else { "Press 'u' to set the server URL" };
        f.render_widget(Paragraph::new(msg).block(block), area);
        return;
    };

    let dim = Style::default().fg(Color::Gray);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("State  ", dim),
            Span::styled(
                st.state.label(),
                Style::default().fg(state_color(st.state)).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Model  ", dim),
            Span::raw(st.model.as_deref().unwrap_or("—")),
        ]),
    ];
    if let Some(since) = st.last_state_change_at.as_deref() {
        lines.push(Line::from(vec![Span::styled("Since  ", dim), Span::raw(since)]));
    }
    if let Some(err) = st.error.as_deref() {
        lines.push(Line::from(Span::styled(err, Style::default().fg(Color::Red))));
    }
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

pub fn draw_unreachable(f: &mut ratatui::Frame<'_>, area: Rect) {
    let p = Paragraph::new("Server unreachable. Check your connection and server URL.")
        .style(Style::default().fg(Color::Red))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        );
    f.render_widget(p, area);
}

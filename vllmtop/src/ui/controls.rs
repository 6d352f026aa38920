//! Footer: key hints for the service controls, or the pending error.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use vllmtop::session::SessionState;

const KEYS: [(&str, &str); 7] = [
    ("s", "start"),
    ("x", "stop"),
    ("r", "restart"),
    ("l", "logs"),
    ("u", "server URL"),
    ("S", "shutdown host"),
    ("q", "quit"),
];

pub fn draw_controls(f: &mut ratatui::Frame<'_>, area: Rect, s: &SessionState) {
    let block = Block::default().borders(Borders::ALL).title("Controls");
    if let Some(err) = s.last_error.as_deref() {
        let line = Line::from(vec![
            Span::styled(err, Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::styled("  (any key to dismiss)", Style::default().fg(Color::Gray)),
        ]);
        f.render_widget(Paragraph::new(line).block(block), area);
        return;
    }

    // controls are inert while an action is in flight
    let key_style = if s.busy {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    };
    let mut spans = Vec::with_capacity(KEYS.len() * 2);
    for (k, what) in KEYS {
        spans.push(Span::styled(format!("[{k}]"), key_style));
        spans.push(Span::raw(format!(" {what}  ")));
    }
    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

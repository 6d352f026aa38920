//! Popups drawn over the dashboard: server URL prompt, shutdown confirmation
//! and the service status viewer.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use vllmtop::session::SessionState;
use vllmtop::types::ServiceStatusDetails;

use crate::ui::scroll::draw_scrollbar;
use crate::ui::util::centered_rect;

pub fn draw_url_prompt(f: &mut ratatui::Frame<'_>, input: &str, error: Option<&str>, can_cancel: bool) {
    let area = centered_rect(60, 30, f.area());
    f.render_widget(Clear, area);
    let hint = if can_cancel { "Enter to save, Esc to cancel" } else { "Enter to save, Esc to quit" };
    let mut lines = vec![
        Line::from("Management server URL (e.g. http://192.168.1.10:9090):"),
        Line::from(""),
        Line::from(Span::styled(
            format!("> {input}_"),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(hint, Style::default().fg(Color::Gray))),
    ];
    if let Some(err) = error {
        lines.push(Line::from(Span::styled(err, Style::default().fg(Color::Red))));
    }
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Server")),
        area,
    );
}

pub fn draw_confirm_shutdown(f: &mut ratatui::Frame<'_>) {
    let area = centered_rect(50, 25, f.area());
    f.render_widget(Clear, area);
    let lines = vec![
        Line::from("Power off the management server host?"),
        Line::from(""),
        Line::from(Span::styled(
            "This stops vLLM and shuts the machine down.",
            Style::default().fg(Color::Red),
        )),
        Line::from(""),
        Line::from("y = shut down, any other key = cancel"),
    ];
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Confirm shutdown")),
        area,
    );
}

/// Flatten the two diagnostic blobs into display lines.
pub fn service_log_lines(d: &ServiceStatusDetails) -> Vec<String> {
    let mut out = vec![
        format!("{} — {} lines — generated {}", d.service, d.lines, d.generated_at),
        String::new(),
        "── systemctl status ──".to_string(),
    ];
    out.extend(d.systemctl_output.lines().map(str::to_string));
    out.push(String::new());
    out.push("── journal ──".to_string());
    out.extend(d.journal_output.lines().map(str::to_string));
    out
}

/// Area of the log body inside the popup (for paging).
pub fn service_log_body(frame_area: Rect) -> Rect {
    let area = centered_rect(90, 85, frame_area);
    Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(3),
        height: area.height.saturating_sub(2),
    }
}

pub fn draw_service_log(f: &mut ratatui::Frame<'_>, s: &SessionState, lines_req: u32, offset: usize) {
    let area = centered_rect(90, 85, f.area());
    f.render_widget(Clear, area);
    let loading = if s.service_status_loading { " (loading…)" } else { "" };
    let title = format!(
        "Service status — {lines_req} lines{loading} — +/- lines, R refresh, Esc close"
    );
    f.render_widget(Block::default().borders(Borders::ALL).title(title), area);

    let body = service_log_body(f.area());
    let Some(details) = s.service_status.as_ref() else {
        f.render_widget(Paragraph::new("Fetching service status..."), body);
        return;
    };
    let all = service_log_lines(details);
    let view = body.height as usize;
    let offset = offset.min(all.len().saturating_sub(view));
    let shown: Vec<Line> = all
        .iter()
        .skip(offset)
        .take(view)
        .map(|l| Line::from(l.as_str()))
        .collect();
    f.render_widget(Paragraph::new(shown), body);

    let bar = Rect {
        x: area.x + area.width.saturating_sub(2),
        y: body.y,
        width: 1,
        height: body.height,
    };
    draw_scrollbar(f, bar, all.len(), view, offset);
}

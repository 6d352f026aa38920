use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::Span,
    widgets::{Block, Borders, Gauge, Paragraph},
};
use vllmtop::types::GpuStats;

use crate::ui::theme::threshold_color;
use crate::ui::util::gb_from_mb;

pub fn draw_gpu(f: &mut ratatui::Frame<'_>, area: Rect, gpu: Option<&GpuStats>) {
    let mut area = area;
    let title = match gpu {
        Some(g) if g.gpu_count > 1 => format!("GPU ({}x)", g.gpu_count),
        _ => "GPU".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);
    f.render_widget(block, area);

    // Guard: need some space inside the block
    if area.height <= 2 || area.width <= 2 {
        return;
    }

    area.y += 1;
    area.height = area.height.saturating_sub(2);
    area.x += 1;
    area.width = area.width.saturating_sub(2);

    let Some(g) = gpu else {
        f.render_widget(Paragraph::new("No GPU stats"), area);
        return;
    };

    // One row each: load, vram, temperature.
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1); 3])
        .split(area);

    // Per bar horizontal layout: [label] [gauge] [value]
    let split_bar = |r: Rect| {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(6),  // label column
                Constraint::Min(8),     // gauge column
                Constraint::Length(24), // value column
            ])
            .split(r)
    };

    let util = g.utilization_percent.min(100) as f64;
    let mem_pct = g.memory_percent().clamp(0.0, 100.0);
    // gauge scale for temperature tops out at 100°C
    let temp = g.temperature_c.clamp(0, 100) as f64;

    let bars = [
        ("Load", util, threshold_color(util, 80.0, 95.0), format!("{}%", g.utilization_percent)),
        (
            "VRAM",
            mem_pct,
            threshold_color(mem_pct, 80.0, 95.0),
            format!(
                "{} / {} GB ({}%)",
                gb_from_mb(g.memory_used_mb),
                gb_from_mb(g.memory_total_mb),
                mem_pct.round() as u16
            ),
        ),
        ("Temp", temp, threshold_color(g.temperature_c as f64, 70.0, 85.0), format!("{}°C", g.temperature_c)),
    ];

    for (row, (label, pct, color, value)) in rows.iter().zip(bars) {
        let cols = split_bar(*row);
        f.render_widget(
            Paragraph::new(Span::raw(label)).style(Style::default().fg(Color::Gray)),
            cols[0],
        );
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(color))
            .label(Span::raw(""))
            .ratio(pct / 100.0);
        f.render_widget(gauge, cols[1]);
        f.render_widget(
            Paragraph::new(Span::raw(value)).style(Style::default().fg(Color::Gray)),
            cols[2],
        );
    }
}

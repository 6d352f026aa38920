//! Small UI helpers: durations, sizes, truncation, popup geometry.

use ratatui::layout::Rect;

/// `"{m}m {s}s"` once past a minute, else `"{s}s"`.
pub fn format_elapsed(ms: i64) -> String {
    let secs = ms.max(0) / 1000;
    let (m, s) = (secs / 60, secs % 60);
    if m > 0 {
        format!("{m}m {s}s")
    } else {
        format!("{s}s")
    }
}

pub fn gb_from_mb(mb: u64) -> String {
    format!("{:.1}", mb as f64 / 1024.0)
}

pub fn truncate_middle(s: &str, max: usize) -> String {
    let n = s.chars().count();
    if n <= max {
        return s.to_string();
    }
    if max <= 3 {
        return "...".into();
    }
    let keep = max - 3;
    let left = keep / 2;
    let right = keep - left;
    let head: String = s.chars().take(left).collect();
    let tail: String = s.chars().skip(n - right).collect();
    format!("{head}...{tail}")
}

/// Rect of `pct_x`/`pct_y` percent centred in `area`.
pub fn centered_rect(pct_x: u16, pct_y: u16, area: Rect) -> Rect {
    let w = area.width.saturating_mul(pct_x.min(100)) / 100;
    let h = area.height.saturating_mul(pct_y.min(100)) / 100;
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(0), "0s");
        assert_eq!(format_elapsed(59_999), "59s");
        assert_eq!(format_elapsed(61_000), "1m 1s");
        assert_eq!(format_elapsed(-5), "0s");
    }

    #[test]
    fn truncation_keeps_both_ends() {
        assert_eq!(truncate_middle("short", 10), "short");
        assert_eq!(truncate_middle("meta-llama-3-70b-instruct", 11), "meta...ruct");
        assert_eq!(truncate_middle("abcdef", 2), "...");
    }

    #[test]
    fn centered_rect_fits_inside() {
        let area = Rect::new(0, 0, 100, 40);
        let r = centered_rect(60, 50, area);
        assert_eq!(r, Rect::new(20, 10, 60, 20));
    }
}

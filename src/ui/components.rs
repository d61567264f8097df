/// Shared render helpers for the TUI.
use ratatui::style::{Color, Style};
use ratatui::text::Span;

/// Score color bands used across the detail view and ranking table.
pub fn score_color(score: f64) -> Color {
    if score >= 7.0 {
        Color::Green
    } else if score >= 4.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Styled span for a final score; unscored stocks render as "N/A".
pub fn score_span(score: f64, valid_count: usize) -> Span<'static> {
    if valid_count == 0 {
        Span::styled("N/A".to_string(), Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(
            format!("{score:.2}"),
            Style::default().fg(score_color(score)),
        )
    }
}

/// Format an optional metric with two decimals, em-dash when missing.
pub fn format_metric(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => "—".to_string(),
    }
}

/// Format large TL amounts compactly for table cells.
pub fn format_large_number(value: f64) -> String {
    if value >= 1_000_000_000_000.0 {
        format!("{:.1}T", value / 1_000_000_000_000.0)
    } else if value >= 1_000_000_000.0 {
        format!("{:.1}B", value / 1_000_000_000.0)
    } else if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{:.0}", value)
    }
}

pub fn format_large_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format_large_number(v),
        None => "—".to_string(),
    }
}

//! Style helpers for the Devscope TUI. One accent color, a handful of
//! state styles, no per-widget theming.

use ratatui::style::{Color, Modifier, Style};

use devscope_core::model::ServiceStatus;

pub const ACCENT: Color = Color::Rgb(125, 86, 244);

pub fn accent() -> Style {
    Style::default().fg(ACCENT)
}

pub fn title() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn text() -> Style {
    Style::default()
}

pub fn subtle() -> Style {
    Style::default().fg(Color::DarkGray)
}

pub fn key_hint() -> Style {
    Style::default().fg(Color::Rgb(206, 145, 120))
}

pub fn selected_row() -> Style {
    Style::default()
        .bg(Color::Rgb(38, 79, 120))
        .fg(Color::White)
}

pub fn operating_row() -> Style {
    Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::ITALIC)
}

pub fn error() -> Style {
    Style::default().fg(Color::Red)
}

pub fn status_style(s: ServiceStatus) -> Style {
    match s {
        ServiceStatus::Running => Style::default().fg(Color::Green),
        ServiceStatus::Unhealthy => Style::default().fg(Color::Yellow),
        ServiceStatus::Stopped => Style::default().fg(Color::DarkGray),
    }
}

pub fn status_icon(s: ServiceStatus) -> &'static str {
    match s {
        ServiceStatus::Running => "●",
        ServiceStatus::Unhealthy => "⚠",
        ServiceStatus::Stopped => "○",
    }
}

pub fn mode_badge(bg: Color) -> Style {
    Style::default()
        .bg(bg)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD)
}

pub fn truncate(s: &str, max: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max {
        return s.to_string();
    }
    if max <= 1 {
        return "…".into();
    }
    let mut out: String = chars.into_iter().take(max - 1).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly-ten", 11), "exactly-ten");
        assert_eq!(truncate("much-too-long-name", 8), "much-to…");
        assert_eq!(truncate("ab", 1), "…");
    }
}

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::ui::styles;

/// Static keyboard reference overlay.
pub struct HelpView {
    scroll: u16,
}

pub enum HelpOutcome {
    Stay,
    Exit,
}

const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Navigation",
        &[
            ("j / ↓", "Move down"),
            ("k / ↑", "Move up"),
            ("h / ←", "Focus sidebar"),
            ("l / → / Enter", "Focus main list"),
            ("1 / 2 / 3", "Jump to Containers / Processes / Databases"),
            ("Tab", "Toggle detail panel"),
        ],
    ),
    (
        "Actions (main list)",
        &[
            ("Enter", "Open action menu"),
            ("s", "Start / Stop toggle"),
            ("r", "Restart"),
            ("l", "View logs"),
            ("d", "Delete (with confirm)"),
            ("i", "Inspect JSON"),
        ],
    ),
    (
        "Modes",
        &[
            ("/", "Enter SEARCH mode"),
            (":", "Enter COMMAND mode"),
            ("?", "Open this help overlay"),
            ("Esc", "Return to NORMAL / clear filter"),
        ],
    ),
    ("Global", &[("q / Ctrl+C", "Quit")]),
];

impl HelpView {
    pub fn new() -> Self {
        Self { scroll: 0 }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> HelpOutcome {
        match key.code {
            KeyCode::Esc | KeyCode::Char('?') => HelpOutcome::Exit,
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                HelpOutcome::Stay
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll = self.scroll.saturating_add(1);
                HelpOutcome::Stay
            }
            _ => HelpOutcome::Stay,
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(area);

        f.render_widget(
            Paragraph::new(Line::styled("devscope — Keyboard Reference", styles::title())),
            chunks[0],
        );

        let mut lines = Vec::new();
        for (title, keys) in SECTIONS {
            lines.push(Line::styled(*title, styles::title()));
            for (key, desc) in *keys {
                lines.push(Line::from(vec![
                    Span::styled(format!("  {:<18}", key), styles::key_hint()),
                    Span::styled(*desc, styles::subtle()),
                ]));
            }
            lines.push(Line::raw(""));
        }

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(styles::accent());
        f.render_widget(
            Paragraph::new(lines).block(block).scroll((self.scroll, 0)),
            chunks[1],
        );

        f.render_widget(
            Paragraph::new(Line::styled("[↑/↓] scroll  [?/esc] close", styles::subtle())),
            chunks[2],
        );
    }
}

impl Default for HelpView {
    fn default() -> Self {
        Self::new()
    }
}

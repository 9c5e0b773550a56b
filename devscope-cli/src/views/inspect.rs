use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::effects::Effect;
use crate::ui::styles;

/// Scrollable pretty-printed container inspect payload.
pub struct InspectView {
    service_name: String,
    container_id: String,
    pub seq: u64,
    content: Vec<String>,
    error: Option<String>,
    ready: bool,
    scroll: u16,
}

pub enum InspectOutcome {
    Stay,
    Exit,
}

impl InspectView {
    pub fn new(service_name: String, container_id: String, seq: u64) -> Self {
        Self {
            service_name,
            container_id,
            seq,
            content: vec![],
            error: None,
            ready: false,
            scroll: 0,
        }
    }

    pub fn init(&self) -> Option<Effect> {
        Some(Effect::FetchInspect {
            container_id: self.container_id.clone(),
            seq: self.seq,
        })
    }

    pub fn on_result(&mut self, result: Result<String, String>) {
        match result {
            Ok(json) => {
                self.content = json.lines().map(|l| l.to_string()).collect();
                self.error = None;
            }
            Err(e) => self.error = Some(e),
        }
        self.ready = true;
        self.scroll = 0;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> InspectOutcome {
        match key.code {
            KeyCode::Esc => InspectOutcome::Exit,
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                InspectOutcome::Stay
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll = self.scroll.saturating_add(1).min(self.max_scroll());
                InspectOutcome::Stay
            }
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(10);
                InspectOutcome::Stay
            }
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_add(10).min(self.max_scroll());
                InspectOutcome::Stay
            }
            KeyCode::Char('g') => {
                self.scroll = 0;
                InspectOutcome::Stay
            }
            KeyCode::Char('G') => {
                self.scroll = self.max_scroll();
                InspectOutcome::Stay
            }
            _ => InspectOutcome::Stay,
        }
    }

    fn max_scroll(&self) -> u16 {
        self.content.len().saturating_sub(1).min(u16::MAX as usize) as u16
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
            Paragraph::new(Line::styled(
                format!("Inspect: {}", self.service_name),
                styles::title(),
            )),
            chunks[0],
        );

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(styles::accent());

        let body = if !self.ready {
            Paragraph::new("Loading inspect data...").block(block)
        } else if let Some(err) = &self.error {
            Paragraph::new(Line::styled(
                format!("Error fetching inspect data: {}", err),
                styles::error(),
            ))
            .block(block)
        } else {
            let lines: Vec<Line> = self.content.iter().map(|l| Line::raw(l.as_str())).collect();
            Paragraph::new(lines).block(block).scroll((self.scroll, 0))
        };
        f.render_widget(body, chunks[1]);

        f.render_widget(
            Paragraph::new(Line::styled(
                "[esc] back  [↑/↓] scroll  [g/G] top/bottom",
                styles::subtle(),
            )),
            chunks[2],
        );
    }
}

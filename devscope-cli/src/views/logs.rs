use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use devscope_core::model::{Service, ServiceKind};

use crate::effects::Effect;
use crate::ui::styles;

/// Full-screen log viewer. Fetches once on entry, again on manual refresh.
pub struct LogsView {
    service_name: String,
    container_id: Option<String>,
    pub seq: u64,
    lines: Vec<String>,
    error: Option<String>,
    ready: bool,
    scroll: u16,
}

pub enum LogsOutcome {
    Stay,
    Exit,
    Refresh,
}

impl LogsView {
    pub fn new(svc: &Service, seq: u64) -> Self {
        let container_id = if svc.kind.is_container() {
            svc.container_id.clone()
        } else {
            None
        };

        let mut view = Self {
            service_name: svc.name.clone(),
            container_id,
            seq,
            lines: vec![],
            error: None,
            ready: false,
            scroll: 0,
        };

        if svc.kind == ServiceKind::Process {
            view.lines = vec!["Logs not available for process-based services".into()];
            view.ready = true;
        }

        view
    }

    /// Zero or one fetch request: containers fetch, processes are already
    /// resolved at construction.
    pub fn init(&self) -> Option<Effect> {
        self.container_id.as_ref().map(|id| Effect::FetchLogs {
            container_id: id.clone(),
            seq: self.seq,
        })
    }

    pub fn on_result(&mut self, result: Result<Vec<String>, String>) {
        match result {
            Ok(lines) if lines.is_empty() => {
                self.lines = vec!["No logs found".into()];
                self.error = None;
            }
            Ok(lines) => {
                self.lines = lines;
                self.error = None;
            }
            Err(e) => self.error = Some(e),
        }
        self.ready = true;
        self.scroll = 0;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> LogsOutcome {
        match key.code {
            KeyCode::Esc => LogsOutcome::Exit,
            KeyCode::Char('r') if self.container_id.is_some() => {
                self.ready = false;
                LogsOutcome::Refresh
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                LogsOutcome::Stay
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll = self.scroll.saturating_add(1).min(self.max_scroll());
                LogsOutcome::Stay
            }
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(10);
                LogsOutcome::Stay
            }
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_add(10).min(self.max_scroll());
                LogsOutcome::Stay
            }
            KeyCode::Char('g') => {
                self.scroll = 0;
                LogsOutcome::Stay
            }
            KeyCode::Char('G') => {
                self.scroll = self.max_scroll();
                LogsOutcome::Stay
            }
            _ => LogsOutcome::Stay,
        }
    }

    fn max_scroll(&self) -> u16 {
        self.lines.len().saturating_sub(1).min(u16::MAX as usize) as u16
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
                format!("Logs: {}", self.service_name),
                styles::title(),
            )),
            chunks[0],
        );

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(styles::accent());

        let body = if !self.ready {
            Paragraph::new("Loading logs...").block(block)
        } else if let Some(err) = &self.error {
            Paragraph::new(Line::styled(
                format!("Error fetching logs: {}", err),
                styles::error(),
            ))
            .block(block)
        } else {
            let lines: Vec<Line> = self.lines.iter().map(|l| Line::raw(l.as_str())).collect();
            Paragraph::new(lines).block(block).scroll((self.scroll, 0))
        };
        f.render_widget(body, chunks[1]);

        f.render_widget(
            Paragraph::new(Line::styled(
                "[esc] back  [r]efresh  [↑/↓] scroll  [g/G] top/bottom",
                styles::subtle(),
            )),
            chunks[2],
        );
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use crossterm::event::KeyModifiers;

    use super::*;
    use devscope_core::model::ServiceStatus;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn svc(kind: ServiceKind) -> Service {
        Service {
            id: "id".into(),
            name: "svc".into(),
            kind,
            status: ServiceStatus::Running,
            port: None,
            pid: Some(42),
            container_id: Some("abc123def456".into()),
            image: None,
            db: None,
            start_time: SystemTime::now(),
            project: None,
            depends_on: vec![],
        }
    }

    #[test]
    fn test_container_logs_request_fetch_on_init() {
        let view = LogsView::new(&svc(ServiceKind::Container), 1);
        assert!(matches!(view.init(), Some(Effect::FetchLogs { .. })));
    }

    #[test]
    fn test_process_logs_resolve_without_fetch() {
        let view = LogsView::new(&svc(ServiceKind::Process), 1);
        assert!(view.init().is_none());
        assert!(view.ready);
        assert_eq!(view.lines.len(), 1);
    }

    #[test]
    fn test_refresh_only_for_containers() {
        let mut container = LogsView::new(&svc(ServiceKind::Container), 1);
        assert!(matches!(container.handle_key(key(KeyCode::Char('r'))), LogsOutcome::Refresh));

        let mut process = LogsView::new(&svc(ServiceKind::Process), 1);
        assert!(matches!(process.handle_key(key(KeyCode::Char('r'))), LogsOutcome::Stay));
    }

    #[test]
    fn test_empty_result_shows_placeholder() {
        let mut view = LogsView::new(&svc(ServiceKind::Container), 1);
        view.on_result(Ok(vec![]));
        assert_eq!(view.lines, vec!["No logs found".to_string()]);
    }

    #[test]
    fn test_error_result_recorded_inline() {
        let mut view = LogsView::new(&svc(ServiceKind::Container), 1);
        view.on_result(Err("boom".into()));
        assert_eq!(view.error.as_deref(), Some("boom"));
        assert!(view.ready);
    }
}

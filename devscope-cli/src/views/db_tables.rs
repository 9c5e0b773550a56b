use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use devscope_core::dbkind::DbKind;

use crate::dbquery::{DbHandle, TableInfo};
use crate::effects::Effect;
use crate::ui::styles;

/// Table list for a browsed database. Owns the connection opened by its
/// fetch; the controller closes it when this view exits or when a stale
/// fetch result is discarded.
pub struct DbTablesView {
    service_name: String,
    container_id: String,
    kind: DbKind,
    pub seq: u64,
    pub handle: Option<DbHandle>,
    tables: Vec<TableInfo>,
    selected: usize,
    error: Option<String>,
    ready: bool,
}

pub enum TablesOutcome {
    Stay,
    Exit,
    Open(String),
    Refresh,
}

impl DbTablesView {
    pub fn new(service_name: String, container_id: String, kind: DbKind, seq: u64) -> Self {
        Self {
            service_name,
            container_id,
            kind,
            seq,
            handle: None,
            tables: vec![],
            selected: 0,
            error: None,
            ready: false,
        }
    }

    pub fn init(&self) -> Option<Effect> {
        Some(Effect::OpenDatabase {
            container_id: self.container_id.clone(),
            kind: self.kind,
            seq: self.seq,
        })
    }

    pub fn on_result(&mut self, result: Result<(DbHandle, Vec<TableInfo>), String>) {
        match result {
            Ok((handle, tables)) => {
                self.handle = Some(handle);
                self.tables = tables;
                self.error = None;
                self.selected = 0;
            }
            Err(e) => self.error = Some(e),
        }
        self.ready = true;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> TablesOutcome {
        match key.code {
            KeyCode::Esc => TablesOutcome::Exit,
            KeyCode::Char('r') => {
                self.ready = false;
                TablesOutcome::Refresh
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if self.selected > 0 {
                    self.selected -= 1;
                }
                TablesOutcome::Stay
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.tables.len() {
                    self.selected += 1;
                }
                TablesOutcome::Stay
            }
            KeyCode::Enter => match self.tables.get(self.selected) {
                Some(table) if self.handle.is_some() => TablesOutcome::Open(table.name.clone()),
                _ => TablesOutcome::Stay,
            },
            _ => TablesOutcome::Stay,
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
            Paragraph::new(Line::styled(
                format!("Database Tables: {}", self.service_name),
                styles::title(),
            )),
            chunks[0],
        );

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(styles::accent());

        let body = if !self.ready {
            Paragraph::new("Connecting to database...").block(block)
        } else if let Some(err) = &self.error {
            Paragraph::new(Line::styled(
                format!("Error connecting to database: {}", err),
                styles::error(),
            ))
            .block(block)
        } else if self.tables.is_empty() {
            Paragraph::new("No tables found").block(block)
        } else {
            let lines: Vec<Line> = self
                .tables
                .iter()
                .enumerate()
                .map(|(i, t)| {
                    let text = format!(
                        "{:<40}  Rows: {:<10}  Columns: {}",
                        styles::truncate(&t.name, 40),
                        t.row_count,
                        t.column_count
                    );
                    if i == self.selected {
                        Line::styled(format!("> {}", text), styles::selected_row())
                    } else {
                        Line::raw(format!("  {}", text))
                    }
                })
                .collect();
            Paragraph::new(lines).block(block)
        };
        f.render_widget(body, chunks[1]);

        f.render_widget(
            Paragraph::new(Line::styled(
                "[esc] back  [r]efresh  [↑/↓] navigate  [enter] view table",
                styles::subtle(),
            )),
            chunks[2],
        );
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;

    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn view() -> DbTablesView {
        DbTablesView::new("pg".into(), "abc123".into(), DbKind::Postgres, 1)
    }

    #[test]
    fn test_init_opens_database() {
        match view().init() {
            Some(Effect::OpenDatabase { kind, seq, .. }) => {
                assert_eq!(kind, DbKind::Postgres);
                assert_eq!(seq, 1);
            }
            _ => panic!("expected open-database effect"),
        }
    }

    #[test]
    fn test_enter_without_connection_is_inert() {
        let mut v = view();
        v.tables = vec![TableInfo {
            name: "users".into(),
            row_count: 1,
            column_count: 2,
        }];
        // No handle yet: selecting a table cannot open the row browser.
        assert!(matches!(v.handle_key(key(KeyCode::Enter)), TablesOutcome::Stay));
    }

    #[test]
    fn test_connect_error_rendered_inline() {
        let mut v = view();
        v.on_result(Err("connection refused".into()));
        assert!(v.ready);
        assert!(v.error.is_some());
        // Recoverable: refresh re-issues the fetch.
        assert!(matches!(v.handle_key(key(KeyCode::Char('r'))), TablesOutcome::Refresh));
    }
}

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::dbquery::{DbHandle, TablePage};
use crate::effects::Effect;
use crate::ui::styles;

const CELL_WIDTH: usize = 30;

/// Paginated row browser for one table. Borrows the connection owned by
/// the table browser underneath it on the modal stack.
pub struct DbRowsView {
    table: String,
    handle: DbHandle,
    pub seq: u64,
    page: usize,
    current: Option<TablePage>,
    error: Option<String>,
    ready: bool,
    scroll: u16,
}

pub enum RowsOutcome {
    Stay,
    Exit,
    Fetch,
}

impl DbRowsView {
    pub fn new(table: String, handle: DbHandle, seq: u64) -> Self {
        Self {
            table,
            handle,
            seq,
            page: 0,
            current: None,
            error: None,
            ready: false,
            scroll: 0,
        }
    }

    pub fn init(&self) -> Option<Effect> {
        Some(Effect::FetchRows {
            handle: self.handle.clone(),
            table: self.table.clone(),
            page: self.page,
            seq: self.seq,
        })
    }

    pub fn on_result(&mut self, result: Result<TablePage, String>) {
        match result {
            Ok(page) => {
                self.current = Some(page);
                self.error = None;
            }
            Err(e) => self.error = Some(e),
        }
        self.ready = true;
        self.scroll = 0;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> RowsOutcome {
        match key.code {
            KeyCode::Esc => RowsOutcome::Exit,
            KeyCode::Char('r') => {
                self.ready = false;
                RowsOutcome::Fetch
            }
            KeyCode::Char('n') => {
                self.page += 1;
                self.ready = false;
                RowsOutcome::Fetch
            }
            KeyCode::Char('p') => {
                if self.page > 0 {
                    self.page -= 1;
                    self.ready = false;
                    RowsOutcome::Fetch
                } else {
                    RowsOutcome::Stay
                }
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.scroll = self.scroll.saturating_sub(1);
                RowsOutcome::Stay
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.scroll = self.scroll.saturating_add(1).min(self.max_scroll());
                RowsOutcome::Stay
            }
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(10);
                RowsOutcome::Stay
            }
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_add(10).min(self.max_scroll());
                RowsOutcome::Stay
            }
            _ => RowsOutcome::Stay,
        }
    }

    fn max_scroll(&self) -> u16 {
        self.current
            .as_ref()
            .map(|p| p.rows.len().saturating_sub(1).min(u16::MAX as usize) as u16)
            .unwrap_or(0)
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
                format!("Table: {} (Page {})", self.table, self.page + 1),
                styles::title(),
            )),
            chunks[0],
        );

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(styles::accent());

        let body = if !self.ready {
            Paragraph::new("Loading table data...").block(block)
        } else if let Some(err) = &self.error {
            Paragraph::new(Line::styled(
                format!("Error fetching table data: {}", err),
                styles::error(),
            ))
            .block(block)
        } else {
            match &self.current {
                Some(page) if !page.rows.is_empty() => {
                    let mut lines = Vec::with_capacity(page.rows.len() + 2);
                    let header: Vec<&str> =
                        page.columns.iter().map(|c| c.name.as_str()).collect();
                    lines.push(Line::styled(header.join(" | "), styles::accent()));
                    lines.push(Line::styled("-".repeat(80), styles::subtle()));
                    for row in &page.rows {
                        lines.push(Line::raw(format_row(row)));
                    }
                    Paragraph::new(lines).block(block).scroll((self.scroll, 0))
                }
                _ => Paragraph::new("No data found").block(block),
            }
        };
        f.render_widget(body, chunks[1]);

        f.render_widget(
            Paragraph::new(Line::styled(
                "[esc] back  [r]efresh  [n]ext page  [p]revious page  [↑/↓] scroll",
                styles::subtle(),
            )),
            chunks[2],
        );
    }
}

/// Joins a row's cells with ` | `, rendering NULLs and truncating long
/// values to keep rows on one line.
fn format_row(row: &[Option<String>]) -> String {
    let cells: Vec<String> = row
        .iter()
        .map(|value| match value {
            None => "NULL".to_string(),
            Some(v) if v.chars().count() > CELL_WIDTH => {
                let cut: String = v.chars().take(CELL_WIDTH - 3).collect();
                format!("{}...", cut)
            }
            Some(v) => v.clone(),
        })
        .collect();
    cells.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_row_nulls_and_truncation() {
        let row = vec![
            Some("short".to_string()),
            None,
            Some("x".repeat(50)),
        ];
        let text = format_row(&row);

        assert!(text.starts_with("short | NULL | "));
        assert!(text.ends_with("..."));
        let last = text.split(" | ").last().unwrap();
        assert_eq!(last.chars().count(), CELL_WIDTH);
    }
}

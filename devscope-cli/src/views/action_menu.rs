use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use devscope_core::action::{actions_for, Action};
use devscope_core::model::Service;

use crate::ui::styles;
use crate::views::centered_rect;

/// Pop-up menu of actions for the selected service. Contents are a pure
/// function of the service's kind, status and database tag.
pub struct ActionMenuView {
    pub service: Service,
    actions: Vec<Action>,
    selected: usize,
}

pub enum MenuOutcome {
    Stay,
    Cancel,
    Execute(Action),
}

impl ActionMenuView {
    pub fn new(service: Service) -> Self {
        let actions = actions_for(&service);
        Self {
            service,
            actions,
            selected: 0,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> MenuOutcome {
        match key.code {
            KeyCode::Esc => MenuOutcome::Cancel,
            KeyCode::Up | KeyCode::Char('k') => {
                if self.selected > 0 {
                    self.selected -= 1;
                }
                MenuOutcome::Stay
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.actions.len() {
                    self.selected += 1;
                }
                MenuOutcome::Stay
            }
            KeyCode::Enter => match self.actions.get(self.selected) {
                Some(action) => MenuOutcome::Execute(*action),
                None => MenuOutcome::Cancel,
            },
            _ => MenuOutcome::Stay,
        }
    }

    pub fn render(&self, f: &mut Frame, area: Rect) {
        let width = 44u16;
        let height = self.actions.len() as u16 + 6;
        let popup = centered_rect(width, height, area);

        f.render_widget(Clear, popup);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(styles::accent())
            .title(Span::styled(
                format!(" Actions: {} ", styles::truncate(&self.service.name, 30)),
                styles::title(),
            ));
        let inner = block.inner(popup);
        f.render_widget(block, popup);

        let mut lines = Vec::new();
        lines.push(Line::raw(""));
        for (i, action) in self.actions.iter().enumerate() {
            if i == self.selected {
                lines.push(Line::styled(
                    format!("> {}", action.label()),
                    styles::selected_row(),
                ));
            } else {
                lines.push(Line::raw(format!("  {}", action.label())));
            }
        }
        lines.push(Line::raw(""));
        lines.push(Line::styled(
            "[↑/↓] Select   [Enter] Execute   [Esc] Cancel",
            styles::subtle(),
        ));

        f.render_widget(Paragraph::new(lines), inner);
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use crossterm::event::KeyModifiers;

    use super::*;
    use devscope_core::model::{ServiceKind, ServiceStatus};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn running_container() -> Service {
        Service {
            id: "abc123".into(),
            name: "api".into(),
            kind: ServiceKind::Container,
            status: ServiceStatus::Running,
            port: None,
            pid: None,
            container_id: Some("abc123".into()),
            image: Some("nginx".into()),
            db: None,
            start_time: SystemTime::now(),
            project: None,
            depends_on: vec![],
        }
    }

    #[test]
    fn test_enter_executes_selected_action() {
        let mut menu = ActionMenuView::new(running_container());
        assert!(matches!(
            menu.handle_key(key(KeyCode::Enter)),
            MenuOutcome::Execute(Action::ViewLogs)
        ));

        menu.handle_key(key(KeyCode::Down));
        assert!(matches!(
            menu.handle_key(key(KeyCode::Enter)),
            MenuOutcome::Execute(Action::RestartContainer)
        ));
    }

    #[test]
    fn test_esc_cancels() {
        let mut menu = ActionMenuView::new(running_container());
        assert!(matches!(menu.handle_key(key(KeyCode::Esc)), MenuOutcome::Cancel));
    }

    #[test]
    fn test_selection_clamped_to_bounds() {
        let mut menu = ActionMenuView::new(running_container());
        menu.handle_key(key(KeyCode::Up));
        assert_eq!(menu.selected, 0);

        for _ in 0..20 {
            menu.handle_key(key(KeyCode::Down));
        }
        assert_eq!(menu.selected, menu.actions.len() - 1);
    }
}

pub mod action_menu;
pub mod db_rows;
pub mod db_tables;
pub mod help;
pub mod inspect;
pub mod logs;

use ratatui::layout::Rect;

pub use action_menu::ActionMenuView;
pub use db_rows::DbRowsView;
pub use db_tables::DbTablesView;
pub use help::HelpView;
pub use inspect::InspectView;
pub use logs::LogsView;

/// The closed set of modal sub-states the controller can stack. Each view
/// exposes the same three operations: an init step that may request one
/// asynchronous fetch, an update step consuming one input/result event,
/// and a pure render step.
pub enum Modal {
    Menu(ActionMenuView),
    Logs(LogsView),
    Inspect(InspectView),
    Tables(DbTablesView),
    Rows(DbRowsView),
    Help(HelpView),
}

/// Center a `width` x `height` box inside `area`, clamped to fit.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

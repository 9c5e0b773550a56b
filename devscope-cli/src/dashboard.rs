use std::time::SystemTime;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Color;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use devscope_core::model::{format_uptime, Service};

use crate::app::{App, Focus, InputMode, CATEGORIES};
use crate::docker::format_bytes;
use crate::ui::styles;
use crate::views::Modal;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SIDEBAR_WIDTH: u16 = 22;
const DETAIL_WIDTH: u16 = 34;

pub fn render(app: &App, f: &mut Frame) {
    let area = f.area();

    // Active modal sub-states own the screen; the action menu pops over
    // the dashboard instead of replacing it.
    if let Some(modal) = app.modals.last() {
        match modal {
            Modal::Menu(v) => {
                render_dashboard(app, f, area);
                v.render(f, area);
            }
            Modal::Logs(v) => v.render(f, area),
            Modal::Inspect(v) => v.render(f, area),
            Modal::Tables(v) => v.render(f, area),
            Modal::Rows(v) => v.render(f, area),
            Modal::Help(v) => v.render(f, area),
        }
        return;
    }

    render_dashboard(app, f, area);
}

fn render_dashboard(app: &App, f: &mut Frame, area: Rect) {
    let constraints = if app.show_detail {
        vec![
            Constraint::Length(SIDEBAR_WIDTH),
            Constraint::Min(40),
            Constraint::Length(DETAIL_WIDTH),
        ]
    } else {
        vec![Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(40)]
    };

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    render_sidebar(app, f, chunks[0]);
    render_main(app, f, chunks[1]);

    if app.show_detail {
        if let Some(svc) = app.filtered().get(app.selected) {
            render_detail(svc, f, chunks[2]);
        }
    }
}

fn render_sidebar(app: &App, f: &mut Frame, area: Rect) {
    let border = if app.focus == Focus::Sidebar {
        styles::accent()
    } else {
        styles::subtle()
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Span::styled(" devscope ", styles::title()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines = Vec::new();
    for (i, cat) in CATEGORIES.iter().enumerate() {
        if i == app.category {
            lines.push(Line::styled(format!(" {} ", cat), styles::selected_row()));
        } else {
            lines.push(Line::styled(format!(" {} ", cat), styles::subtle()));
        }
    }

    if app.category == 0 || app.category == 2 {
        if let Some(disk) = &app.disk {
            lines.push(Line::raw(""));
            lines.push(Line::styled(
                format!(" Disk: {}", format_bytes(disk.total())),
                styles::subtle(),
            ));
        }
    }

    f.render_widget(Paragraph::new(lines), inner);
}

fn render_main(app: &App, f: &mut Frame, area: Rect) {
    let border = if app.focus == Focus::MainList {
        styles::accent()
    } else {
        styles::subtle()
    };

    let header = if app.search_filter.is_empty() {
        format!(" DEVSCOPE v{} | {} ", VERSION, CATEGORIES[app.category])
    } else {
        format!(" DEVSCOPE v{} | Search: {} ", VERSION, app.search_filter)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(Span::styled(header, styles::title()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let services = app.filtered();
    if services.is_empty() {
        let mut msg = vec![Line::raw("No services discovered. Scanning...")];
        for w in &app.warnings {
            msg.push(Line::styled(
                format!("warning: {} probe: {}", w.source.label(), w.message),
                styles::subtle(),
            ));
        }
        f.render_widget(Paragraph::new(msg), chunks[0]);
    } else {
        render_service_table(app, &services, f, chunks[0]);
    }

    f.render_widget(Paragraph::new(status_line(app)), chunks[1]);
}

fn render_service_table(app: &App, services: &[&Service], f: &mut Frame, area: Rect) {
    let now = SystemTime::now();
    let port_column = app.category == 1;

    let mut lines = Vec::new();
    lines.push(Line::styled(
        format!(
            "{:<6} {:<40} {:<10} {:<10} {:<10}",
            "STATUS",
            "NAME",
            "TYPE",
            if port_column { "PORT" } else { "DISK" },
            "UPTIME"
        ),
        styles::subtle(),
    ));

    let max_rows = area.height.saturating_sub(1) as usize;
    let (start, end) = visible_window(services.len(), app.selected, max_rows.max(1));

    if start > 0 {
        lines.push(Line::styled(format!("  ↑ {} more", start), styles::subtle()));
    }

    for (i, svc) in services.iter().enumerate().take(end).skip(start) {
        let (icon, rest) = format_service_row(svc, port_column, app, now);

        let line = if app.operating_on.as_deref() == Some(svc.id.as_str()) {
            Line::styled(format!("{}{}", icon, rest), styles::operating_row())
        } else if i == app.selected && app.focus == Focus::MainList {
            Line::styled(format!("{}{}", icon, rest), styles::selected_row())
        } else {
            Line::from(vec![
                Span::styled(icon, styles::status_style(svc.status)),
                Span::raw(rest),
            ])
        };
        lines.push(line);
    }

    if end < services.len() {
        lines.push(Line::styled(
            format!("  ↓ {} more", services.len() - end),
            styles::subtle(),
        ));
    }

    f.render_widget(Paragraph::new(lines), area);
}

/// Row text split into the styled status-icon field and the rest.
fn format_service_row(
    svc: &Service,
    port_column: bool,
    app: &App,
    now: SystemTime,
) -> (String, String) {
    let mut name = svc.name.clone();
    if svc.db.is_some() {
        name.push_str(" [DB]");
    }

    let resource = if !port_column && svc.kind.is_container() {
        svc.container_id
            .as_deref()
            .and_then(|cid| app.disk.as_ref().and_then(|d| d.container_sizes.get(cid)))
            .map(|size| format_bytes(*size))
            .unwrap_or_else(|| "-".into())
    } else {
        svc.port.map(|p| p.to_string()).unwrap_or_else(|| "-".into())
    };

    let icon = format!("{:<6} ", styles::status_icon(svc.status));
    let rest = format!(
        "{:<40} {:<10} {:<10} {:<10}",
        styles::truncate(&name, 38),
        svc.kind.label(),
        resource,
        format_uptime(svc.uptime(now))
    );
    (icon, rest)
}

fn status_line(app: &App) -> Line<'static> {
    if app.confirm_delete.is_some() {
        return Line::from(vec![
            Span::styled(" DELETE ", styles::mode_badge(Color::Red)),
            Span::raw("  Confirm delete? [y/N]"),
        ]);
    }

    let mut spans = Vec::new();

    match &app.input {
        InputMode::Command(buffer) => {
            spans.push(Span::styled(" COMMAND ", styles::mode_badge(Color::Magenta)));
            spans.push(Span::raw(format!("  :{}", buffer)));
            spans.push(Span::styled("  [Enter] Run  [Esc] Cancel", styles::subtle()));
        }
        InputMode::Search(buffer) => {
            spans.push(Span::styled(" SEARCH ", styles::mode_badge(Color::Yellow)));
            spans.push(Span::raw(format!("  /{}", buffer)));
            spans.push(Span::styled("  [Enter] Lock  [Esc] Cancel", styles::subtle()));
        }
        InputMode::Normal => {
            spans.push(Span::styled(" NORMAL ", styles::mode_badge(styles::ACCENT)));
            if !app.search_filter.is_empty() {
                spans.push(Span::styled(
                    format!("  filter: {} [/ edit, Esc clear]", app.search_filter),
                    styles::subtle(),
                ));
            }
            let hints = if app.focus == Focus::Sidebar {
                "  [j/k] Nav  [l] Select  [Tab] Details  [/] Search  [:] Cmd  [?] Help"
            } else {
                "  [j/k] Nav  [s]tart/stop  [r]estart  [l]ogs  [d]el  [i]nspect  [1-3] Cat"
            };
            spans.push(Span::styled(hints, styles::key_hint()));
        }
    }

    if !app.status_message.is_empty() {
        spans.push(Span::styled(
            format!("  {}", app.status_message),
            styles::subtle(),
        ));
    }

    if let Some(w) = app.warnings.first() {
        spans.push(Span::styled(
            format!("  [{} probe: {}]", w.source.label(), w.message),
            styles::error(),
        ));
    }

    Line::from(spans)
}

fn render_detail(svc: &Service, f: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::subtle())
        .title(Span::styled(" Details ", styles::title()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let now = SystemTime::now();
    let mut lines = vec![
        Line::raw(format!("Name:   {}", styles::truncate(&svc.name, 24))),
        Line::raw(format!("Type:   {}", svc.kind.label())),
        Line::raw(format!("Status: {}", svc.status.label())),
    ];

    if svc.kind.is_container() {
        lines.push(Line::raw(format!(
            "Id:     {}",
            svc.container_id.as_deref().unwrap_or("-")
        )));
        lines.push(Line::raw(format!(
            "Image:  {}",
            styles::truncate(svc.image.as_deref().unwrap_or("-"), 24)
        )));
        if let Some(project) = &svc.project {
            lines.push(Line::raw(format!("Proj:   {}", project)));
        }
        if !svc.depends_on.is_empty() {
            lines.push(Line::raw(format!("Deps:   {}", svc.depends_on.join(", "))));
        }
    } else {
        lines.push(Line::raw(format!(
            "PID:    {}",
            svc.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".into())
        )));
        lines.push(Line::raw(format!(
            "Port:   {}",
            svc.port.map(|p| p.to_string()).unwrap_or_else(|| "-".into())
        )));
    }

    if let Some(db) = svc.db {
        lines.push(Line::raw(format!("DB:     {}", db.label())));
    }
    lines.push(Line::raw(format!(
        "Uptime: {}",
        format_uptime(svc.uptime(now))
    )));

    f.render_widget(Paragraph::new(lines), inner);
}

/// Window of rows to show, centered on the selection.
fn visible_window(total: usize, selected: usize, max_visible: usize) -> (usize, usize) {
    if total <= max_visible {
        return (0, total);
    }
    let half = max_visible / 2;
    let mut start = selected.saturating_sub(half);
    let mut end = start + max_visible;
    if end > total {
        end = total;
        start = end - max_visible;
    }
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_window_fits() {
        assert_eq!(visible_window(5, 2, 10), (0, 5));
    }

    #[test]
    fn test_visible_window_centers_selection() {
        let (start, end) = visible_window(100, 50, 10);
        assert!(start <= 50 && 50 < end);
        assert_eq!(end - start, 10);
    }

    #[test]
    fn test_visible_window_clamps_at_edges() {
        assert_eq!(visible_window(100, 0, 10), (0, 10));
        assert_eq!(visible_window(100, 99, 10), (90, 100));
    }
}

use std::io;
use std::time::{Duration, SystemTime};

use crossterm::event::{self, Event as CEvent, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use devscope_core::action::Action;
use devscope_core::config::DevscopeConfig;
use devscope_core::dbkind::ConnectionSpec;
use devscope_core::model::Service;
use devscope_core::probe::{ProbeWarning, ScanOutcome};
use devscope_core::reconcile::{reconcile, ReconcileOptions};
use devscope_core::registry::Registry;

use crate::command::{parse_command, CommandInput};
use crate::dashboard;
use crate::dbquery::{DbHandle, TableInfo, TablePage};
use crate::docker::{ContainerCtl, DiskUsage};
use crate::effects::{ControlOp, Effect};
use crate::probes::Scanner;
use crate::proc_ctl;
use crate::views::{
    ActionMenuView, DbRowsView, DbTablesView, HelpView, InspectView, LogsView, Modal,
};
use crate::views::action_menu::MenuOutcome;
use crate::views::db_rows::RowsOutcome;
use crate::views::db_tables::TablesOutcome;
use crate::views::help::HelpOutcome;
use crate::views::inspect::InspectOutcome;
use crate::views::logs::LogsOutcome;

pub const CATEGORIES: [&str; 3] = ["Containers", "Local Procs", "Databases"];

const FRAME_BUDGET: Duration = Duration::from_millis(50);

/// Completion events delivered back into the controller loop. Every
/// fire-and-forget task produces exactly one of these; errors arrive as
/// result payloads, never as panics across the loop boundary.
pub enum AppEvent {
    Tick,
    ScanDone(ScanOutcome),
    DiskUsage(Result<DiskUsage, String>),
    OpDone { ok: bool, message: String },
    LogsFetched { seq: u64, result: Result<Vec<String>, String> },
    InspectFetched { seq: u64, result: Result<String, String> },
    TablesFetched {
        seq: u64,
        result: Result<(DbHandle, Vec<TableInfo>), String>,
    },
    RowsFetched { seq: u64, result: Result<TablePage, String> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Sidebar,
    MainList,
}

/// Text-entry modes layered over the Normal dashboard state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Normal,
    Command(String),
    Search(String),
}

enum ModalStep {
    Menu(MenuOutcome),
    Logs(LogsOutcome),
    Inspect(InspectOutcome),
    Tables(TablesOutcome),
    Rows(RowsOutcome),
    Help(HelpOutcome),
}

/// The controller: owns the registry, the modal stack and every piece of
/// interactive state. All mutation happens on this single task, one event
/// at a time; long-running work is dispatched as effects.
pub struct App {
    pub config: DevscopeConfig,
    pub registry: Registry,
    scanner: Scanner,
    docker: Option<ContainerCtl>,
    tx: mpsc::UnboundedSender<AppEvent>,
    rx: mpsc::UnboundedReceiver<AppEvent>,

    pub modals: Vec<Modal>,
    pub focus: Focus,
    pub category: usize,
    pub selected: usize,
    pub input: InputMode,
    pub search_filter: String,
    /// Armed delete confirmation: the container id awaiting `y`.
    pub confirm_delete: Option<String>,
    pub operating_on: Option<String>,
    pub status_message: String,
    pub warnings: Vec<ProbeWarning>,
    pub disk: Option<DiskUsage>,
    pub show_detail: bool,

    fetch_seq: u64,
    pending_shell: Option<String>,
    should_quit: bool,
    tick_task: Option<tokio::task::JoinHandle<()>>,
}

impl App {
    pub fn new(config: DevscopeConfig, scanner: Scanner, docker: Option<ContainerCtl>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config,
            registry: Registry::new(),
            scanner,
            docker,
            tx,
            rx,
            modals: Vec::new(),
            focus: Focus::Sidebar,
            category: 0,
            selected: 0,
            input: InputMode::Normal,
            search_filter: String::new(),
            confirm_delete: None,
            operating_on: None,
            status_message: String::new(),
            warnings: Vec::new(),
            disk: None,
            show_detail: false,
            fetch_seq: 0,
            pending_shell: None,
            should_quit: false,
            tick_task: None,
        }
    }

    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        self.start_ticker();
        self.dispatch(Effect::Scan);
        self.dispatch(Effect::FetchDiskUsage);

        loop {
            while let Ok(ev) = self.rx.try_recv() {
                self.on_event(ev);
            }

            if self.should_quit {
                break;
            }

            terminal.draw(|f| dashboard::render(self, f))?;

            if let Some(container_id) = self.pending_shell.take() {
                self.run_shell(terminal, &container_id).await?;
                self.dispatch(Effect::Scan);
                continue;
            }

            if !event::poll(FRAME_BUDGET)? {
                continue;
            }

            if let CEvent::Key(key) = event::read()? {
                self.on_key(key);
            }
        }

        self.teardown();
        Ok(())
    }

    fn start_ticker(&mut self) {
        let tx = self.tx.clone();
        let period = Duration::from_millis(self.config.scan_interval_ms);
        self.tick_task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if tx.send(AppEvent::Tick).is_err() {
                    break;
                }
            }
        }));
    }

    /// Explicit teardown on quit: stop the timer, release any database
    /// connection still owned by a stacked sub-state.
    fn teardown(&mut self) {
        if let Some(task) = self.tick_task.take() {
            task.abort();
        }
        while let Some(modal) = self.modals.pop() {
            if let Modal::Tables(mut view) = modal {
                if let Some(handle) = view.handle.take() {
                    tokio::spawn(async move { handle.close().await });
                }
            }
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.fetch_seq += 1;
        self.fetch_seq
    }

    /// Services visible under the active category and search filter.
    pub fn filtered(&self) -> Vec<&Service> {
        let base = match self.category {
            0 => self.registry.containers(),
            1 => self.registry.processes(),
            _ => self.registry.databases(),
        };
        if self.search_filter.is_empty() {
            return base;
        }
        let needle = self.search_filter.to_lowercase();
        base.into_iter()
            .filter(|s| s.name.to_lowercase().contains(&needle))
            .collect()
    }

    fn selected_service(&self) -> Option<Service> {
        self.filtered().get(self.selected).map(|s| (*s).clone())
    }

    // ---------- event handling ----------

    pub fn on_event(&mut self, ev: AppEvent) {
        match ev {
            AppEvent::Tick => self.dispatch(Effect::Scan),

            AppEvent::ScanDone(outcome) => {
                // Applied unconditionally, whatever state the interface is
                // in; rebuild-from-scratch makes stale deliveries harmless.
                reconcile(
                    &mut self.registry,
                    &outcome,
                    SystemTime::now(),
                    ReconcileOptions {
                        correlate_ports: self.config.correlate_ports,
                    },
                );
                self.warnings = outcome.warnings;
                let len = self.filtered().len();
                if self.selected >= len {
                    self.selected = len.saturating_sub(1);
                }
            }

            AppEvent::DiskUsage(Ok(usage)) => self.disk = Some(usage),
            AppEvent::DiskUsage(Err(message)) => debug!(%message, "disk usage fetch failed"),

            AppEvent::OpDone { ok, message } => {
                if ok {
                    info!(%message, "control operation complete");
                } else {
                    warn!(%message, "control operation failed");
                }
                self.status_message = message;
                self.operating_on = None;
                self.dispatch(Effect::Scan);
            }

            AppEvent::LogsFetched { seq, result } => match self.modals.last_mut() {
                Some(Modal::Logs(view)) if view.seq == seq => view.on_result(result),
                _ => debug!(seq, "discarding stale logs result"),
            },

            AppEvent::InspectFetched { seq, result } => match self.modals.last_mut() {
                Some(Modal::Inspect(view)) if view.seq == seq => view.on_result(result),
                _ => debug!(seq, "discarding stale inspect result"),
            },

            AppEvent::TablesFetched { seq, result } => match self.modals.last_mut() {
                Some(Modal::Tables(view)) if view.seq == seq => view.on_result(result),
                _ => {
                    debug!(seq, "discarding stale table list");
                    // The sub-state that requested this is gone; its
                    // connection must still be released.
                    if let Ok((handle, _)) = result {
                        self.dispatch(Effect::CloseDatabase(handle));
                    }
                }
            },

            AppEvent::RowsFetched { seq, result } => match self.modals.last_mut() {
                Some(Modal::Rows(view)) if view.seq == seq => view.on_result(result),
                _ => debug!(seq, "discarding stale row page"),
            },
        }
    }

    // ---------- key handling ----------

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if self.modals.is_empty() && self.input != InputMode::Normal {
            self.on_key_entry(key);
            return;
        }

        if key.code == KeyCode::Char('q') {
            self.should_quit = true;
            return;
        }

        if self.modals.is_empty() {
            self.on_key_dashboard(key);
        } else {
            self.on_key_modal(key);
        }
    }

    /// Command-entry and search-entry keystrokes.
    fn on_key_entry(&mut self, key: KeyEvent) {
        match &mut self.input {
            InputMode::Command(buffer) => match key.code {
                KeyCode::Esc => self.input = InputMode::Normal,
                KeyCode::Enter => {
                    let input = buffer.clone();
                    self.input = InputMode::Normal;
                    self.run_command(&input);
                }
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Char(c) => buffer.push(c),
                _ => {}
            },
            InputMode::Search(buffer) => match key.code {
                KeyCode::Esc => {
                    self.search_filter.clear();
                    self.selected = 0;
                    self.input = InputMode::Normal;
                }
                KeyCode::Enter => self.input = InputMode::Normal,
                KeyCode::Backspace => {
                    buffer.pop();
                    self.search_filter = buffer.clone();
                    self.selected = 0;
                }
                KeyCode::Char(c) => {
                    buffer.push(c);
                    self.search_filter = buffer.clone();
                    self.selected = 0;
                }
                _ => {}
            },
            InputMode::Normal => {}
        }
    }

    fn on_key_dashboard(&mut self, key: KeyEvent) {
        // An armed delete confirmation consumes the next key entirely:
        // only `y` fires the operation, everything else disarms.
        if let Some(container_id) = self.confirm_delete.take() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    let service = self
                        .selected_service()
                        .map(|s| s.id)
                        .unwrap_or_else(|| container_id.clone());
                    self.dispatch(Effect::Control {
                        op: ControlOp::RemoveContainer(container_id),
                        service,
                    });
                }
                KeyCode::Char('n') | KeyCode::Char('N') => {
                    self.status_message = "Delete cancelled".into();
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Tab => {
                self.show_detail = !self.show_detail;
                return;
            }
            KeyCode::Char('?') => {
                self.modals.push(Modal::Help(HelpView::new()));
                return;
            }
            KeyCode::Char('/') => {
                self.input = InputMode::Search(self.search_filter.clone());
                return;
            }
            KeyCode::Char(':') => {
                self.input = InputMode::Command(String::new());
                return;
            }
            KeyCode::Esc if !self.search_filter.is_empty() => {
                self.search_filter.clear();
                self.selected = 0;
                return;
            }
            KeyCode::Char(c @ '1'..='3') => {
                self.set_category(c as usize - '1' as usize);
                return;
            }
            _ => {}
        }

        match self.focus {
            Focus::Sidebar => match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    if self.category > 0 {
                        self.set_category(self.category - 1);
                    }
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if self.category + 1 < CATEGORIES.len() {
                        self.set_category(self.category + 1);
                    }
                }
                KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
                    self.focus = Focus::MainList;
                }
                _ => {}
            },
            Focus::MainList => match key.code {
                KeyCode::Left | KeyCode::Char('h') => self.focus = Focus::Sidebar,
                KeyCode::Up | KeyCode::Char('k') => {
                    if self.selected > 0 {
                        self.selected -= 1;
                    }
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    if self.selected + 1 < self.filtered().len() {
                        self.selected += 1;
                    }
                }
                KeyCode::Enter => {
                    if let Some(svc) = self.selected_service() {
                        self.modals.push(Modal::Menu(ActionMenuView::new(svc)));
                    }
                }
                KeyCode::Char('s') => {
                    if let Some(svc) = self.selected_service() {
                        if svc.kind.is_container() {
                            let action = if svc.status.is_running() {
                                Action::StopContainer
                            } else {
                                Action::StartContainer
                            };
                            self.execute_action(action, svc);
                        }
                    }
                }
                KeyCode::Char('r') => {
                    if let Some(svc) = self.selected_service() {
                        if svc.kind.is_container() && svc.status.is_running() {
                            self.execute_action(Action::RestartContainer, svc);
                        }
                    }
                }
                KeyCode::Char('l') => {
                    if let Some(svc) = self.selected_service() {
                        self.execute_action(Action::ViewLogs, svc);
                    }
                }
                KeyCode::Char('i') => {
                    if let Some(svc) = self.selected_service() {
                        if svc.kind.is_container() {
                            self.execute_action(Action::InspectJson, svc);
                        }
                    }
                }
                KeyCode::Char('d') => {
                    if let Some(svc) = self.selected_service() {
                        if svc.kind.is_container() {
                            self.execute_action(Action::DeleteContainer, svc);
                        }
                    }
                }
                _ => {}
            },
        }
    }

    fn set_category(&mut self, index: usize) {
        self.category = index;
        self.selected = 0;
        // Containers and Databases both show disk figures.
        if index == 0 || index == 2 {
            self.dispatch(Effect::FetchDiskUsage);
        }
    }

    fn on_key_modal(&mut self, key: KeyEvent) {
        let step = match self.modals.last_mut() {
            Some(Modal::Menu(v)) => ModalStep::Menu(v.handle_key(key)),
            Some(Modal::Logs(v)) => ModalStep::Logs(v.handle_key(key)),
            Some(Modal::Inspect(v)) => ModalStep::Inspect(v.handle_key(key)),
            Some(Modal::Tables(v)) => ModalStep::Tables(v.handle_key(key)),
            Some(Modal::Rows(v)) => ModalStep::Rows(v.handle_key(key)),
            Some(Modal::Help(v)) => ModalStep::Help(v.handle_key(key)),
            None => return,
        };

        match step {
            ModalStep::Menu(MenuOutcome::Stay) => {}
            ModalStep::Menu(MenuOutcome::Cancel) => {
                self.modals.pop();
            }
            ModalStep::Menu(MenuOutcome::Execute(action)) => {
                if let Some(Modal::Menu(view)) = self.modals.pop() {
                    self.execute_action(action, view.service);
                }
            }

            ModalStep::Logs(LogsOutcome::Stay) => {}
            ModalStep::Logs(LogsOutcome::Exit) => self.close_top_modal(),
            ModalStep::Logs(LogsOutcome::Refresh) => {
                let seq = self.next_seq();
                let effect = match self.modals.last_mut() {
                    Some(Modal::Logs(view)) => {
                        view.seq = seq;
                        view.init()
                    }
                    _ => None,
                };
                if let Some(effect) = effect {
                    self.dispatch(effect);
                }
            }

            ModalStep::Inspect(InspectOutcome::Stay) => {}
            ModalStep::Inspect(InspectOutcome::Exit) => self.close_top_modal(),

            ModalStep::Tables(TablesOutcome::Stay) => {}
            ModalStep::Tables(TablesOutcome::Exit) => self.close_top_modal(),
            ModalStep::Tables(TablesOutcome::Refresh) => {
                let seq = self.next_seq();
                let (old_handle, effect) = match self.modals.last_mut() {
                    Some(Modal::Tables(view)) => {
                        view.seq = seq;
                        (view.handle.take(), view.init())
                    }
                    _ => (None, None),
                };
                if let Some(handle) = old_handle {
                    self.dispatch(Effect::CloseDatabase(handle));
                }
                if let Some(effect) = effect {
                    self.dispatch(effect);
                }
            }
            ModalStep::Tables(TablesOutcome::Open(table)) => {
                let seq = self.next_seq();
                let handle = match self.modals.last() {
                    Some(Modal::Tables(view)) => view.handle.clone(),
                    _ => None,
                };
                if let Some(handle) = handle {
                    let view = DbRowsView::new(table, handle, seq);
                    let effect = view.init();
                    self.modals.push(Modal::Rows(view));
                    if let Some(effect) = effect {
                        self.dispatch(effect);
                    }
                }
            }

            // Exiting the row browser returns to the table browser; the
            // connection stays open because the table browser owns it.
            ModalStep::Rows(RowsOutcome::Stay) => {}
            ModalStep::Rows(RowsOutcome::Exit) => {
                self.modals.pop();
            }
            ModalStep::Rows(RowsOutcome::Fetch) => {
                let seq = self.next_seq();
                let effect = match self.modals.last_mut() {
                    Some(Modal::Rows(view)) => {
                        view.seq = seq;
                        view.init()
                    }
                    _ => None,
                };
                if let Some(effect) = effect {
                    self.dispatch(effect);
                }
            }

            ModalStep::Help(HelpOutcome::Stay) => {}
            ModalStep::Help(HelpOutcome::Exit) => {
                self.modals.pop();
            }
        }
    }

    /// Pops the top modal and performs its exit duties: the table browser
    /// releases its connection, and leaving any fetching view triggers a
    /// fresh scan so the dashboard reflects external changes.
    fn close_top_modal(&mut self) {
        match self.modals.pop() {
            Some(Modal::Tables(mut view)) => {
                if let Some(handle) = view.handle.take() {
                    self.dispatch(Effect::CloseDatabase(handle));
                }
                self.dispatch(Effect::Scan);
            }
            Some(Modal::Logs(_)) | Some(Modal::Inspect(_)) => self.dispatch(Effect::Scan),
            _ => {}
        }
    }

    // ---------- actions ----------

    fn execute_action(&mut self, action: Action, svc: Service) {
        match action {
            Action::ViewLogs => {
                let seq = self.next_seq();
                let view = LogsView::new(&svc, seq);
                let effect = view.init();
                self.modals.push(Modal::Logs(view));
                if let Some(effect) = effect {
                    self.dispatch(effect);
                }
            }

            Action::InspectJson => {
                if let Some(container_id) = svc.container_id.clone() {
                    let seq = self.next_seq();
                    let view = InspectView::new(svc.name.clone(), container_id, seq);
                    let effect = view.init();
                    self.modals.push(Modal::Inspect(view));
                    if let Some(effect) = effect {
                        self.dispatch(effect);
                    }
                }
            }

            Action::BrowseDatabase => {
                if let (Some(container_id), Some(kind)) = (svc.container_id.clone(), svc.db) {
                    let seq = self.next_seq();
                    let view = DbTablesView::new(svc.name.clone(), container_id, kind, seq);
                    let effect = view.init();
                    self.modals.push(Modal::Tables(view));
                    if let Some(effect) = effect {
                        self.dispatch(effect);
                    }
                }
            }

            Action::StartContainer => {
                if let Some(cid) = svc.container_id.clone() {
                    self.dispatch(Effect::Control {
                        op: ControlOp::StartContainer(cid),
                        service: svc.id,
                    });
                }
            }
            Action::StopContainer => {
                if let Some(cid) = svc.container_id.clone() {
                    self.dispatch(Effect::Control {
                        op: ControlOp::StopContainer(cid),
                        service: svc.id,
                    });
                }
            }
            Action::RestartContainer => {
                if let Some(cid) = svc.container_id.clone() {
                    self.dispatch(Effect::Control {
                        op: ControlOp::RestartContainer(cid),
                        service: svc.id,
                    });
                }
            }

            Action::DeleteContainer => {
                // Arm confirmation only; no operation is issued yet.
                self.confirm_delete = svc.container_id.clone();
            }

            Action::KillProcess => {
                if let Some(pid) = svc.pid {
                    self.dispatch(Effect::Control {
                        op: ControlOp::TerminateProcess(pid),
                        service: svc.id,
                    });
                } else {
                    self.status_message = "No pid known for this service".into();
                }
            }

            Action::OpenShell => {
                self.pending_shell = svc.container_id.clone();
            }
        }
    }

    fn run_command(&mut self, input: &str) {
        let parsed = match parse_command(input) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.status_message = e.lines().next().unwrap_or("Bad command").to_string();
                return;
            }
        };

        match parsed {
            CommandInput::Scan => self.dispatch(Effect::Scan),
            CommandInput::Quit => self.should_quit = true,
            CommandInput::Start(target) => self.command_on_container(&target, Action::StartContainer),
            CommandInput::Stop(target) => match self.registry.resolve(&target).cloned() {
                Some(svc) if svc.kind.is_container() => {
                    self.execute_action(Action::StopContainer, svc)
                }
                Some(svc) if svc.pid.is_some() => self.execute_action(Action::KillProcess, svc),
                Some(_) => self.status_message = "No way to stop this service".into(),
                None => self.status_message = format!("Unknown service: {target}"),
            },
            CommandInput::Restart(target) => {
                self.command_on_container(&target, Action::RestartContainer)
            }
            CommandInput::Remove(target) => self.command_on_container(&target, Action::DeleteContainer),
            CommandInput::Kill(target) => match self.registry.resolve(&target).cloned() {
                Some(svc) => match svc.pid {
                    Some(pid) => self.dispatch(Effect::Control {
                        op: ControlOp::KillProcess(pid),
                        service: svc.id,
                    }),
                    None => self.status_message = "kill targets processes".into(),
                },
                None => self.status_message = format!("Unknown service: {target}"),
            },
        }
    }

    fn command_on_container(&mut self, target: &str, action: Action) {
        match self.registry.resolve(target).cloned() {
            Some(svc) if svc.kind.is_container() => self.execute_action(action, svc),
            Some(_) => self.status_message = "Not a container".into(),
            None => self.status_message = format!("Unknown service: {target}"),
        }
    }

    // ---------- effect scheduler ----------

    /// Executes an effect description off the interactive loop. Each task
    /// delivers exactly one completion event; the issuing code never waits.
    fn dispatch(&mut self, effect: Effect) {
        let tx = self.tx.clone();
        match effect {
            Effect::Scan => {
                let scanner = self.scanner.clone();
                tokio::spawn(async move {
                    let outcome = scanner.scan().await;
                    let _ = tx.send(AppEvent::ScanDone(outcome));
                });
            }

            Effect::FetchDiskUsage => {
                let Some(docker) = self.docker.clone() else {
                    return;
                };
                tokio::spawn(async move {
                    let result = docker.disk_usage().await.map_err(|e| e.to_string());
                    let _ = tx.send(AppEvent::DiskUsage(result));
                });
            }

            Effect::Control { op, service } => {
                self.status_message = op.pending_label().into();
                self.operating_on = Some(service);
                let docker = self.docker.clone();
                tokio::spawn(async move {
                    let result = run_control_op(&op, docker.as_ref()).await;
                    let message = match &result {
                        Ok(()) => op.done_label().to_string(),
                        Err(e) => format!("{} failed: {}", op.verb(), e),
                    };
                    let _ = tx.send(AppEvent::OpDone {
                        ok: result.is_ok(),
                        message,
                    });
                });
            }

            Effect::FetchLogs { container_id, seq } => {
                let docker = self.docker.clone();
                let tail = self.config.log_tail;
                tokio::spawn(async move {
                    let result = match docker {
                        Some(docker) => docker
                            .logs(&container_id, tail)
                            .await
                            .map_err(|e| e.to_string()),
                        None => Err("Docker unavailable".into()),
                    };
                    let _ = tx.send(AppEvent::LogsFetched { seq, result });
                });
            }

            Effect::FetchInspect { container_id, seq } => {
                let docker = self.docker.clone();
                tokio::spawn(async move {
                    let result = match docker {
                        Some(docker) => docker
                            .inspect_json(&container_id)
                            .await
                            .map_err(|e| e.to_string()),
                        None => Err("Docker unavailable".into()),
                    };
                    let _ = tx.send(AppEvent::InspectFetched { seq, result });
                });
            }

            Effect::OpenDatabase {
                container_id,
                kind,
                seq,
            } => {
                let docker = self.docker.clone();
                tokio::spawn(async move {
                    let result = open_database(docker, &container_id, kind).await;
                    let _ = tx.send(AppEvent::TablesFetched { seq, result });
                });
            }

            Effect::FetchRows {
                handle,
                table,
                page,
                seq,
            } => {
                let page_size = self.config.page_size;
                tokio::spawn(async move {
                    let result = fetch_page(&handle, &table, page, page_size).await;
                    let _ = tx.send(AppEvent::RowsFetched { seq, result });
                });
            }

            Effect::CloseDatabase(handle) => {
                tokio::spawn(async move { handle.close().await });
            }
        }
    }

    /// Suspends the interface, hands the terminal to an interactive
    /// `docker exec` shell, and restores on exit.
    async fn run_shell(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        container_id: &str,
    ) -> io::Result<()> {
        disable_raw_mode()?;
        execute!(io::stdout(), LeaveAlternateScreen)?;

        let status = tokio::process::Command::new("docker")
            .args(["exec", "-it", container_id, "/bin/sh"])
            .status()
            .await;

        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        terminal.clear()?;

        self.status_message = match status {
            Ok(_) => "Shell closed".into(),
            Err(e) => format!("Shell failed: {}", e),
        };
        Ok(())
    }
}

impl ControlOp {
    fn verb(&self) -> &'static str {
        match self {
            ControlOp::StartContainer(_) => "Start",
            ControlOp::StopContainer(_) => "Stop",
            ControlOp::RestartContainer(_) => "Restart",
            ControlOp::RemoveContainer(_) => "Delete",
            ControlOp::TerminateProcess(_) => "Stop",
            ControlOp::KillProcess(_) => "Kill",
        }
    }
}

async fn run_control_op(op: &ControlOp, docker: Option<&ContainerCtl>) -> Result<(), String> {
    let need_docker = || docker.ok_or_else(|| "Docker unavailable".to_string());
    match op {
        ControlOp::StartContainer(id) => need_docker()?.start(id).await.map_err(|e| e.to_string()),
        ControlOp::StopContainer(id) => need_docker()?.stop(id).await.map_err(|e| e.to_string()),
        ControlOp::RestartContainer(id) => {
            need_docker()?.restart(id).await.map_err(|e| e.to_string())
        }
        ControlOp::RemoveContainer(id) => need_docker()?.remove(id).await.map_err(|e| e.to_string()),
        ControlOp::TerminateProcess(pid) => proc_ctl::terminate(*pid).map_err(|e| e.to_string()),
        ControlOp::KillProcess(pid) => proc_ctl::kill(*pid).map_err(|e| e.to_string()),
    }
}

/// Derive connection parameters from the container, open a pool and list
/// tables. The pool travels back with the result so the table browser can
/// own it; every failure path closes anything already opened.
async fn open_database(
    docker: Option<ContainerCtl>,
    container_id: &str,
    kind: devscope_core::dbkind::DbKind,
) -> Result<(DbHandle, Vec<TableInfo>), String> {
    let docker = docker.ok_or("Docker unavailable")?;

    let (env, bindings) = docker
        .inspect_connection_inputs(container_id)
        .await
        .map_err(|e| format!("discover config: {}", e))?;

    let spec = ConnectionSpec::derive(kind, &env, &bindings).map_err(|e| e.to_string())?;

    let handle = DbHandle::connect(&spec)
        .await
        .map_err(|e| format!("connect to database: {}", e))?;

    match handle.list_tables().await {
        Ok(tables) => Ok((handle, tables)),
        Err(e) => {
            handle.close().await;
            Err(format!("list tables: {}", e))
        }
    }
}

async fn fetch_page(
    handle: &DbHandle,
    table: &str,
    page: usize,
    page_size: u32,
) -> Result<TablePage, String> {
    let columns = handle
        .columns(table)
        .await
        .map_err(|e| format!("get columns: {}", e))?;

    let offset = page as u64 * page_size as u64;
    let rows = handle
        .fetch_rows(table, &columns, page_size, offset)
        .await
        .map_err(|e| format!("get data: {}", e))?;

    Ok(TablePage {
        columns,
        rows,
        page,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use devscope_core::probe::{ContainerRecord, ProcessRecord};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_with_container() -> App {
        let config = DevscopeConfig::default();
        let scanner = Scanner::new(&config, None);
        let mut app = App::new(config, scanner, None);

        let outcome = ScanOutcome {
            containers: vec![ContainerRecord {
                id: "aaaabbbbcccc".into(),
                name: "pg".into(),
                image: "postgres:16".into(),
                running: true,
                db: devscope_core::dbkind::DbKind::detect("postgres:16"),
                ..Default::default()
            }],
            ..Default::default()
        };
        app.on_event(AppEvent::ScanDone(outcome));
        app.focus = Focus::MainList;
        app
    }

    #[test]
    fn test_scan_result_replaces_registry() {
        let mut app = app_with_container();
        assert_eq!(app.registry.len(), 1);

        app.on_event(AppEvent::ScanDone(ScanOutcome::default()));
        assert!(app.registry.is_empty());
    }

    #[test]
    fn test_scan_applies_while_modal_open() {
        let mut app = app_with_container();
        app.modals.push(Modal::Help(HelpView::new()));

        app.on_event(AppEvent::ScanDone(ScanOutcome {
            processes: vec![ProcessRecord {
                pid: 7,
                command: "node dev".into(),
            }],
            ports: vec![devscope_core::probe::ListeningPort {
                port: 3000,
                process: "node".into(),
                pid: Some(7),
            }],
            ..Default::default()
        }));

        // Registry updated even though a modal is on top.
        assert!(app.registry.contains("7"));
        assert!(matches!(app.modals.last(), Some(Modal::Help(_))));
    }

    #[tokio::test]
    async fn test_delete_arms_confirmation_without_dispatch() {
        let mut app = app_with_container();

        app.on_key(key(KeyCode::Char('d')));
        assert_eq!(app.confirm_delete.as_deref(), Some("aaaabbbbcccc"));
        // Arming issues no operation: nothing marked in flight.
        assert!(app.operating_on.is_none());
    }

    #[tokio::test]
    async fn test_confirmation_disarmed_by_other_keys() {
        let mut app = app_with_container();

        app.on_key(key(KeyCode::Char('d')));
        app.on_key(key(KeyCode::Char('n')));
        assert!(app.confirm_delete.is_none());
        assert_eq!(app.status_message, "Delete cancelled");

        app.on_key(key(KeyCode::Char('d')));
        app.on_key(key(KeyCode::Char('x')));
        assert!(app.confirm_delete.is_none());
        assert!(app.operating_on.is_none());
    }

    #[tokio::test]
    async fn test_confirmation_y_dispatches_delete() {
        let mut app = app_with_container();

        app.on_key(key(KeyCode::Char('d')));
        app.on_key(key(KeyCode::Char('y')));
        assert!(app.confirm_delete.is_none());
        assert_eq!(app.status_message, "Deleting container...");
        assert_eq!(app.operating_on.as_deref(), Some("aaaabbbbcccc"));
    }

    #[test]
    fn test_stale_fetch_results_discarded() {
        let mut app = app_with_container();
        // No modal active: results fall through without panicking or
        // mutating interactive state.
        app.on_event(AppEvent::LogsFetched {
            seq: 99,
            result: Ok(vec!["line".into()]),
        });
        app.on_event(AppEvent::RowsFetched {
            seq: 4,
            result: Err("late".into()),
        });
        assert!(app.modals.is_empty());
    }

    #[tokio::test]
    async fn test_op_completion_sets_status_and_rescans() {
        let mut app = app_with_container();
        app.operating_on = Some("aaaabbbbcccc".into());

        app.on_event(AppEvent::OpDone {
            ok: true,
            message: "Container stopped".into(),
        });
        assert_eq!(app.status_message, "Container stopped");
        assert!(app.operating_on.is_none());
    }

    #[test]
    fn test_search_filter_narrows_list() {
        let mut app = app_with_container();
        app.on_event(AppEvent::ScanDone(ScanOutcome {
            containers: vec![
                ContainerRecord {
                    id: "aaaabbbbcccc".into(),
                    name: "pg".into(),
                    image: "postgres:16".into(),
                    running: true,
                    ..Default::default()
                },
                ContainerRecord {
                    id: "ddddeeeeffff".into(),
                    name: "nginx".into(),
                    image: "nginx".into(),
                    running: true,
                    ..Default::default()
                },
            ],
            ..Default::default()
        }));

        assert_eq!(app.filtered().len(), 2);

        app.on_key(key(KeyCode::Char('/')));
        app.on_key(key(KeyCode::Char('n')));
        app.on_key(key(KeyCode::Char('g')));
        assert_eq!(app.search_filter, "ng");
        assert_eq!(app.filtered().len(), 1);
        assert_eq!(app.filtered()[0].name, "nginx");

        // Enter locks the filter; Esc afterwards clears it.
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.input, InputMode::Normal);
        assert_eq!(app.search_filter, "ng");
        app.on_key(key(KeyCode::Esc));
        assert!(app.search_filter.is_empty());
    }

    #[tokio::test]
    async fn test_command_entry_quit() {
        let mut app = app_with_container();
        app.on_key(key(KeyCode::Char(':')));
        for c in "quit".chars() {
            app.on_key(key(KeyCode::Char(c)));
        }
        app.on_key(key(KeyCode::Enter));
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_command_entry_unknown_target() {
        let mut app = app_with_container();
        app.on_key(key(KeyCode::Char(':')));
        for c in "stop ghost".chars() {
            app.on_key(key(KeyCode::Char(c)));
        }
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.status_message, "Unknown service: ghost");
    }

    #[tokio::test]
    async fn test_command_rm_arms_confirmation() {
        let mut app = app_with_container();
        app.on_key(key(KeyCode::Char(':')));
        for c in "rm pg".chars() {
            app.on_key(key(KeyCode::Char(c)));
        }
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.confirm_delete.as_deref(), Some("aaaabbbbcccc"));
    }

    #[test]
    fn test_enter_opens_action_menu_for_selection() {
        let mut app = app_with_container();
        app.on_key(key(KeyCode::Enter));
        assert!(matches!(app.modals.last(), Some(Modal::Menu(_))));
    }

    #[test]
    fn test_category_switch_resets_selection() {
        let mut app = app_with_container();
        app.selected = 0;
        app.on_key(key(KeyCode::Char('2')));
        assert_eq!(app.category, 1);
        assert_eq!(app.selected, 0);
        // No processes discovered: the list is empty.
        assert!(app.filtered().is_empty());
    }
}

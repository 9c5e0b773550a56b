use devscope_core::dbkind::DbKind;
use devscope_core::model::ServiceId;

use crate::dbquery::DbHandle;

/// A control operation against the real environment. Dispatched
/// fire-and-forget; the outcome comes back as one completion event.
#[derive(Clone, Debug)]
pub enum ControlOp {
    StartContainer(String),
    StopContainer(String),
    RestartContainer(String),
    RemoveContainer(String),
    TerminateProcess(u32),
    KillProcess(u32),
}

impl ControlOp {
    /// Status line shown while the operation is in flight.
    pub fn pending_label(&self) -> &'static str {
        match self {
            ControlOp::StartContainer(_) => "Starting container...",
            ControlOp::StopContainer(_) => "Stopping container...",
            ControlOp::RestartContainer(_) => "Restarting container...",
            ControlOp::RemoveContainer(_) => "Deleting container...",
            ControlOp::TerminateProcess(_) => "Stopping process...",
            ControlOp::KillProcess(_) => "Killing process...",
        }
    }

    pub fn done_label(&self) -> &'static str {
        match self {
            ControlOp::StartContainer(_) => "Container started",
            ControlOp::StopContainer(_) => "Container stopped",
            ControlOp::RestartContainer(_) => "Container restarted",
            ControlOp::RemoveContainer(_) => "Container deleted",
            ControlOp::TerminateProcess(_) => "Process stopped",
            ControlOp::KillProcess(_) => "Process killed",
        }
    }
}

/// Asynchronous work requested by the controller or a modal sub-state.
/// Effects describe the work; the controller's scheduler executes them and
/// re-injects outcomes as events.
pub enum Effect {
    Scan,
    FetchDiskUsage,
    Control {
        op: ControlOp,
        service: ServiceId,
    },
    FetchLogs {
        container_id: String,
        seq: u64,
    },
    FetchInspect {
        container_id: String,
        seq: u64,
    },
    OpenDatabase {
        container_id: String,
        kind: DbKind,
        seq: u64,
    },
    FetchRows {
        handle: DbHandle,
        table: String,
        page: usize,
        seq: u64,
    },
    CloseDatabase(DbHandle),
}

use std::time::{Duration, SystemTime};

use crate::dbkind::DbKind;

pub type ServiceId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServiceKind {
    Container,
    ComposeGroup,
    Process,
}

impl ServiceKind {
    pub fn label(&self) -> &'static str {
        match self {
            ServiceKind::Container => "container",
            ServiceKind::ComposeGroup => "compose",
            ServiceKind::Process => "process",
        }
    }

    /// Containers and compose-managed containers share the container category.
    pub fn is_container(&self) -> bool {
        matches!(self, ServiceKind::Container | ServiceKind::ComposeGroup)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceStatus {
    Running,
    Unhealthy,
    Stopped,
}

impl ServiceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ServiceStatus::Running => "running",
            ServiceStatus::Unhealthy => "unhealthy",
            ServiceStatus::Stopped => "stopped",
        }
    }

    /// Sort rank: running < unhealthy < stopped.
    pub fn rank(&self) -> u8 {
        match self {
            ServiceStatus::Running => 0,
            ServiceStatus::Unhealthy => 1,
            ServiceStatus::Stopped => 2,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ServiceStatus::Running | ServiceStatus::Unhealthy)
    }
}

/// One discovered unit of the local development environment.
///
/// Identity is derived deterministically from the discovery source, so the
/// same physical resource maps to the same id on every scan cycle:
/// the short container id, `port-<N>` for a bare listening socket, or the
/// decimal pid for a correlated process.
#[derive(Clone, Debug)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub kind: ServiceKind,
    pub status: ServiceStatus,
    pub port: Option<u16>,
    pub pid: Option<u32>,
    pub container_id: Option<String>,
    pub image: Option<String>,
    pub db: Option<DbKind>,
    /// Creation time for containers, first-seen time for ports/processes.
    pub start_time: SystemTime,
    /// Owning compose project, when the container carries compose labels.
    pub project: Option<String>,
    pub depends_on: Vec<String>,
}

impl Service {
    /// `now - start_time` while running, zero otherwise.
    pub fn uptime(&self, now: SystemTime) -> Duration {
        if !self.status.is_running() {
            return Duration::ZERO;
        }
        now.duration_since(self.start_time).unwrap_or(Duration::ZERO)
    }
}

pub fn format_uptime(d: Duration) -> String {
    if d.is_zero() {
        return "-".into();
    }
    let mins = d.as_secs() / 60;
    let hours = mins / 60;
    if hours > 0 {
        format!("{}h {}m", hours, mins % 60)
    } else {
        format!("{}m", mins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uptime_zero_when_stopped() {
        let start = SystemTime::now() - Duration::from_secs(600);
        let svc = Service {
            id: "abc123def456".into(),
            name: "db".into(),
            kind: ServiceKind::Container,
            status: ServiceStatus::Stopped,
            port: None,
            pid: None,
            container_id: Some("abc123def456".into()),
            image: Some("postgres:16".into()),
            db: None,
            start_time: start,
            project: None,
            depends_on: vec![],
        };

        assert_eq!(svc.uptime(SystemTime::now()), Duration::ZERO);
    }

    #[test]
    fn test_uptime_derived_from_start_time() {
        let now = SystemTime::now();
        let svc = Service {
            id: "port-3000".into(),
            name: "node".into(),
            kind: ServiceKind::Process,
            status: ServiceStatus::Running,
            port: Some(3000),
            pid: Some(4242),
            container_id: None,
            image: None,
            db: None,
            start_time: now - Duration::from_secs(90),
            project: None,
            depends_on: vec![],
        };

        let up = svc.uptime(now);
        assert!(up >= Duration::from_secs(89) && up <= Duration::from_secs(91));
    }

    #[test]
    fn test_status_rank_order() {
        assert!(ServiceStatus::Running.rank() < ServiceStatus::Unhealthy.rank());
        assert!(ServiceStatus::Unhealthy.rank() < ServiceStatus::Stopped.rank());
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::ZERO), "-");
        assert_eq!(format_uptime(Duration::from_secs(240)), "4m");
        assert_eq!(format_uptime(Duration::from_secs(3_720)), "1h 2m");
    }
}

use std::collections::BTreeSet;
use std::time::SystemTime;

use crate::model::{Service, ServiceKind, ServiceStatus};
use crate::probe::ScanOutcome;
use crate::registry::Registry;

/// Tunable reconciliation policy.
#[derive(Clone, Copy, Debug)]
pub struct ReconcileOptions {
    /// Keep only process findings whose pid also owns a listening socket
    /// surfaced by this cycle's port probe. This hides background tooling
    /// with no open socket; disable to admit every keyword match.
    pub correlate_ports: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self { correlate_ports: true }
    }
}

/// Replaces the registry with a fresh snapshot built from one cycle's probe
/// findings, preserving `start_time` for every identity reproduced from the
/// previous cycle.
///
/// After this returns, the registry holds exactly the identities produced
/// this cycle; nothing from earlier cycles survives unless reproduced.
pub fn reconcile(
    registry: &mut Registry,
    outcome: &ScanOutcome,
    now: SystemTime,
    opts: ReconcileOptions,
) {
    let old = registry.take_snapshot();

    let mut container_ports: BTreeSet<u16> = BTreeSet::new();

    for c in &outcome.containers {
        container_ports.extend(c.published_ports.iter().copied());

        let status = if c.unhealthy {
            ServiceStatus::Unhealthy
        } else if c.running {
            ServiceStatus::Running
        } else {
            ServiceStatus::Stopped
        };

        let kind = if c.compose_project.is_some() {
            ServiceKind::ComposeGroup
        } else {
            ServiceKind::Container
        };

        registry.upsert(Service {
            id: c.id.clone(),
            name: c.name.clone(),
            kind,
            status,
            port: c.published_ports.first().copied(),
            pid: None,
            container_id: Some(c.id.clone()),
            image: Some(c.image.clone()),
            db: c.db,
            start_time: c.created_at.unwrap_or(now),
            project: c.compose_project.clone(),
            depends_on: c.depends_on.clone(),
        });
    }

    for p in &outcome.ports {
        // Ports published by a container are already represented by its
        // container record.
        if container_ports.contains(&p.port) {
            continue;
        }

        let id = format!("port-{}", p.port);
        let start_time = old.get(&id).map(|s| s.start_time).unwrap_or(now);
        let name = if p.process.is_empty() {
            "unknown".to_string()
        } else {
            p.process.clone()
        };

        registry.upsert(Service {
            id,
            name,
            kind: ServiceKind::Process,
            status: ServiceStatus::Running,
            port: Some(p.port),
            pid: p.pid,
            container_id: None,
            image: None,
            db: None,
            start_time,
            project: None,
            depends_on: vec![],
        });
    }

    let socket_pids: BTreeSet<u32> = outcome.ports.iter().filter_map(|p| p.pid).collect();

    for proc in &outcome.processes {
        if opts.correlate_ports && !socket_pids.contains(&proc.pid) {
            continue;
        }

        let id = proc.pid.to_string();
        let start_time = old.get(&id).map(|s| s.start_time).unwrap_or(now);

        registry.upsert(Service {
            id,
            name: proc.command.clone(),
            kind: ServiceKind::Process,
            status: ServiceStatus::Running,
            port: None,
            pid: Some(proc.pid),
            container_id: None,
            image: None,
            db: None,
            start_time,
            project: None,
            depends_on: vec![],
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dbkind::DbKind;
    use crate::probe::{ContainerRecord, ListeningPort, ProbeSource, ProbeWarning, ProcessRecord};

    fn container(id: &str, name: &str, running: bool) -> ContainerRecord {
        ContainerRecord {
            id: id.into(),
            name: name.into(),
            image: "postgres:16".into(),
            running,
            db: DbKind::detect("postgres:16"),
            ..Default::default()
        }
    }

    fn port(port: u16, process: &str, pid: Option<u32>) -> ListeningPort {
        ListeningPort {
            port,
            process: process.into(),
            pid,
        }
    }

    #[test]
    fn test_overlapping_sources_stay_distinct() {
        // A running container, a listening port owned by pid 111, and a
        // keyword process with pid 111 refer to overlapping activity but
        // produce three separate registry entries.
        let outcome = ScanOutcome {
            containers: vec![container("aaaabbbbcccc", "pg", true)],
            ports: vec![port(5432, "postgres", Some(111))],
            processes: vec![ProcessRecord {
                pid: 111,
                command: "node server.js".into(),
            }],
            warnings: vec![],
        };

        let mut reg = Registry::new();
        reconcile(&mut reg, &outcome, SystemTime::now(), ReconcileOptions::default());

        assert_eq!(reg.len(), 3);
        assert!(reg.contains("aaaabbbbcccc"));
        assert!(reg.contains("port-5432"));
        assert!(reg.contains("111"));
    }

    #[test]
    fn test_container_published_port_not_duplicated() {
        let mut c = container("aaaabbbbcccc", "pg", true);
        c.published_ports = vec![5432];

        let outcome = ScanOutcome {
            containers: vec![c],
            ports: vec![port(5432, "postgres", Some(111))],
            ..Default::default()
        };

        let mut reg = Registry::new();
        reconcile(&mut reg, &outcome, SystemTime::now(), ReconcileOptions::default());

        assert_eq!(reg.len(), 1);
        assert!(!reg.contains("port-5432"));
        assert_eq!(reg.get("aaaabbbbcccc").unwrap().port, Some(5432));
    }

    #[test]
    fn test_start_time_preserved_across_cycles() {
        let t0 = SystemTime::now() - Duration::from_secs(300);
        let outcome = ScanOutcome {
            ports: vec![port(3000, "node", Some(42))],
            ..Default::default()
        };

        let mut reg = Registry::new();
        reconcile(&mut reg, &outcome, t0, ReconcileOptions::default());
        let first = reg.get("port-3000").unwrap().start_time;
        assert_eq!(first, t0);

        // Same identity next cycle: start_time unchanged.
        reconcile(&mut reg, &outcome, SystemTime::now(), ReconcileOptions::default());
        assert_eq!(reg.get("port-3000").unwrap().start_time, first);
    }

    #[test]
    fn test_start_time_reset_after_absence() {
        let t0 = SystemTime::now() - Duration::from_secs(300);
        let outcome = ScanOutcome {
            ports: vec![port(3000, "node", Some(42))],
            ..Default::default()
        };

        let mut reg = Registry::new();
        reconcile(&mut reg, &outcome, t0, ReconcileOptions::default());

        // Gone for one cycle.
        reconcile(&mut reg, &ScanOutcome::default(), SystemTime::now(), ReconcileOptions::default());
        assert!(reg.is_empty());

        // Reappears: start_time is the reappearance cycle's time, not t0.
        let t2 = SystemTime::now();
        reconcile(&mut reg, &outcome, t2, ReconcileOptions::default());
        assert_eq!(reg.get("port-3000").unwrap().start_time, t2);
    }

    #[test]
    fn test_no_stale_carry_over() {
        let mut reg = Registry::new();
        reconcile(
            &mut reg,
            &ScanOutcome {
                ports: vec![port(3000, "node", None), port(8080, "java", None)],
                ..Default::default()
            },
            SystemTime::now(),
            ReconcileOptions::default(),
        );
        assert_eq!(reg.len(), 2);

        reconcile(
            &mut reg,
            &ScanOutcome {
                ports: vec![port(8080, "java", None)],
                ..Default::default()
            },
            SystemTime::now(),
            ReconcileOptions::default(),
        );
        assert_eq!(reg.len(), 1);
        assert!(!reg.contains("port-3000"));
    }

    #[test]
    fn test_container_probe_failure_is_isolated() {
        // Runtime absent: the container probe contributed a warning instead
        // of findings, but port/process results still land.
        let outcome = ScanOutcome {
            containers: vec![],
            ports: vec![port(3000, "node", Some(7))],
            processes: vec![ProcessRecord {
                pid: 7,
                command: "node dev".into(),
            }],
            warnings: vec![ProbeWarning {
                source: ProbeSource::Containers,
                message: "docker unavailable".into(),
            }],
        };

        let mut reg = Registry::new();
        reconcile(&mut reg, &outcome, SystemTime::now(), ReconcileOptions::default());

        assert_eq!(reg.len(), 2);
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_uncorrelated_process_filtered_by_default() {
        let outcome = ScanOutcome {
            ports: vec![port(3000, "node", Some(42))],
            processes: vec![
                ProcessRecord {
                    pid: 42,
                    command: "node dev".into(),
                },
                ProcessRecord {
                    pid: 99,
                    command: "python worker.py".into(),
                },
            ],
            ..Default::default()
        };

        let mut reg = Registry::new();
        reconcile(&mut reg, &outcome, SystemTime::now(), ReconcileOptions::default());
        assert!(reg.contains("42"));
        assert!(!reg.contains("99"));

        // Policy off: every keyword match is admitted.
        reconcile(
            &mut reg,
            &outcome,
            SystemTime::now(),
            ReconcileOptions { correlate_ports: false },
        );
        assert!(reg.contains("99"));
    }

    #[test]
    fn test_container_states_map_to_status() {
        let mut unhealthy = container("c1c1c1c1c1c1", "one", true);
        unhealthy.unhealthy = true;

        let outcome = ScanOutcome {
            containers: vec![
                unhealthy,
                container("c2c2c2c2c2c2", "two", true),
                container("c3c3c3c3c3c3", "three", false),
            ],
            ..Default::default()
        };

        let mut reg = Registry::new();
        reconcile(&mut reg, &outcome, SystemTime::now(), ReconcileOptions::default());

        assert_eq!(reg.get("c1c1c1c1c1c1").unwrap().status, ServiceStatus::Unhealthy);
        assert_eq!(reg.get("c2c2c2c2c2c2").unwrap().status, ServiceStatus::Running);
        assert_eq!(reg.get("c3c3c3c3c3c3").unwrap().status, ServiceStatus::Stopped);
    }

    #[test]
    fn test_compose_labels_produce_compose_kind() {
        let mut c = container("d4d4d4d4d4d4", "web-1", true);
        c.compose_project = Some("shop".into());
        c.depends_on = vec!["db".into()];

        let outcome = ScanOutcome {
            containers: vec![c],
            ..Default::default()
        };

        let mut reg = Registry::new();
        reconcile(&mut reg, &outcome, SystemTime::now(), ReconcileOptions::default());

        let svc = reg.get("d4d4d4d4d4d4").unwrap();
        assert_eq!(svc.kind, ServiceKind::ComposeGroup);
        assert_eq!(svc.project.as_deref(), Some("shop"));
        assert_eq!(svc.depends_on, vec!["db".to_string()]);
    }
}

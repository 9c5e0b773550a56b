pub mod ports;
pub mod process;

use std::time::Duration;

use tracing::{debug, warn};

use devscope_core::config::DevscopeConfig;
use devscope_core::probe::{ProbeSource, ProbeWarning, ScanOutcome};

use crate::docker::ContainerCtl;
use ports::PortProbe;
use process::ProcessProbe;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the three discovery probes for one cycle and collects their raw
/// findings. Probe failures never abort a cycle; each failed source
/// contributes a warning instead of findings.
#[derive(Clone)]
pub struct Scanner {
    ports: PortProbe,
    processes: ProcessProbe,
    docker: Option<ContainerCtl>,
}

impl Scanner {
    pub fn new(config: &DevscopeConfig, docker: Option<ContainerCtl>) -> Self {
        Self {
            ports: PortProbe::new(config.candidate_ports.clone()),
            processes: ProcessProbe::new(config.process_keywords.clone()),
            docker,
        }
    }

    pub async fn scan(&self) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();

        let containers = async {
            match &self.docker {
                Some(ctl) => match tokio::time::timeout(PROBE_TIMEOUT, ctl.list_containers()).await
                {
                    Ok(Ok(found)) => Ok(found),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err("timed out".to_string()),
                },
                None => Err("container runtime unavailable".to_string()),
            }
        };

        let ports = async {
            tokio::time::timeout(PROBE_TIMEOUT, self.ports.listening_ports())
                .await
                .map_err(|_| "timed out".to_string())
        };

        let processes = async {
            let probe = self.processes.clone();
            let handle = tokio::task::spawn_blocking(move || probe.find());
            match tokio::time::timeout(PROBE_TIMEOUT, handle).await {
                Ok(Ok(found)) => Ok(found),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err("timed out".to_string()),
            }
        };

        let (containers, ports, processes) = tokio::join!(containers, ports, processes);

        match containers {
            Ok(found) => outcome.containers = found,
            Err(message) => {
                warn!(%message, "container probe unavailable");
                outcome.warnings.push(ProbeWarning {
                    source: ProbeSource::Containers,
                    message,
                });
            }
        }

        match ports {
            Ok(found) => outcome.ports = found,
            Err(message) => {
                warn!(%message, "port probe failed");
                outcome.warnings.push(ProbeWarning {
                    source: ProbeSource::Ports,
                    message,
                });
            }
        }

        match processes {
            Ok(found) => outcome.processes = found,
            Err(message) => {
                warn!(%message, "process probe failed");
                outcome.warnings.push(ProbeWarning {
                    source: ProbeSource::Processes,
                    message,
                });
            }
        }

        debug!(
            containers = outcome.containers.len(),
            ports = outcome.ports.len(),
            processes = outcome.processes.len(),
            warnings = outcome.warnings.len(),
            "scan cycle complete"
        );

        outcome
    }
}

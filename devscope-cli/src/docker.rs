use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, SystemTime};

use bollard::container::{
    InspectContainerOptions, ListContainersOptions, LogsOptions, RemoveContainerOptions,
    RestartContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::image::ListImagesOptions;
use bollard::Docker;
use futures_util::StreamExt;
use thiserror::Error;

use devscope_core::dbkind::DbKind;
use devscope_core::probe::ContainerRecord;

const STOP_TIMEOUT_SECS: i64 = 10;

const COMPOSE_PROJECT_LABEL: &str = "com.docker.compose.project";
const COMPOSE_DEPENDS_LABEL: &str = "com.docker.compose.depends_on";

#[derive(Debug, Error)]
pub enum DockerError {
    #[error("docker: {0}")]
    Client(#[from] bollard::errors::Error),
    #[error("encode inspect payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("container has no inspectable config")]
    MissingConfig,
}

/// Container runtime client. Cheap to clone; every control operation runs
/// in its own fire-and-forget task with a cloned handle.
#[derive(Clone)]
pub struct ContainerCtl {
    client: Docker,
}

impl ContainerCtl {
    /// Connects and verifies the runtime is reachable. Failure here is
    /// non-fatal for the app: discovery simply loses one probe.
    pub async fn connect() -> Result<Self, DockerError> {
        let client = Docker::connect_with_local_defaults()?;
        client.ping().await?;
        Ok(Self { client })
    }

    /// Lists all containers, running and stopped, as probe findings.
    pub async fn list_containers(&self) -> Result<Vec<ContainerRecord>, DockerError> {
        let summaries = self
            .client
            .list_containers(Some(ListContainersOptions::<String> {
                all: true,
                ..Default::default()
            }))
            .await?;

        let mut found = Vec::new();
        for c in summaries {
            let Some(id) = c.id else { continue };
            let Some(name) = c.names.as_ref().and_then(|n| n.first()) else {
                continue;
            };

            let short_id: String = id.chars().take(12).collect();
            let name = name.strip_prefix('/').unwrap_or(name).to_string();
            let image = c.image.unwrap_or_default();
            let state = c.state.unwrap_or_default();
            let status_text = c.status.unwrap_or_default();

            let published_ports: Vec<u16> = c
                .ports
                .unwrap_or_default()
                .iter()
                .filter_map(|p| p.public_port)
                .collect();

            let labels = c.labels.unwrap_or_default();

            found.push(ContainerRecord {
                id: short_id,
                name,
                db: DbKind::detect(&image),
                image,
                running: state == "running",
                unhealthy: status_text.contains("unhealthy"),
                created_at: c
                    .created
                    .filter(|secs| *secs > 0)
                    .map(|secs| SystemTime::UNIX_EPOCH + Duration::from_secs(secs as u64)),
                published_ports,
                compose_project: labels.get(COMPOSE_PROJECT_LABEL).cloned(),
                depends_on: parse_depends_label(labels.get(COMPOSE_DEPENDS_LABEL)),
            });
        }

        Ok(found)
    }

    pub async fn start(&self, container_id: &str) -> Result<(), DockerError> {
        self.client
            .start_container(container_id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    pub async fn stop(&self, container_id: &str) -> Result<(), DockerError> {
        self.client
            .stop_container(
                container_id,
                Some(StopContainerOptions { t: STOP_TIMEOUT_SECS }),
            )
            .await?;
        Ok(())
    }

    pub async fn restart(&self, container_id: &str) -> Result<(), DockerError> {
        self.client
            .restart_container(
                container_id,
                Some(RestartContainerOptions {
                    t: STOP_TIMEOUT_SECS as isize,
                }),
            )
            .await?;
        Ok(())
    }

    pub async fn remove(&self, container_id: &str) -> Result<(), DockerError> {
        self.client
            .remove_container(container_id, None::<RemoveContainerOptions>)
            .await?;
        Ok(())
    }

    /// Last `tail` lines of the container's stdout+stderr.
    pub async fn logs(&self, container_id: &str, tail: u32) -> Result<Vec<String>, DockerError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: tail.to_string(),
            ..Default::default()
        };

        let mut stream = self.client.logs(container_id, Some(options));
        let mut lines = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for line in chunk.to_string().split_terminator('\n') {
                lines.push(line.trim_end_matches('\r').to_string());
            }
        }

        Ok(lines)
    }

    /// Pretty-printed JSON of the full inspect record.
    pub async fn inspect_json(&self, container_id: &str) -> Result<String, DockerError> {
        let inspect = self
            .client
            .inspect_container(container_id, None::<InspectContainerOptions>)
            .await?;

        Ok(serde_json::to_string_pretty(&inspect)?)
    }

    /// Env var list and container-port -> host-port bindings, the inputs to
    /// database connection parameter derivation.
    pub async fn inspect_connection_inputs(
        &self,
        container_id: &str,
    ) -> Result<(Vec<String>, BTreeMap<u16, u16>), DockerError> {
        let inspect = self
            .client
            .inspect_container(container_id, None::<InspectContainerOptions>)
            .await?;

        let env = inspect
            .config
            .ok_or(DockerError::MissingConfig)?
            .env
            .unwrap_or_default();

        let mut bindings = BTreeMap::new();
        if let Some(ports) = inspect.network_settings.and_then(|n| n.ports) {
            for (key, entries) in ports {
                let Some(container_port) = key
                    .split('/')
                    .next()
                    .and_then(|p| p.parse::<u16>().ok())
                else {
                    continue;
                };
                let host_port = entries
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|b| b.host_port.as_deref())
                    .find_map(|p| p.parse::<u16>().ok());
                if let Some(host_port) = host_port {
                    bindings.insert(container_port, host_port);
                }
            }
        }

        Ok((env, bindings))
    }

    /// Per-container and image disk usage for the sidebar and DISK column.
    pub async fn disk_usage(&self) -> Result<DiskUsage, DockerError> {
        let containers = self
            .client
            .list_containers(Some(ListContainersOptions::<String> {
                all: true,
                size: true,
                ..Default::default()
            }))
            .await?;

        let mut container_bytes = 0i64;
        let mut container_sizes = HashMap::new();
        for c in containers {
            let Some(id) = c.id else { continue };
            let size = match (c.size_rw, c.size_root_fs) {
                (Some(rw), _) if rw != 0 => rw,
                (_, Some(rootfs)) => rootfs,
                _ => 0,
            };
            container_bytes += size;
            let short_id: String = id.chars().take(12).collect();
            container_sizes.insert(short_id, size);
            container_sizes.insert(id, size);
        }

        let images = self
            .client
            .list_images(Some(ListImagesOptions::<String>::default()))
            .await?;
        let image_bytes: i64 = images.iter().map(|i| i.size).sum();

        Ok(DiskUsage {
            container_bytes,
            image_bytes,
            container_sizes,
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct DiskUsage {
    pub container_bytes: i64,
    pub image_bytes: i64,
    /// Keyed by both full and short container id.
    pub container_sizes: HashMap<String, i64>,
}

impl DiskUsage {
    pub fn total(&self) -> i64 {
        self.container_bytes + self.image_bytes
    }
}

/// `com.docker.compose.depends_on` holds `service:condition:restart`
/// entries joined by commas; only the service names matter here.
fn parse_depends_label(value: Option<&String>) -> Vec<String> {
    let Some(value) = value else { return vec![] };
    value
        .split(',')
        .filter_map(|entry| entry.split(':').next())
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
        .collect()
}

pub fn format_bytes(bytes: i64) -> String {
    const UNIT: i64 = 1024;
    if bytes < UNIT {
        return format!("{} B", bytes);
    }
    let (mut div, mut exp) = (UNIT, 0usize);
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    format!("{:.1} {}B", bytes as f64 / div as f64, ['K', 'M', 'G', 'T', 'P', 'E'][exp])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_depends_label() {
        let raw = "db:service_started:false,cache:service_healthy:true".to_string();
        assert_eq!(
            parse_depends_label(Some(&raw)),
            vec!["db".to_string(), "cache".to_string()]
        );
        assert!(parse_depends_label(None).is_empty());
        assert!(parse_depends_label(Some(&String::new())).is_empty());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}

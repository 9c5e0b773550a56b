use std::collections::BTreeMap;

use crate::model::{Service, ServiceId, ServiceKind};

/// In-memory mapping from identity to Service. Rebuilt from scratch on
/// every scan cycle; owned by the controller, written only by the
/// reconciler for the duration of one call.
#[derive(Debug, Default)]
pub struct Registry {
    services: BTreeMap<ServiceId, Service>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, svc: Service) {
        self.services.insert(svc.id.clone(), svc);
    }

    pub fn get(&self, id: &str) -> Option<&Service> {
        self.services.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.services.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Swaps the live map out for an empty one and returns the old
    /// entries, keyed by identity. Used by the reconciler to preserve
    /// start times across a rebuild.
    pub fn take_snapshot(&mut self) -> BTreeMap<ServiceId, Service> {
        std::mem::take(&mut self.services)
    }

    /// All services in display order: grouped by kind, then by status
    /// rank (running < unhealthy < stopped), then by name. Deterministic
    /// for a fixed registry.
    pub fn sorted(&self) -> Vec<&Service> {
        let mut out: Vec<&Service> = self.services.values().collect();
        out.sort_by(|a, b| {
            a.kind
                .cmp(&b.kind)
                .then_with(|| a.status.rank().cmp(&b.status.rank()))
                .then_with(|| a.name.cmp(&b.name))
        });
        out
    }

    pub fn containers(&self) -> Vec<&Service> {
        self.sorted()
            .into_iter()
            .filter(|s| s.kind.is_container())
            .collect()
    }

    pub fn processes(&self) -> Vec<&Service> {
        self.sorted()
            .into_iter()
            .filter(|s| s.kind == ServiceKind::Process)
            .collect()
    }

    pub fn databases(&self) -> Vec<&Service> {
        self.sorted().into_iter().filter(|s| s.db.is_some()).collect()
    }

    /// Find by exact id, falling back to exact display name. Used by
    /// command-entry to resolve targets.
    pub fn resolve(&self, needle: &str) -> Option<&Service> {
        self.services
            .get(needle)
            .or_else(|| self.services.values().find(|s| s.name == needle))
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::model::{ServiceKind, ServiceStatus};

    fn svc(id: &str, name: &str, kind: ServiceKind, status: ServiceStatus) -> Service {
        Service {
            id: id.into(),
            name: name.into(),
            kind,
            status,
            port: None,
            pid: None,
            container_id: None,
            image: None,
            db: None,
            start_time: SystemTime::now(),
            project: None,
            depends_on: vec![],
        }
    }

    #[test]
    fn test_sorted_groups_by_kind_status_name() {
        let mut reg = Registry::new();
        reg.upsert(svc("3", "zeta", ServiceKind::Process, ServiceStatus::Running));
        reg.upsert(svc("1", "beta", ServiceKind::Container, ServiceStatus::Stopped));
        reg.upsert(svc("2", "alpha", ServiceKind::Container, ServiceStatus::Running));
        reg.upsert(svc("4", "gamma", ServiceKind::Container, ServiceStatus::Unhealthy));

        let names: Vec<&str> = reg.sorted().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "gamma", "beta", "zeta"]);
    }

    #[test]
    fn test_sorted_is_deterministic() {
        let mut reg = Registry::new();
        reg.upsert(svc("b", "two", ServiceKind::Container, ServiceStatus::Running));
        reg.upsert(svc("a", "one", ServiceKind::Container, ServiceStatus::Running));

        let first: Vec<String> = reg.sorted().iter().map(|s| s.id.clone()).collect();
        let second: Vec<String> = reg.sorted().iter().map(|s| s.id.clone()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_by_id_then_name() {
        let mut reg = Registry::new();
        reg.upsert(svc("abc123", "api", ServiceKind::Container, ServiceStatus::Running));

        assert_eq!(reg.resolve("abc123").unwrap().name, "api");
        assert_eq!(reg.resolve("api").unwrap().id, "abc123");
        assert!(reg.resolve("missing").is_none());
    }

    #[test]
    fn test_take_snapshot_empties_registry() {
        let mut reg = Registry::new();
        reg.upsert(svc("x", "x", ServiceKind::Process, ServiceStatus::Running));

        let old = reg.take_snapshot();
        assert_eq!(old.len(), 1);
        assert!(reg.is_empty());
    }
}

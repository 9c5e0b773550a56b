use crate::model::{Service, ServiceKind, ServiceStatus};

/// Everything the operator can do to a service. Menu contents and
/// command-entry both resolve to this closed set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    ViewLogs,
    BrowseDatabase,
    RestartContainer,
    StopContainer,
    StartContainer,
    InspectJson,
    OpenShell,
    DeleteContainer,
    KillProcess,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::ViewLogs => "View Logs",
            Action::BrowseDatabase => "Browse Database",
            Action::RestartContainer => "Restart Container",
            Action::StopContainer => "Stop Container",
            Action::StartContainer => "Start Container",
            Action::InspectJson => "Inspect JSON",
            Action::OpenShell => "Open Shell (/bin/sh)",
            Action::DeleteContainer => "Delete Container",
            Action::KillProcess => "Kill Process",
        }
    }
}

/// The action menu for a service, as a pure function of its kind, status
/// and database tag.
pub fn actions_for(svc: &Service) -> Vec<Action> {
    let mut items = Vec::new();

    match svc.kind {
        ServiceKind::Container | ServiceKind::ComposeGroup => {
            if svc.status.is_running() {
                items.push(Action::ViewLogs);
                if svc.db.is_some() {
                    items.push(Action::BrowseDatabase);
                }
                items.push(Action::RestartContainer);
                items.push(Action::StopContainer);
                items.push(Action::InspectJson);
                items.push(Action::OpenShell);
                items.push(Action::DeleteContainer);
            } else {
                items.push(Action::StartContainer);
                items.push(Action::InspectJson);
                items.push(Action::DeleteContainer);
            }
        }
        ServiceKind::Process => {
            items.push(Action::ViewLogs);
            items.push(Action::KillProcess);
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::dbkind::DbKind;

    fn svc(kind: ServiceKind, status: ServiceStatus, db: Option<DbKind>) -> Service {
        Service {
            id: "id".into(),
            name: "name".into(),
            kind,
            status,
            port: None,
            pid: None,
            container_id: None,
            image: None,
            db,
            start_time: SystemTime::now(),
            project: None,
            depends_on: vec![],
        }
    }

    #[test]
    fn test_running_container_menu() {
        let items = actions_for(&svc(ServiceKind::Container, ServiceStatus::Running, None));
        assert_eq!(
            items,
            vec![
                Action::ViewLogs,
                Action::RestartContainer,
                Action::StopContainer,
                Action::InspectJson,
                Action::OpenShell,
                Action::DeleteContainer,
            ]
        );
    }

    #[test]
    fn test_stopped_container_menu_excludes_runtime_actions() {
        let items = actions_for(&svc(ServiceKind::Container, ServiceStatus::Stopped, None));
        assert_eq!(
            items,
            vec![Action::StartContainer, Action::InspectJson, Action::DeleteContainer]
        );
        assert!(!items.contains(&Action::StopContainer));
        assert!(!items.contains(&Action::RestartContainer));
        assert!(!items.contains(&Action::ViewLogs));
    }

    #[test]
    fn test_database_tag_adds_browse() {
        let items = actions_for(&svc(
            ServiceKind::Container,
            ServiceStatus::Running,
            Some(DbKind::Postgres),
        ));
        assert_eq!(items[1], Action::BrowseDatabase);
    }

    #[test]
    fn test_stopped_database_container_cannot_browse() {
        let items = actions_for(&svc(
            ServiceKind::Container,
            ServiceStatus::Stopped,
            Some(DbKind::Postgres),
        ));
        assert!(!items.contains(&Action::BrowseDatabase));
    }

    #[test]
    fn test_process_menu() {
        let items = actions_for(&svc(ServiceKind::Process, ServiceStatus::Running, None));
        assert_eq!(items, vec![Action::ViewLogs, Action::KillProcess]);
    }

    #[test]
    fn test_compose_container_behaves_like_container() {
        let items = actions_for(&svc(ServiceKind::ComposeGroup, ServiceStatus::Running, None));
        assert!(items.contains(&Action::StopContainer));
        assert!(items.contains(&Action::OpenShell));
    }
}

//! Reconciliation of worker reports into the service aggregate.
//!
//! Each operation folds one [`GenericComponentReport`] into a resource
//! type's collection and the matching pending collection. Successful items
//! land in the collection; failed items stay staged with their error detail
//! so a retry has everything it needs.
//!
//! Names are the matching key. A report naming a component twice is
//! rejected before anything is touched.

use tracing::{debug, warn};

use crate::error::DomainError;
use crate::report::GenericComponentReport;
use crate::service::{Component, ComponentStatus, ResourceType, Service, Stage};

/// Folds `report` into `service` using the operation for `stage`.
pub fn reconcile(
    service: &mut Service,
    resource: ResourceType,
    stage: Stage,
    report: &GenericComponentReport,
) -> Result<(), DomainError> {
    match stage {
        Stage::Create => create_result(service, resource, report),
        Stage::Update => update_result(service, resource, report),
        Stage::Delete => delete_result(service, resource, report),
    }
}

/// Applies a create outcome.
///
/// Non-errored items are upserted into the collection. Errored items become
/// the whole of `to_create`. The collection is marked completed even when
/// every item failed.
pub fn create_result(
    service: &mut Service,
    resource: ResourceType,
    report: &GenericComponentReport,
) -> Result<(), DomainError> {
    report.ensure_unique_names(resource)?;

    let set = service.resources.entry(resource);
    let mut errored = Vec::new();
    for component in &report.components {
        if component.is_errored() {
            errored.push(component.clone());
        } else {
            set.collection.upsert(component.clone());
        }
    }
    set.collection.status = ComponentStatus::Completed;

    debug!(
        %resource,
        created = report.components.len() - errored.len(),
        errored = errored.len(),
        "Reconciled create result"
    );

    let pending = set.pending_mut(Stage::Create);
    pending.items = errored;
    pending.status = report.status.clone();
    pending.set_error(&report.error_code, &report.error_message);

    Ok(())
}

/// Applies an update outcome.
///
/// Completed items replace their namesake in place. Anything else leaves
/// the existing item alone and is staged in `to_update`, which ends up
/// holding exactly the report's non-completed items.
pub fn update_result(
    service: &mut Service,
    resource: ResourceType,
    report: &GenericComponentReport,
) -> Result<(), DomainError> {
    report.ensure_unique_names(resource)?;

    let set = service.resources.entry(resource);
    let mut staged: Vec<Component> = Vec::new();
    for component in &report.components {
        if !component.is_completed() {
            staged.push(component.clone());
            continue;
        }
        match set.collection.get_mut(&component.name) {
            Some(existing) => *existing = component.clone(),
            None => warn!(
                %resource,
                name = %component.name,
                "Ignoring completed update for unknown component"
            ),
        }
    }
    set.collection.status = ComponentStatus::Completed;

    let pending = set.pending_mut(Stage::Update);
    pending.items = staged;
    pending.status = report.status.clone();
    pending.set_error(&report.error_code, &report.error_message);

    Ok(())
}

/// Applies a delete outcome.
///
/// Items the report confirms are dropped. Items the report marks errored
/// stay in the collection (as the errored version) and in `to_delete`.
/// Items the report does not mention are kept untouched.
pub fn delete_result(
    service: &mut Service,
    resource: ResourceType,
    report: &GenericComponentReport,
) -> Result<(), DomainError> {
    report.ensure_unique_names(resource)?;

    let set = service.resources.entry(resource);
    let mut remaining = Vec::with_capacity(set.collection.len());
    let mut errored = Vec::new();
    for existing in set.collection.items.drain(..) {
        match report.find(&existing.name) {
            None => remaining.push(existing),
            Some(reported) if reported.is_errored() => {
                remaining.push(reported.clone());
                errored.push(reported.clone());
            }
            Some(_) => {}
        }
    }
    set.collection.items = remaining;
    set.collection.status = ComponentStatus::Completed;

    let pending = set.pending_mut(Stage::Delete);
    pending.status = if errored.is_empty() {
        ComponentStatus::Completed
    } else {
        ComponentStatus::Errored
    };
    pending.items = errored;
    pending.set_error(&report.error_code, &report.error_message);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::Collection;

    fn service_with(resource: ResourceType, names: &[&str]) -> Service {
        let mut service = Service::new("svc-1");
        service.resources.entry(resource).collection =
            Collection::with_items(names.iter().map(|n| Component::new(*n)).collect());
        service
    }

    fn report(components: Vec<Component>, status: &str) -> GenericComponentReport {
        GenericComponentReport {
            service: "svc-1".into(),
            components,
            status: status.into(),
            ..Default::default()
        }
    }

    #[test]
    fn create_splits_errored_items() {
        let mut service = Service::new("svc-1");
        let report = report(
            vec![
                Component::new("n1").with_status("completed"),
                Component::new("n2")
                    .with_status("errored")
                    .with_error("E", "no quota"),
            ],
            "errored",
        );

        create_result(&mut service, ResourceType::Networks, &report).unwrap();

        let collection = service.collection(ResourceType::Networks).unwrap();
        assert_eq!(collection.names().collect::<Vec<_>>(), vec!["n1"]);
        assert_eq!(collection.status, ComponentStatus::Completed);

        let pending = service.pending(ResourceType::Networks, Stage::Create).unwrap();
        assert_eq!(pending.names().collect::<Vec<_>>(), vec!["n2"]);
        assert_eq!(pending.status, ComponentStatus::Errored);
    }

    #[test]
    fn create_replaces_existing_name() {
        let mut service = service_with(ResourceType::Routers, &["r1"]);
        let report = report(
            vec![
                Component::new("r1")
                    .with_status("completed")
                    .with_attribute("ip", "1.1.1.1"),
            ],
            "completed",
        );

        create_result(&mut service, ResourceType::Routers, &report).unwrap();

        let collection = service.collection(ResourceType::Routers).unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.items[0].attribute_str("ip"), Some("1.1.1.1"));
    }

    #[test]
    fn create_all_errored_still_completes_collection() {
        let mut service = Service::new("svc-1");
        let report = report(vec![Component::new("i1").with_status("errored")], "errored");

        create_result(&mut service, ResourceType::Instances, &report).unwrap();

        let collection = service.collection(ResourceType::Instances).unwrap();
        assert!(collection.is_empty());
        assert_eq!(collection.status, ComponentStatus::Completed);
    }

    #[test]
    fn update_stages_non_completed_items() {
        let mut service = service_with(ResourceType::Instances, &["a", "b", "c"]);
        let report = report(
            vec![
                Component::new("a")
                    .with_status("completed")
                    .with_attribute("cpus", 4),
                Component::new("b")
                    .with_status("errored")
                    .with_error("E", "resize failed"),
            ],
            "errored",
        );

        update_result(&mut service, ResourceType::Instances, &report).unwrap();

        let collection = service.collection(ResourceType::Instances).unwrap();
        assert_eq!(collection.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(collection.get("a").unwrap().attribute("cpus"), Some(&serde_json::json!(4)));
        assert_eq!(collection.get("b").unwrap().status, ComponentStatus::Pending);

        let pending = service.pending(ResourceType::Instances, Stage::Update).unwrap();
        assert_eq!(pending.names().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(pending.items[0].error_message, "resize failed");
    }

    #[test]
    fn update_never_creates_components() {
        let mut service = service_with(ResourceType::Instances, &["a"]);
        let report = report(
            vec![
                Component::new("ghost").with_status("completed"),
                Component::new("phantom").with_status("errored"),
            ],
            "errored",
        );

        update_result(&mut service, ResourceType::Instances, &report).unwrap();

        let collection = service.collection(ResourceType::Instances).unwrap();
        assert_eq!(collection.names().collect::<Vec<_>>(), vec!["a"]);
        let pending = service.pending(ResourceType::Instances, Stage::Update).unwrap();
        assert_eq!(pending.names().collect::<Vec<_>>(), vec!["phantom"]);
    }

    #[test]
    fn delete_keeps_errored_and_unmentioned_items() {
        let mut service = service_with(ResourceType::Firewalls, &["f1", "f2", "f3"]);
        let report = report(
            vec![
                Component::new("f1").with_status("completed"),
                Component::new("f2")
                    .with_status("errored")
                    .with_error("E", "in use"),
            ],
            "errored",
        );

        delete_result(&mut service, ResourceType::Firewalls, &report).unwrap();

        let collection = service.collection(ResourceType::Firewalls).unwrap();
        assert_eq!(collection.names().collect::<Vec<_>>(), vec!["f2", "f3"]);
        assert!(collection.get("f2").unwrap().is_errored());

        let pending = service.pending(ResourceType::Firewalls, Stage::Delete).unwrap();
        assert_eq!(pending.names().collect::<Vec<_>>(), vec!["f2"]);
        assert_eq!(pending.status, ComponentStatus::Errored);
    }

    #[test]
    fn delete_without_errors_clears_pending() {
        let mut service = service_with(ResourceType::Nats, &["nat"]);
        let report = report(vec![Component::new("nat").with_status("completed")], "completed");

        delete_result(&mut service, ResourceType::Nats, &report).unwrap();

        assert!(service.collection(ResourceType::Nats).unwrap().is_empty());
        let pending = service.pending(ResourceType::Nats, Stage::Delete).unwrap();
        assert!(pending.is_empty());
        assert_eq!(pending.status, ComponentStatus::Completed);
    }

    #[test]
    fn duplicate_report_names_leave_service_untouched() {
        let mut service = service_with(ResourceType::Networks, &["n1"]);
        let before = service.clone();
        let report = report(
            vec![
                Component::new("n2").with_status("completed"),
                Component::new("n2").with_status("completed"),
            ],
            "completed",
        );

        for stage in Stage::ALL {
            let err = reconcile(&mut service, ResourceType::Networks, stage, &report).unwrap_err();
            assert!(matches!(err, DomainError::DuplicateComponent { .. }));
        }
        assert_eq!(service, before);
    }

    #[test]
    fn pending_collection_copies_report_error() {
        let mut service = Service::new("svc-1");
        let mut report = report(vec![], "errored");
        report.error_code = "500".into();
        report.error_message = "provider unavailable".into();

        create_result(&mut service, ResourceType::Routers, &report).unwrap();

        let pending = service.pending(ResourceType::Routers, Stage::Create).unwrap();
        assert_eq!(pending.error_code, "500");
        assert_eq!(pending.error_message, "provider unavailable");
    }
}

//! Integration tests for the service aggregate.
//!
//! These tests drive a service document through a sequence of worker
//! reports and check the reconciled collections after each step.

use domain::{
    ComponentStatus, DomainError, GenericComponentReport, ResourceType, Service, Stage,
    Workflow, reconcile, status,
};
use serde_json::json;

fn report(value: serde_json::Value) -> GenericComponentReport {
    serde_json::from_value(value).unwrap()
}

fn fresh_service() -> Service {
    serde_json::from_value(json!({
        "id": "svc-42",
        "name": "shop",
        "type": "vcloud",
        "client_name": "acme",
        "networks": {"items": []},
        "networks_to_create": {"items": [
            {"name": "web", "range": "10.1.0.0/24"},
            {"name": "db", "range": "10.2.0.0/24"}
        ]}
    }))
    .unwrap()
}

mod lifecycle {
    use super::*;

    #[test]
    fn partial_create_then_retry() {
        let mut service = fresh_service();

        reconcile(
            &mut service,
            ResourceType::Networks,
            Stage::Create,
            &report(json!({
                "service": "svc-42",
                "status": "errored",
                "error": "range overlaps",
                "components": [
                    {"name": "web", "range": "10.1.0.0/24", "status": "completed"},
                    {"name": "db", "range": "10.2.0.0/24", "status": "errored",
                     "error_message": "range overlaps"}
                ]
            })),
        )
        .unwrap();

        let staged = service.pending(ResourceType::Networks, Stage::Create).unwrap();
        assert_eq!(staged.names().collect::<Vec<_>>(), vec!["db"]);
        assert_eq!(staged.error_message, "range overlaps");

        // The retry reports only the previously failed item.
        reconcile(
            &mut service,
            ResourceType::Networks,
            Stage::Create,
            &report(json!({
                "service": "svc-42",
                "status": "completed",
                "components": [{"name": "db", "range": "10.2.0.0/24", "status": "completed"}]
            })),
        )
        .unwrap();

        let networks = service.collection(ResourceType::Networks).unwrap();
        assert_eq!(networks.names().collect::<Vec<_>>(), vec!["web", "db"]);
        let staged = service.pending(ResourceType::Networks, Stage::Create).unwrap();
        assert!(staged.is_empty());
        assert_eq!(staged.status, ComponentStatus::Completed);
    }

    #[test]
    fn create_update_delete_sequence() {
        let mut service = fresh_service();

        reconcile(
            &mut service,
            ResourceType::Networks,
            Stage::Create,
            &report(json!({
                "status": "completed",
                "components": [
                    {"name": "web", "status": "completed"},
                    {"name": "db", "status": "completed"}
                ]
            })),
        )
        .unwrap();

        reconcile(
            &mut service,
            ResourceType::Networks,
            Stage::Update,
            &report(json!({
                "status": "completed",
                "components": [{"name": "web", "status": "completed", "range": "10.9.0.0/24"}]
            })),
        )
        .unwrap();

        let web = service
            .collection(ResourceType::Networks)
            .unwrap()
            .get("web")
            .unwrap();
        assert_eq!(web.attribute_str("range"), Some("10.9.0.0/24"));

        reconcile(
            &mut service,
            ResourceType::Networks,
            Stage::Delete,
            &report(json!({
                "status": "errored",
                "components": [
                    {"name": "web", "status": "completed"},
                    {"name": "db", "status": "errored", "error_message": "in use"}
                ]
            })),
        )
        .unwrap();

        let networks = service.collection(ResourceType::Networks).unwrap();
        assert_eq!(networks.names().collect::<Vec<_>>(), vec!["db"]);
        assert_eq!(networks.get("db").unwrap().error_message, "in use");
        let staged = service.pending(ResourceType::Networks, Stage::Delete).unwrap();
        assert_eq!(staged.status, ComponentStatus::Errored);
    }
}

mod persistence {
    use super::*;

    #[test]
    fn reconciled_document_survives_round_trip() {
        let mut service = fresh_service();
        service.workflow = Workflow::default_create();
        service.status = "creating_networks".into();

        reconcile(
            &mut service,
            ResourceType::Networks,
            Stage::Create,
            &report(json!({
                "status": "completed",
                "components": [{"name": "web", "status": "completed", "network_aws_id": "subnet-1"}]
            })),
        )
        .unwrap();

        let decoded = Service::from_slice(&service.to_vec().unwrap()).unwrap();
        assert_eq!(decoded, service);

        let value: serde_json::Value = serde_json::from_slice(&service.to_vec().unwrap()).unwrap();
        assert_eq!(value["networks"]["items"][0]["network_aws_id"], "subnet-1");
        assert_eq!(value["networks_to_create"]["status"], "completed");
    }

    #[test]
    fn failure_marks_service_pre_failed() {
        let mut service = fresh_service();
        let failure = report(json!({
            "status": "errored",
            "components": [{"name": "web", "status": "errored", "error_message": "timeout"}]
        }));

        reconcile(&mut service, ResourceType::Networks, Stage::Create, &failure).unwrap();
        service.mark_as_failed(failure.first_error().unwrap_or_default());

        assert_eq!(service.status, status::PRE_FAILED);
        assert_eq!(service.last_known_error, "timeout");
    }
}

mod rejection {
    use super::*;

    #[test]
    fn duplicate_names_are_rejected_for_every_stage() {
        let duplicated = report(json!({
            "status": "completed",
            "components": [{"name": "web"}, {"name": "web"}]
        }));

        for stage in Stage::ALL {
            let mut service = fresh_service();
            let before = service.clone();
            let err =
                reconcile(&mut service, ResourceType::Networks, stage, &duplicated).unwrap_err();
            assert!(matches!(
                err,
                DomainError::DuplicateComponent { resource: ResourceType::Networks, .. }
            ));
            assert_eq!(service, before);
        }
    }

    #[test]
    fn reconcile_creates_missing_collections() {
        let mut service = Service::new("svc-1");
        reconcile(
            &mut service,
            ResourceType::Elbs,
            Stage::Delete,
            &report(json!({"status": "completed", "components": []})),
        )
        .unwrap();

        assert!(service.collection(ResourceType::Elbs).is_some());
        assert!(service.pending(ResourceType::Elbs, Stage::Delete).is_some());
    }
}

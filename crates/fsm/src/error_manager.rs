//! Provider failure handling.
//!
//! A `<type>.<verb>.error` subject means a worker could not finish some of
//! the components it was given. The report is folded in like any other
//! outcome so the per-item failure detail is kept, then the service is
//! parked in `pre-failed` and routed on `to_error`.

use domain::{GenericComponentReport, ResourceType, Service, reconcile};

use crate::error::{FsmError, Result};
use crate::monitor::MonitorMessage;

const ERROR_VERBS: [&str; 3] = ["create", "update", "delete"];

/// Returns true if the subject ends in `<create|update|delete>.error`.
pub fn is_an_error_message(subject: &str) -> bool {
    let mut segments = subject.rsplit('.');
    matches!(
        (segments.next(), segments.next()),
        (Some("error"), Some(verb)) if ERROR_VERBS.contains(&verb)
    )
}

/// Folds a failure report into the service and marks it `pre-failed`.
///
/// Returns one ERROR monitor line per failed component.
pub fn mark_as_failed(
    service: &mut Service,
    subject: &str,
    body: &[u8],
) -> Result<Vec<MonitorMessage>> {
    let mut segments = subject.split('.');
    let resource: ResourceType = segments.next().unwrap_or_default().parse()?;
    let stage = match segments.next() {
        Some(verb) if segments.next() == Some("error") && segments.next().is_none() => verb.parse(),
        _ => return Err(FsmError::MalformedSubject(subject.to_string())),
    }
    .map_err(|_| FsmError::MalformedSubject(subject.to_string()))?;

    let report = GenericComponentReport::from_slice(body)?;
    let resource = service.effective_resource(resource);
    reconcile(service, resource, stage, &report)?;

    metrics::counter!("fsm_provider_errors_total", "resource" => resource.as_str()).increment(1);

    let messages: Vec<MonitorMessage> = report
        .errored()
        .map(|c| {
            MonitorMessage::error(format!(
                "{} {} {} failed with: \n{}",
                resource.label(),
                c.name,
                stage.noun(),
                c.error_message
            ))
        })
        .collect();

    let error = report.first_error().unwrap_or_default().to_string();
    tracing::warn!(id = %service.id, %subject, %error, "Provider reported failure");
    service.mark_as_failed(error);

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Component, Stage, status};
    use serde_json::json;

    #[test]
    fn classifies_error_subjects() {
        assert!(is_an_error_message("networks.create.error"));
        assert!(is_an_error_message("instances.update.error"));
        assert!(is_an_error_message("nats.delete.error"));
        assert!(!is_an_error_message("networks.create.done"));
        assert!(!is_an_error_message("vpcs.find.error"));
        assert!(!is_an_error_message("error"));
    }

    #[test]
    fn folds_failure_and_marks_pre_failed() {
        let mut service = Service::new("svc-1");
        service.status = "creating_networks".into();
        service
            .resources
            .entry(ResourceType::Networks)
            .pending_mut(Stage::Create)
            .upsert(Component::new("n1"));

        let body = json!({
            "service": "svc-1",
            "status": "errored",
            "components": [{"name": "n1", "status": "errored", "error_message": "overlap"}]
        });
        let lines =
            mark_as_failed(&mut service, "networks.create.error", body.to_string().as_bytes())
                .unwrap();

        let pending = service.pending(ResourceType::Networks, Stage::Create).unwrap();
        assert!(pending.get("n1").unwrap().is_errored());
        assert_eq!(service.status, status::PRE_FAILED);
        assert_eq!(service.last_known_error, "overlap");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].body.starts_with("Network n1 creation failed with:"));
    }

    #[test]
    fn unknown_resource_is_rejected() {
        let mut service = Service::new("svc-1");
        let err = mark_as_failed(&mut service, "widgets.create.error", b"{}").unwrap_err();
        assert!(matches!(err, FsmError::UnknownResource(_)));
        assert!(service.status.is_empty());
    }

    #[test]
    fn bad_body_is_a_decode_error() {
        let mut service = Service::new("svc-1");
        let err = mark_as_failed(&mut service, "routers.create.error", b"not json").unwrap_err();
        assert!(matches!(err, FsmError::Decode(_)));
    }

    #[test]
    fn bootstrap_failures_land_in_bootstraps() {
        let mut service = Service::new("svc-1");
        service.status = status::BOOTSTRAPPING.into();
        let body = json!({"components": [{"name": "b1", "status": "errored"}]});

        mark_as_failed(&mut service, "executions.create.error", body.to_string().as_bytes())
            .unwrap();

        assert!(
            service
                .pending(ResourceType::Bootstraps, Stage::Create)
                .unwrap()
                .contains("b1")
        );
        assert!(service.pending(ResourceType::Executions, Stage::Create).is_none());
    }
}

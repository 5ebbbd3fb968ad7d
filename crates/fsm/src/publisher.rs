//! Outbound message preparation.
//!
//! Turns the subject picked by the workflow into the payload a worker (or the
//! service owner, for terminal subjects) expects. Preparing a message never
//! performs I/O; the coordinator sends the [`Publication`] once the aggregate
//! has been saved.

use std::collections::BTreeMap;

use chrono::Utc;
use common::ServiceId;
use domain::resources::{Execution, Firewall, Instance, Nat, Network};
use domain::{Collection, Component, ResourceType, Service, Stage, status};
use serde::Serialize;
use serde_json::Value;

use crate::error::{FsmError, Result};
use crate::monitor::MonitorMessage;
use crate::subject::{Outcome, ServiceCommand, Subject};
use crate::template;

/// Status carried by every outbound command.
const PROCESSING: &str = "processing";

/// Tag key identifying the owning service on imported resources.
const SERVICE_TAG: &str = "ernest.service";

/// A message ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub subject: String,
    pub payload: Vec<u8>,
    /// Status to push to the status tracker after publishing.
    pub status_update: Option<&'static str>,
    pub monitor: Vec<MonitorMessage>,
}

#[derive(Serialize)]
struct CommandEnvelope<'a> {
    service: &'a ServiceId,
    status: &'static str,
    components: Vec<Value>,
    sequential_processing: bool,
}

#[derive(Serialize)]
struct FindEnvelope<'a> {
    service: &'a ServiceId,
    status: &'static str,
    #[serde(rename = "_type")]
    provider_type: String,
    aws_access_key_id: String,
    aws_secret_access_key: String,
    datacenter_region: String,
    tags: BTreeMap<&'static str, String>,
}

/// Builds the outbound message for `subject`.
///
/// The subject must be one the service's workflow knows about. Terminal
/// subjects stamp `finished_at`; resource commands mark the pending
/// collection as started.
pub fn prepare(service: &mut Service, subject: &str) -> Result<Publication> {
    if !service.workflow.allows(subject) {
        return Err(FsmError::MessageNotSupported(subject.to_string()));
    }

    match Subject::parse(subject)? {
        Subject::Terminal(command, outcome) => terminal(service, subject, command, outcome),
        Subject::Command(resource, verb) => match verb.stage() {
            Some(stage) => command(service, subject, resource, stage),
            None => find(service, subject, resource),
        },
        Subject::Service(_) | Subject::Result(..) => {
            Err(FsmError::MessageNotSupported(subject.to_string()))
        }
    }
}

fn terminal(
    service: &mut Service,
    subject: &str,
    command: ServiceCommand,
    outcome: Outcome,
) -> Result<Publication> {
    service.finished_at = Some(Utc::now());

    let noun = match command {
        ServiceCommand::Delete => "deletion",
        ServiceCommand::Import => "import",
        ServiceCommand::Create | ServiceCommand::Patch => "creation",
    };
    let (status_update, line) = match outcome {
        Outcome::Done => (
            status::DONE,
            MonitorMessage::info(format!("Environment {noun} done")),
        ),
        Outcome::Error => (
            status::ERRORED,
            MonitorMessage::error(format!(
                "Environment {noun} failed: {}",
                service.last_known_error
            )),
        ),
    };

    // The stored status keeps the arc target; the owner sees the outcome.
    let mut snapshot = serde_json::to_value(&*service)?;
    snapshot["status"] = Value::from(status_update);

    Ok(Publication {
        subject: subject.to_string(),
        payload: serde_json::to_vec(&snapshot)?,
        status_update: Some(status_update),
        monitor: vec![line],
    })
}

fn command(
    service: &mut Service,
    subject: &str,
    resource: ResourceType,
    stage: Stage,
) -> Result<Publication> {
    let resource = service.effective_resource(resource);
    let document = serde_json::to_value(&*service)?;

    let pending = service.pending(resource, stage).ok_or_else(|| {
        FsmError::ComponentsNotPresent(format!("{}_to_{}", resource.as_str(), stage.as_str()))
    })?;

    let components = pending
        .items
        .iter()
        .map(|component| {
            let mut value = serde_json::to_value(component)?;
            template::resolve_value(&document, &mut value);
            Ok(value)
        })
        .collect::<Result<Vec<Value>>>()?;

    let monitor = command_lines(resource, stage, pending);
    let envelope = CommandEnvelope {
        service: &service.id,
        status: PROCESSING,
        components,
        sequential_processing: pending.sequential_processing,
    };
    let payload = serde_json::to_vec(&envelope)?;

    service.resources.entry(resource).pending_mut(stage).started = true;

    Ok(Publication {
        subject: subject.to_string(),
        payload,
        status_update: None,
        monitor,
    })
}

fn command_lines(resource: ResourceType, stage: Stage, pending: &Collection) -> Vec<MonitorMessage> {
    let header = match (resource, stage) {
        (ResourceType::Executions, Stage::Create) => "Running executions:".to_string(),
        (ResourceType::Bootstraps, Stage::Create) => "Bootstrapping:".to_string(),
        _ => format!("{} {}:", stage.gerund(), resource.as_str()),
    };

    let mut lines = vec![MonitorMessage::info(header)];
    lines.extend(
        pending
            .items
            .iter()
            .map(|component| MonitorMessage::plain(format!("\t- {}", describe(resource, component)))),
    );
    lines
}

/// One-line summary of a component for the monitor.
fn describe(resource: ResourceType, component: &Component) -> String {
    let summary = match resource {
        ResourceType::Networks => component
            .decode::<Network>()
            .ok()
            .map(|n| n.range)
            .filter(|range| !range.is_empty()),
        ResourceType::Instances => component
            .decode::<Instance>()
            .ok()
            .filter(|i| !i.ip.is_empty())
            .map(|i| format!("{} ({})", i.name, i.ip)),
        ResourceType::Firewalls => component
            .decode::<Firewall>()
            .ok()
            .map(|f| format!("{} ({} rules)", f.name, f.rules.len())),
        ResourceType::Nats => component
            .decode::<Nat>()
            .ok()
            .map(|n| format!("{} ({} rules)", n.name, n.rules.len())),
        ResourceType::Executions | ResourceType::Bootstraps => component
            .decode::<Execution>()
            .ok()
            .filter(|e| !e.target.is_empty())
            .map(|e| format!("{} on {}", e.name, e.target)),
        _ => None,
    };
    summary.unwrap_or_else(|| component.name.clone())
}

/// Credentials come from the first datacenter; a service without one sends
/// empty credentials and lets the worker report the failure.
fn find(service: &Service, subject: &str, resource: ResourceType) -> Result<Publication> {
    let datacenter = service.datacenter().unwrap_or_default();

    let envelope = FindEnvelope {
        service: &service.id,
        status: PROCESSING,
        provider_type: service.service_type.clone(),
        aws_access_key_id: datacenter.aws_access_key_id,
        aws_secret_access_key: datacenter.aws_secret_access_key,
        datacenter_region: datacenter.region,
        tags: BTreeMap::from([(SERVICE_TAG, service.name.clone())]),
    };

    Ok(Publication {
        subject: subject.to_string(),
        payload: serde_json::to_vec(&envelope)?,
        status_update: None,
        monitor: vec![MonitorMessage::info(format!("Importing {}", resource.as_str()))],
    })
}

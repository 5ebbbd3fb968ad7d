//! Inbound message routing.
//!
//! The router decides what an inbound message does to a service before the
//! workflow is moved:
//!
//! 1. `<verb>.error` subjects go to the error manager and route as `to_error`,
//!    whatever the workflow says.
//! 2. Anything else must be whitelisted by the workflow (or be one of the
//!    always-legal `service.delete` / `service.patch`).
//! 3. Whitelisted subjects are looked up in a dispatch table built once at
//!    construction. Subjects with no entry pass through untouched.
//!
//! Handlers are plain functions. They mutate a draft copy of the service and
//! describe their side effects (monitor lines, status tracker update) instead
//! of performing them, so a failed message leaves no trace.

use std::collections::HashMap;

use chrono::Utc;
use domain::resources::Router;
use domain::{GenericComponentReport, ResourceType, Service, Stage, Workflow, reconcile, status};
use serde_json::{Map, Value};

use crate::error::{FsmError, Result};
use crate::error_manager;
use crate::monitor::MonitorMessage;
use crate::subject::{Outcome, ServiceCommand, Subject, Verb};

/// Subjects accepted regardless of the workflow.
pub const ALWAYS_SUPPORTED: [&str; 2] = ["service.delete", "service.patch"];

/// Side effects requested by a handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effects {
    /// Lines for the monitor.
    pub monitor: Vec<MonitorMessage>,
    /// Status to push to the status tracker.
    pub status_update: Option<&'static str>,
}

/// Result of routing one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct Routed {
    /// Event the workflow should fire next.
    pub subject: String,
    pub effects: Effects,
}

/// What a handler gets to see of the inbound message.
pub struct Inbound<'a> {
    pub subject: Subject,
    pub body: &'a [u8],
    create_workflow: &'a Workflow,
    delete_workflow: &'a Workflow,
}

type Handler = fn(&mut Service, &Inbound<'_>, &mut Effects) -> Result<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RouteKey {
    Service(ServiceCommand),
    Done(ResourceType, Verb),
}

impl RouteKey {
    fn for_subject(subject: Subject) -> Option<Self> {
        match subject {
            Subject::Service(command) => Some(RouteKey::Service(command)),
            Subject::Result(resource, verb, Outcome::Done) => Some(RouteKey::Done(resource, verb)),
            _ => None,
        }
    }
}

/// Validates inbound subjects and dispatches them to their handler.
pub struct MessageRouter {
    table: HashMap<RouteKey, Handler>,
    create_workflow: Workflow,
    delete_workflow: Workflow,
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageRouter {
    /// Creates a router using the built-in workflows.
    pub fn new() -> Self {
        Self::with_workflows(Workflow::default_create(), Workflow::default_delete())
    }

    /// Creates a router that attaches the given workflows to services that
    /// arrive without one.
    pub fn with_workflows(create_workflow: Workflow, delete_workflow: Workflow) -> Self {
        let mut table: HashMap<RouteKey, Handler> = HashMap::new();

        table.insert(RouteKey::Service(ServiceCommand::Create), service_create);
        table.insert(RouteKey::Service(ServiceCommand::Import), service_create);
        table.insert(RouteKey::Service(ServiceCommand::Delete), service_delete);
        table.insert(RouteKey::Service(ServiceCommand::Patch), service_patch);

        for resource in ResourceType::ALL {
            for verb in [Verb::Create, Verb::Update, Verb::Delete] {
                table.insert(RouteKey::Done(resource, verb), component_result);
            }
        }
        table.insert(RouteKey::Done(ResourceType::Routers, Verb::Create), routers_created);

        Self {
            table,
            create_workflow,
            delete_workflow,
        }
    }

    /// The workflow attached to services created without one.
    pub fn create_workflow(&self) -> &Workflow {
        &self.create_workflow
    }

    /// Returns true if `subject` may be handled for this service.
    ///
    /// A service that has no workflow yet is checked against the workflow it
    /// is about to receive.
    pub fn is_supported_message(&self, service: &Service, subject: &str) -> bool {
        let workflow = if service.workflow.is_empty() {
            &self.create_workflow
        } else {
            &service.workflow
        };
        workflow.allows(subject) || ALWAYS_SUPPORTED.contains(&subject)
    }

    /// Applies an inbound message to `service`.
    ///
    /// On error the service is left untouched.
    pub fn route(&self, service: &mut Service, subject: &str, body: &[u8]) -> Result<Routed> {
        let mut draft = service.clone();
        let mut effects = Effects::default();

        let routed = if error_manager::is_an_error_message(subject) {
            effects.monitor = error_manager::mark_as_failed(&mut draft, subject, body)?;
            status::TO_ERROR.to_string()
        } else {
            if !self.is_supported_message(&draft, subject) {
                return Err(FsmError::MessageNotSupported(subject.to_string()));
            }
            let entry = Subject::parse(subject).ok().and_then(|parsed| {
                RouteKey::for_subject(parsed)
                    .and_then(|key| self.table.get(&key))
                    .map(|handler| (parsed, handler))
            });
            match entry {
                Some((parsed, handler)) => {
                    let inbound = Inbound {
                        subject: parsed,
                        body,
                        create_workflow: &self.create_workflow,
                        delete_workflow: &self.delete_workflow,
                    };
                    handler(&mut draft, &inbound, &mut effects)?;
                }
                None => tracing::debug!(%subject, "No handler registered, passing through"),
            }
            subject.to_string()
        };

        *service = draft;
        Ok(Routed {
            subject: routed,
            effects,
        })
    }
}

/// Overlays the top-level keys of a JSON body onto the service.
///
/// Returns true if the body carried a non-empty workflow.
fn overlay(service: &mut Service, body: &[u8]) -> Result<bool> {
    let mut patch: Map<String, Value> = serde_json::from_slice(body)?;
    patch.retain(|_, value| !value.is_null());

    let supplied_workflow = patch
        .get("workflow")
        .and_then(|w| w.get("arcs"))
        .and_then(Value::as_array)
        .is_some_and(|arcs| !arcs.is_empty());

    let mut document = match serde_json::to_value(&*service)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    document.extend(patch);

    let id = service.id.clone();
    *service = serde_json::from_value(Value::Object(document))?;
    if !id.is_empty() {
        service.id = id;
    }
    Ok(supplied_workflow)
}

fn service_create(service: &mut Service, inbound: &Inbound<'_>, effects: &mut Effects) -> Result<()> {
    overlay(service, inbound.body)?;
    if service.workflow.is_empty() {
        service.workflow = inbound.create_workflow.clone();
    }
    service.started_at = Some(Utc::now());
    service.finished_at = None;

    effects.status_update = Some(status::IN_PROGRESS);
    effects
        .monitor
        .push(MonitorMessage::info("Starting environment creation"));
    Ok(())
}

fn service_delete(service: &mut Service, inbound: &Inbound<'_>, effects: &mut Effects) -> Result<()> {
    if !overlay(service, inbound.body)? {
        service.workflow = inbound.delete_workflow.clone();
    }
    service.status = status::CREATED.to_string();
    service.started_at = Some(Utc::now());
    service.finished_at = None;

    effects.status_update = Some(status::IN_PROGRESS);
    effects
        .monitor
        .push(MonitorMessage::info("Starting environment deletion"));
    Ok(())
}

fn service_patch(service: &mut Service, inbound: &Inbound<'_>, _effects: &mut Effects) -> Result<()> {
    overlay(service, inbound.body)?;
    service.status.clear();
    Ok(())
}

/// Decodes the report for a `<type>.<verb>.done` subject and folds it in.
fn fold_report(service: &mut Service, inbound: &Inbound<'_>) -> Result<(ResourceType, Stage)> {
    let Subject::Result(resource, verb, _) = inbound.subject else {
        return Err(FsmError::MalformedSubject(inbound.subject.to_string()));
    };
    let stage = verb
        .stage()
        .ok_or_else(|| FsmError::MalformedSubject(inbound.subject.to_string()))?;

    let report = GenericComponentReport::from_slice(inbound.body)?;
    let resource = service.effective_resource(resource);
    reconcile(service, resource, stage, &report)?;
    service.resources.entry(resource).collection.finished = true;

    Ok((resource, stage))
}

fn done_line(resource: ResourceType, stage: Stage) -> String {
    match (resource, stage) {
        (ResourceType::Bootstraps, Stage::Create) => "Bootstrapping finished".to_string(),
        (ResourceType::Executions, Stage::Create) => "Executions ran".to_string(),
        _ => format!("{}s {}", resource.label(), stage.past()),
    }
}

fn component_result(
    service: &mut Service,
    inbound: &Inbound<'_>,
    effects: &mut Effects,
) -> Result<()> {
    let (resource, stage) = fold_report(service, inbound)?;
    effects
        .monitor
        .push(MonitorMessage::info(done_line(resource, stage)));
    Ok(())
}

/// Routers are the service's public entry point: the first built router's
/// IP becomes the endpoint.
fn routers_created(
    service: &mut Service,
    inbound: &Inbound<'_>,
    effects: &mut Effects,
) -> Result<()> {
    let (resource, stage) = fold_report(service, inbound)?;

    let ips: Vec<String> = service
        .collection(ResourceType::Routers)
        .map(|routers| {
            routers
                .items
                .iter()
                .filter(|r| r.is_completed())
                .filter_map(|r| r.decode::<Router>().ok())
                .map(|router| router.ip)
                .filter(|ip| !ip.is_empty())
                .collect()
        })
        .unwrap_or_default();

    if let Some(ip) = ips.first() {
        service.endpoint = ip.clone();
    }
    effects
        .monitor
        .extend(ips.into_iter().map(|ip| MonitorMessage::plain(format!("\t{ip}"))));
    effects
        .monitor
        .push(MonitorMessage::info(done_line(resource, stage)));
    Ok(())
}

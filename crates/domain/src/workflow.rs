//! Workflow graph.
//!
//! A workflow is an ordered list of arcs `(from, event) -> to` over status
//! names. It is pure data: the first matching arc wins, and nothing checks
//! that every status is reachable.
//!
//! Built-in create workflow:
//! ```text
//! created ─service.create|import─► started ─routers.create─► creating_routers ─done─► routers_created
//!   ─networks.create─► … ─nats.create.done─► nats_created
//!   ─executions.create─► bootstrapping ─done─► bootstrapped
//!   ─executions.create─► running_executions ─done─► executions_ran
//!   ─service.create.done─► done
//!
//! pre-failed ─to_error─► failed ─service.create.error─► errored
//! ```

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Well-known status and event names.
pub mod status {
    /// Status a fresh service starts from. An empty status reads as this.
    pub const CREATED: &str = "created";
    /// Status forced by the error manager after a provider failure.
    pub const PRE_FAILED: &str = "pre-failed";
    /// Event routed after a provider failure.
    pub const TO_ERROR: &str = "to_error";
    /// Executions dispatched while in this status are bootstraps.
    pub const BOOTSTRAPPING: &str = "bootstrapping";
    /// Status reported to the status tracker while a build runs.
    pub const IN_PROGRESS: &str = "in_progress";
    /// Terminal status reported on `*.done`.
    pub const DONE: &str = "done";
    /// Terminal status reported on `*.error`.
    pub const ERRORED: &str = "errored";
}

/// One arc of the workflow graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub event: String,
}

impl Transition {
    /// Creates an arc leaving `from` on `event` and arriving at `to`.
    pub fn new(from: impl Into<String>, to: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            event: event.into(),
        }
    }
}

/// The graph of legal status progressions for one service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default)]
    pub arcs: Vec<Transition>,
}

const CREATE_ARCS: &[(&str, &str, &str)] = &[
    ("created", "service.create", "started"),
    ("created", "service.import", "started"),
    ("started", "routers.create", "creating_routers"),
    ("creating_routers", "routers.create.done", "routers_created"),
    ("routers_created", "networks.create", "creating_networks"),
    ("creating_networks", "networks.create.done", "networks_created"),
    ("networks_created", "instances.create", "creating_instances"),
    ("creating_instances", "instances.create.done", "instances_created"),
    ("instances_created", "firewalls.create", "creating_firewalls"),
    ("creating_firewalls", "firewalls.create.done", "firewalls_created"),
    ("firewalls_created", "nats.create", "creating_nats"),
    ("creating_nats", "nats.create.done", "nats_created"),
    ("nats_created", "executions.create", "bootstrapping"),
    ("bootstrapping", "executions.create.done", "bootstrapped"),
    ("bootstrapped", "executions.create", "running_executions"),
    ("running_executions", "executions.create.done", "executions_ran"),
    ("executions_ran", "service.create.done", "done"),
    ("pre-failed", "to_error", "failed"),
    ("failed", "service.create.error", "errored"),
];

const DELETE_ARCS: &[(&str, &str, &str)] = &[
    ("created", "service.delete", "deleting"),
    ("deleting", "nats.delete", "deleting_nats"),
    ("deleting_nats", "nats.delete.done", "nats_deleted"),
    ("nats_deleted", "firewalls.delete", "deleting_firewalls"),
    ("deleting_firewalls", "firewalls.delete.done", "firewalls_deleted"),
    ("firewalls_deleted", "instances.delete", "deleting_instances"),
    ("deleting_instances", "instances.delete.done", "instances_deleted"),
    ("instances_deleted", "networks.delete", "deleting_networks"),
    ("deleting_networks", "networks.delete.done", "networks_deleted"),
    ("networks_deleted", "routers.delete", "deleting_routers"),
    ("deleting_routers", "routers.delete.done", "routers_deleted"),
    ("routers_deleted", "service.delete.done", "deleted"),
    ("pre-failed", "to_error", "failed"),
    ("failed", "service.delete.error", "errored"),
];

impl Workflow {
    /// Creates a workflow from a list of arcs.
    pub fn new(arcs: Vec<Transition>) -> Self {
        Self { arcs }
    }

    /// Parses a workflow definition (`{"arcs": [...]}`) from JSON.
    pub fn from_json(json: &str) -> Result<Self, DomainError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The built-in environment creation workflow.
    pub fn default_create() -> Self {
        Self::from_table(CREATE_ARCS)
    }

    /// The built-in environment deletion workflow.
    pub fn default_delete() -> Self {
        Self::from_table(DELETE_ARCS)
    }

    fn from_table(table: &[(&str, &str, &str)]) -> Self {
        Self::new(
            table
                .iter()
                .map(|(from, event, to)| Transition::new(*from, *to, *event))
                .collect(),
        )
    }

    /// Returns true if the workflow has no arcs.
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// Returns the first arc leaving `status` on `event`.
    pub fn next_arc(&self, status: &str, event: &str) -> Result<&Transition, DomainError> {
        self.arcs
            .iter()
            .find(|arc| arc.from == status && arc.event == event)
            .ok_or_else(|| DomainError::NoMatchingTransition {
                status: status.to_string(),
                event: event.to_string(),
            })
    }

    /// Returns the event of the first arc leaving `status`.
    pub fn next_event(&self, status: &str) -> Result<&str, DomainError> {
        self.arcs
            .iter()
            .find(|arc| arc.from == status)
            .map(|arc| arc.event.as_str())
            .ok_or_else(|| DomainError::NoEventDefined {
                status: status.to_string(),
            })
    }

    /// Returns every event name, in arc order.
    pub fn transitions(&self) -> Vec<&str> {
        self.arcs.iter().map(|arc| arc.event.as_str()).collect()
    }

    /// Returns true if some arc fires on `event`.
    pub fn allows(&self, event: &str) -> bool {
        self.arcs.iter().any(|arc| arc.event == event)
    }

    /// Returns true if some arc arrives at `status`.
    pub fn valid_status(&self, status: &str) -> bool {
        self.arcs.iter().any(|arc| arc.to == status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Workflow {
        Workflow::new(vec![
            Transition::new("created", "in_progress", "start"),
            Transition::new("in_progress", "uat", "to_in_progress"),
            Transition::new("uat", "done", "to_done"),
        ])
    }

    #[test]
    fn next_arc_matches_status_and_event() {
        let wf = sample();
        let arc = wf.next_arc("created", "start").unwrap();
        assert_eq!(arc.to, "in_progress");
    }

    #[test]
    fn next_arc_requires_matching_status() {
        let wf = sample();
        let err = wf.next_arc("created", "to_done").unwrap_err();
        assert!(matches!(err, DomainError::NoMatchingTransition { .. }));
    }

    #[test]
    fn next_arc_picks_first_match() {
        let wf = Workflow::new(vec![
            Transition::new("a", "b", "go"),
            Transition::new("a", "c", "go"),
        ]);
        assert_eq!(wf.next_arc("a", "go").unwrap().to, "b");
    }

    #[test]
    fn next_event_on_terminal_status_fails() {
        let wf = sample();
        assert_eq!(wf.next_event("in_progress").unwrap(), "to_in_progress");
        assert!(matches!(
            wf.next_event("done"),
            Err(DomainError::NoEventDefined { .. })
        ));
    }

    #[test]
    fn transitions_lists_events_in_order() {
        assert_eq!(
            sample().transitions(),
            vec!["start", "to_in_progress", "to_done"]
        );
    }

    #[test]
    fn valid_status_checks_arc_targets() {
        let wf = sample();
        assert!(wf.valid_status("uat"));
        assert!(!wf.valid_status("created"));
    }

    #[test]
    fn from_json_parses_arcs() {
        let wf = Workflow::from_json(
            r#"{"arcs":[{"from":"created","to":"started","event":"service.create"}]}"#,
        )
        .unwrap();
        assert_eq!(wf.arcs.len(), 1);
        assert!(wf.allows("service.create"));
    }

    #[test]
    fn from_json_rejects_garbage() {
        assert!(matches!(
            Workflow::from_json("not json"),
            Err(DomainError::Serialization(_))
        ));
    }

    #[test]
    fn default_create_walks_to_done() {
        let wf = Workflow::default_create();
        let mut status = status::CREATED.to_string();
        let mut steps = 0;
        while let Ok(event) = wf.next_event(&status) {
            status = wf.next_arc(&status, event).unwrap().to.clone();
            steps += 1;
            assert!(steps < 50, "workflow loops");
        }
        assert_eq!(status, status::DONE);
    }

    #[test]
    fn default_workflows_route_errors() {
        for wf in [Workflow::default_create(), Workflow::default_delete()] {
            let arc = wf.next_arc(status::PRE_FAILED, status::TO_ERROR).unwrap();
            assert_eq!(arc.to, "failed");
            let terminal = wf.next_event("failed").unwrap();
            assert!(terminal.ends_with(".error"));
        }
    }

    #[test]
    fn default_delete_starts_from_created() {
        let wf = Workflow::default_delete();
        assert_eq!(wf.next_arc("created", "service.delete").unwrap().to, "deleting");
        assert!(wf.allows("service.delete.done"));
    }

    #[test]
    fn default_create_accepts_imports() {
        let wf = Workflow::default_create();
        assert_eq!(wf.next_arc("created", "service.import").unwrap().to, "started");
        assert_eq!(wf.next_event("created").unwrap(), "service.create");
    }
}

//! Workflow driver.
//!
//! Moves a service along its embedded workflow and picks the next event to
//! emit. All three operations are all-or-nothing: a failed move leaves the
//! service exactly as it was.

use domain::Service;

use crate::error::Result;

/// Fires `event` from the service's current status.
///
/// An empty status is evaluated as `created`.
pub fn advance(service: &mut Service, event: &str) -> Result<()> {
    let arc = service
        .workflow
        .next_arc(service.effective_status(), event)?;
    let to = arc.to.clone();
    tracing::debug!(id = %service.id, from = %service.effective_status(), %event, %to, "Moving service");
    service.status = to;
    Ok(())
}

/// Returns the event that can fire from the current status, or `None` if the
/// status is terminal.
pub fn next(service: &Service) -> Option<String> {
    match service.workflow.next_event(service.effective_status()) {
        Ok(event) => Some(event.to_string()),
        Err(e) => {
            tracing::debug!(id = %service.id, error = %e, "No next event");
            None
        }
    }
}

/// Fires `event` and returns the next event to emit.
pub fn manage(service: &mut Service, event: &str) -> Result<Option<String>> {
    advance(service, event)?;
    Ok(next(service))
}

//! The inbound message loop.

use fsm::monitor::MONITOR_SUBJECT;
use fsm::{Coordinator, Monitor, STATUS_SUBJECT, Transport};
use futures_util::{Stream, StreamExt};
use service_store::ServiceStore;

/// Returns true for subjects the FSM itself emits and must not consume.
pub fn is_own_traffic(subject: &str) -> bool {
    subject == MONITOR_SUBJECT || subject == STATUS_SUBJECT || subject.starts_with("_INBOX.")
}

/// Handles messages one at a time until the stream ends.
///
/// Handling errors are logged by the coordinator and never stop the loop.
/// Returns the number of messages handed to the coordinator.
pub async fn run<St, S, T, M>(mut messages: St, coordinator: Coordinator<S, T, M>) -> usize
where
    St: Stream<Item = (String, Vec<u8>)> + Unpin,
    S: ServiceStore,
    T: Transport,
    M: Monitor,
{
    let mut handled = 0;
    while let Some((subject, payload)) = messages.next().await {
        if is_own_traffic(&subject) {
            continue;
        }
        handled += 1;
        if let Err(e) = coordinator.handle(&subject, &payload).await {
            tracing::debug!(%subject, error = %e, protocol = e.is_protocol_error(), "Skipped message");
        }
    }
    tracing::info!(handled, "Inbound stream closed");
    handled
}

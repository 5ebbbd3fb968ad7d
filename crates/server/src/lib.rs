//! Process surface of the provisioning FSM.
//!
//! Wires the FSM coordinator to NATS and exposes a small HTTP surface for
//! operations: health, Prometheus metrics and read access to stored
//! services.

pub mod config;
pub mod consumer;
pub mod error;
pub mod nats;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use domain::Workflow;
use metrics_exporter_prometheus::PrometheusHandle;
use service_store::ServiceStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use error::ServerError;
use routes::services::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: ServiceStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/services/{id}", get(routes::services::get::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Loads the workflow attached to new services from a JSON file.
pub async fn load_workflow(path: &std::path::Path) -> Result<Workflow, ServerError> {
    let json = tokio::fs::read_to_string(path).await?;
    let workflow = Workflow::from_json(&json)?;
    tracing::info!(path = %path.display(), arcs = workflow.arcs.len(), "Loaded workflow");
    Ok(workflow)
}

/// Registers descriptions for the metrics the FSM records.
pub fn describe_metrics() {
    metrics::describe_counter!("fsm_messages_received_total", "Inbound messages by subject");
    metrics::describe_counter!(
        "fsm_messages_rejected_total",
        "Inbound messages dropped without a state change"
    );
    metrics::describe_counter!("fsm_messages_published_total", "Outbound messages by subject");
    metrics::describe_counter!(
        "fsm_provider_errors_total",
        "Worker failure reports by resource type"
    );
    metrics::describe_histogram!(
        "fsm_message_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent handling one inbound message"
    );
    metrics::describe_histogram!(
        "service_store_write_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent writing one service document to PostgreSQL"
    );
}

//! FSM server entry point.

use std::sync::Arc;

use domain::Workflow;
use fsm::{Coordinator, MessageRouter, TransportMonitor};
use server::config::{Config, LogFormat};
use server::nats::{self, NatsTransport};
use server::routes::services::AppState;
use service_store::{InMemoryServiceStore, PostgresServiceStore, ServiceStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn open_store(config: &Config) -> Arc<dyn ServiceStore> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresServiceStore::connect(url)
                .await
                .expect("failed to connect to PostgreSQL");
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL service store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, services are kept in memory");
            Arc::new(InMemoryServiceStore::new())
        }
    }
}

#[tokio::main]
async fn main() {
    // 1. Configuration and tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");
    server::describe_metrics();

    // 3. Storage and workflow
    let store = open_store(&config).await;
    let create_workflow = match &config.workflow_path {
        Some(path) => server::load_workflow(path)
            .await
            .expect("failed to load workflow"),
        None => Workflow::default_create(),
    };

    // 4. Bus
    let client = nats::connect(&config.nats_url)
        .await
        .expect("failed to connect to NATS");
    let messages = nats::inbound(&client)
        .await
        .expect("failed to subscribe");
    let transport = NatsTransport::new(client);

    let coordinator = Coordinator::new(
        store.clone(),
        transport.clone(),
        TransportMonitor::new(transport),
    )
    .with_router(MessageRouter::with_workflows(
        create_workflow,
        Workflow::default_delete(),
    ))
    .with_request_timeout(config.request_timeout);

    let consumer = tokio::spawn(server::consumer::run(messages, coordinator));

    // 5. HTTP surface
    let app = server::create_app(Arc::new(AppState::new(store)), metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, nats = %config.nats_url, "starting FSM server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    consumer.abort();
    tracing::info!("server shut down gracefully");
}

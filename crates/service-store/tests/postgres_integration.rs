//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p service-store --test postgres_integration
//! ```

use std::sync::Arc;

use serial_test::serial;
use service_store::{PostgresServiceStore, ServiceId, ServiceStore, ServiceStoreExt};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_services_table.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and an empty table
async fn get_test_store() -> PostgresServiceStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE fsm_services")
        .execute(&pool)
        .await
        .unwrap();

    PostgresServiceStore::new(pool)
}

#[tokio::test]
#[serial]
async fn set_and_get_document() {
    let store = get_test_store().await;
    let id = ServiceId::generate();

    store
        .set(&id, br#"{"status":"created"}"#.to_vec())
        .await
        .unwrap();

    let body = store.get(&id).await.unwrap().unwrap();
    assert_eq!(body, br#"{"status":"created"}"#);
}

#[tokio::test]
#[serial]
async fn get_missing_returns_none() {
    let store = get_test_store().await;
    assert!(store.get(&ServiceId::generate()).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn set_upserts_existing_row() {
    let store = get_test_store().await;
    let id = ServiceId::generate();

    store.set(&id, b"first".to_vec()).await.unwrap();
    store.set(&id, b"second".to_vec()).await.unwrap();

    assert_eq!(store.get(&id).await.unwrap().unwrap(), b"second");

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fsm_services")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
#[serial]
async fn keys_are_prefixed() {
    let store = get_test_store().await;
    let id = ServiceId::new("env-42");

    store.set(&id, b"doc".to_vec()).await.unwrap();

    let key: String = sqlx::query_scalar("SELECT key FROM fsm_services")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(key, "FSM_env-42");
}

#[tokio::test]
#[serial]
async fn delete_removes_row() {
    let store = get_test_store().await;
    let id = ServiceId::generate();

    store.set(&id, b"doc".to_vec()).await.unwrap();
    store.delete(&id).await.unwrap();

    assert!(!store.exists(&id).await.unwrap());
    assert!(store.delete(&id).await.is_ok());
}

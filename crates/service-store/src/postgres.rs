use async_trait::async_trait;
use sqlx::PgPool;

use crate::{Result, ServiceId, store::ServiceStore, storage_key};

/// PostgreSQL-backed service store.
///
/// Documents live in the `fsm_services` table, one row per service.
#[derive(Clone)]
pub struct PostgresServiceStore {
    pool: PgPool,
}

impl PostgresServiceStore {
    /// Creates a new PostgreSQL service store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database at `url` and returns a store.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

#[async_trait]
impl ServiceStore for PostgresServiceStore {
    #[tracing::instrument(skip(self))]
    async fn get(&self, id: &ServiceId) -> Result<Option<Vec<u8>>> {
        let key = storage_key(id)?;
        let body: Option<Vec<u8>> =
            sqlx::query_scalar("SELECT body FROM fsm_services WHERE key = $1")
                .bind(&key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(body)
    }

    #[tracing::instrument(skip(self, body), fields(bytes = body.len()))]
    async fn set(&self, id: &ServiceId, body: Vec<u8>) -> Result<()> {
        let key = storage_key(id)?;
        let start = std::time::Instant::now();

        sqlx::query(
            r#"
            INSERT INTO fsm_services (key, body, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE
            SET body = EXCLUDED.body, updated_at = NOW()
            "#,
        )
        .bind(&key)
        .bind(body)
        .execute(&self.pool)
        .await?;

        metrics::histogram!("service_store_write_duration_seconds")
            .record(start.elapsed().as_secs_f64());
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: &ServiceId) -> Result<()> {
        let key = storage_key(id)?;
        sqlx::query("DELETE FROM fsm_services WHERE key = $1")
            .bind(&key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

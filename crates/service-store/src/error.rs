use thiserror::Error;

/// Errors that can occur when interacting with the service store.
///
/// A missing service is not an error: lookups return `Ok(None)` so callers
/// can tell "not found" apart from a failing backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The service ID is empty and cannot be used as a key.
    #[error("Invalid storage key: service id is empty")]
    EmptyKey,

    /// The backend refused or failed the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for service store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

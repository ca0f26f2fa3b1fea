//! Storage-specific error type wrapping sqlx errors.

use energyhub_domain::error::EnergyHubError;

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// A stored timestamp is outside the representable range.
    #[error("invalid stored timestamp: {0}")]
    InvalidTimestamp(i64),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for EnergyHubError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}

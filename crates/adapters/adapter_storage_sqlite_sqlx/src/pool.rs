//! `SQLite` connection pool setup and migration runner.

use std::path::Path;
use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;

use crate::error::StorageError;

/// Database file name inside the storage directory.
const DATABASE_FILE: &str = "energylogs.sqlite";

/// Configuration for the `SQLite` storage adapter.
pub struct Config {
    /// `SQLite` connection URL (e.g. `sqlite:energylogs.sqlite` or
    /// `sqlite::memory:`).
    pub database_url: String,
}

impl Config {
    /// Configuration for the energy log database inside `storage_path`.
    #[must_use]
    pub fn in_storage_path(storage_path: &Path) -> Self {
        Self {
            database_url: format!(
                "sqlite:{}",
                storage_path.join(DATABASE_FILE).display()
            ),
        }
    }

    /// Build a [`Database`] from this configuration.
    ///
    /// Creates the connection pool, creates the database file if missing,
    /// and runs all pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the path is not writable, the connection
    /// fails or migrations fail. Callers fall back to degraded in-memory
    /// operation in that case.
    pub async fn build(self) -> Result<Database, StorageError> {
        Database::initialize(&self.database_url).await
    }
}

/// Holds the `SQLite` connection pool and provides access to it.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database and run migrations.
    async fn initialize(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::debug!(url = %database_url, "energy log database ready");
        Ok(Self { pool })
    }

    /// Borrow the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

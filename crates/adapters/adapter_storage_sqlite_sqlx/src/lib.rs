//! # energyhub-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the [`Archive`](energyhub_app::ports::Archive) port
//! - Manage the `SQLite` connection pool lifecycle
//! - Run database migrations (schema upgrades keyed on `metadata.version`)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `energyhub-app` (for port traits) and `energyhub-domain` (for
//! domain types). The `app` and `domain` crates must never reference this
//! adapter.

mod archive_repo;
mod error;
mod pool;

pub use archive_repo::SqliteArchive;
pub use error::StorageError;
pub use pool::{Config, Database};

//! Common error types used across the workspace.
//!
//! Each layer defines its own concrete error types. The domain layer provides
//! [`ValidationError`] and [`NotFoundError`]. Adapter layers define their own
//! (e.g., `StorageError` wrapping `sqlx::Error`) and wire them into
//! [`EnergyHubError`] via `#[from]` conversion.
//!
//! [`EnergyError`] is separate: it is the error *code* surfaced by the
//! `SetRootMeter` RPC call, not an internal failure.

use serde::{Deserialize, Serialize};

/// Validation failures raised by domain invariant checks.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("sample rate 'any' is not valid here")]
    SampleRateAny,
    #[error("unknown sample rate: {0}")]
    UnknownSampleRate(i64),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(i64),
    #[error("invalid thing id: {0}")]
    InvalidThingId(String),
}

/// Returned when a lookup by identifier finds nothing.
#[derive(Debug, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Top-level error of the energy core.
///
/// Adapter crates may introduce additional variants by wrapping their own
/// error types via `#[from]`.
#[derive(Debug, thiserror::Error)]
pub enum EnergyHubError {
    #[error("Validation error")]
    Validation(#[from] ValidationError),

    #[error("Not found")]
    NotFound(#[from] NotFoundError),

    #[error("Storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Convenience alias used throughout the domain and application layers.
pub type Result<T> = std::result::Result<T, EnergyHubError>;

/// Error codes returned by the `SetRootMeter` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnergyError {
    /// No root meter id was provided.
    #[error("no root meter thing id provided")]
    MissingParameter,
    /// The id is unknown or the thing is not tagged `energymeter`.
    #[error("thing is unknown or not an energy meter")]
    InvalidParameter,
}

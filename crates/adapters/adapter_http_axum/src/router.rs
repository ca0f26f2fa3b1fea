//! Axum router assembly.

use axum::Router;
use axum::routing::get;
use chrono::TimeZone;
use tower_http::trace::TraceLayer;

use energyhub_app::ports::{Archive, RootMeterStore, ThingRegistry};

use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Nests the energy API under `/api/energy`.
pub fn build<R, S, A, Tz>(state: AppState<R, S, A, Tz>) -> Router
where
    R: ThingRegistry + Send + Sync + 'static,
    S: RootMeterStore + Send + Sync + 'static,
    A: Archive + Send + Sync + 'static,
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync,
{
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/energy", crate::api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

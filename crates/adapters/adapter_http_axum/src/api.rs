//! JSON API handler modules.

pub mod balance;
pub mod logs;
pub mod root_meter;
pub mod sse;

use axum::Router;
use axum::routing::get;
use chrono::TimeZone;

use energyhub_app::ports::{Archive, RootMeterStore, ThingRegistry};

use crate::state::AppState;

/// Build the `/api/energy` sub-router.
pub fn routes<R, S, A, Tz>() -> Router<AppState<R, S, A, Tz>>
where
    R: ThingRegistry + Send + Sync + 'static,
    S: RootMeterStore + Send + Sync + 'static,
    A: Archive + Send + Sync + 'static,
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync,
{
    Router::new()
        .route(
            "/root-meter",
            get(root_meter::get::<R, S, A, Tz>).put(root_meter::set::<R, S, A, Tz>),
        )
        .route("/balance", get(balance::get::<R, S, A, Tz>))
        .route("/balance/logs", get(logs::balance::<R, S, A, Tz>))
        .route("/things/logs", get(logs::things::<R, S, A, Tz>))
        .route("/events/stream", get(sse::stream::<R, S, A, Tz>))
}

//! Current power balance endpoint.

use axum::Json;
use axum::extract::State;
use chrono::TimeZone;

use energyhub_app::ports::{Archive, RootMeterStore, ThingRegistry};
use energyhub_domain::balance::PowerBalance;

use crate::state::AppState;

/// `GET /api/energy/balance` — instantaneous channels and running totals.
pub async fn get<R, S, A, Tz>(State(state): State<AppState<R, S, A, Tz>>) -> Json<PowerBalance>
where
    R: ThingRegistry + Send + Sync + 'static,
    S: RootMeterStore + Send + Sync + 'static,
    A: Archive + Send + Sync + 'static,
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync,
{
    Json(state.manager.power_balance().await)
}

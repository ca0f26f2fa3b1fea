//! Root-meter designation endpoints.

use std::str::FromStr;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::TimeZone;
use serde::{Deserialize, Serialize};

use energyhub_app::ports::{Archive, RootMeterStore, ThingRegistry};
use energyhub_domain::error::EnergyError;
use energyhub_domain::id::ThingId;

use crate::state::AppState;

/// Wire representation of the `SetRootMeter` result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnergyErrorCode {
    NoError,
    MissingParameter,
    InvalidParameter,
}

impl From<EnergyError> for EnergyErrorCode {
    fn from(err: EnergyError) -> Self {
        match err {
            EnergyError::MissingParameter => Self::MissingParameter,
            EnergyError::InvalidParameter => Self::InvalidParameter,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnergyErrorBody {
    energy_error: EnergyErrorCode,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RootMeterBody {
    root_meter_thing_id: Option<ThingId>,
}

/// `GET /api/energy/root-meter`
pub async fn get<R, S, A, Tz>(State(state): State<AppState<R, S, A, Tz>>) -> Response
where
    R: ThingRegistry + Send + Sync + 'static,
    S: RootMeterStore + Send + Sync + 'static,
    A: Archive + Send + Sync + 'static,
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync,
{
    let root_meter_thing_id = state.manager.root_meter().await;
    Json(RootMeterBody {
        root_meter_thing_id,
    })
    .into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRootMeterBody {
    pub root_meter_thing_id: Option<String>,
}

/// `PUT /api/energy/root-meter`
///
/// Returns the RPC error code in the body: `noError` on success,
/// `missingParameter` when no id is given, `invalidParameter` when the id is
/// unknown, malformed or not an energy meter.
pub async fn set<R, S, A, Tz>(
    State(state): State<AppState<R, S, A, Tz>>,
    Json(body): Json<SetRootMeterBody>,
) -> Response
where
    R: ThingRegistry + Send + Sync + 'static,
    S: RootMeterStore + Send + Sync + 'static,
    A: Archive + Send + Sync + 'static,
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync,
{
    let thing_id = match body.root_meter_thing_id.as_deref() {
        None => None,
        Some(raw) => match ThingId::from_str(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                return error_response(EnergyErrorCode::InvalidParameter);
            }
        },
    };

    match state.manager.set_root_meter(thing_id).await {
        Ok(()) => Json(EnergyErrorBody {
            energy_error: EnergyErrorCode::NoError,
        })
        .into_response(),
        Err(err) => error_response(err.into()),
    }
}

fn error_response(code: EnergyErrorCode) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(EnergyErrorBody { energy_error: code }),
    )
        .into_response()
}

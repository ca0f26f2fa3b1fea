//! Archived log query endpoints.
//!
//! Wire timestamps are Unix seconds; internally the archive uses
//! milliseconds. Both range bounds are inclusive and optional.

use std::str::FromStr;

use axum::Json;
use axum::extract::{Query, State};
use chrono::TimeZone;
use serde::{Deserialize, Serialize};

use energyhub_app::ports::{Archive, RootMeterStore, ThingRegistry};
use energyhub_domain::balance::{BalanceSample, ThingSample};
use energyhub_domain::error::{EnergyHubError, ValidationError};
use energyhub_domain::id::ThingId;
use energyhub_domain::sample_rate::SampleRate;
use energyhub_domain::time::{Timestamp, from_unix_seconds, to_unix_seconds};

use crate::error::ApiError;
use crate::state::AppState;

/// One power-balance log entry on the wire.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceLogEntry {
    pub timestamp: i64,
    pub consumption: f64,
    pub production: f64,
    pub acquisition: f64,
    pub storage: f64,
    pub total_consumption: f64,
    pub total_production: f64,
    pub total_acquisition: f64,
    pub total_return: f64,
}

impl From<BalanceSample> for BalanceLogEntry {
    fn from(sample: BalanceSample) -> Self {
        Self {
            timestamp: to_unix_seconds(sample.timestamp),
            consumption: sample.consumption,
            production: sample.production,
            acquisition: sample.acquisition,
            storage: sample.storage,
            total_consumption: sample.total_consumption,
            total_production: sample.total_production,
            total_acquisition: sample.total_acquisition,
            total_return: sample.total_return,
        }
    }
}

/// One per-thing log entry on the wire.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThingLogEntry {
    pub timestamp: i64,
    pub thing_id: ThingId,
    pub current_power: f64,
    pub total_consumption: f64,
    pub total_production: f64,
}

impl From<ThingSample> for ThingLogEntry {
    fn from(sample: ThingSample) -> Self {
        Self {
            timestamp: to_unix_seconds(sample.timestamp),
            thing_id: sample.thing_id,
            current_power: sample.current_power,
            total_consumption: sample.total_consumption,
            total_production: sample.total_production,
        }
    }
}

/// Query parameters for `GetPowerBalanceLogs`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceLogsQuery {
    pub sample_rate: SampleRate,
    /// Unix seconds, inclusive. Unbounded when unset.
    pub from: Option<i64>,
    /// Unix seconds, inclusive. Unbounded when unset.
    pub to: Option<i64>,
}

/// Query parameters for `GetThingPowerLogs`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThingLogsQuery {
    pub sample_rate: SampleRate,
    /// Comma-separated thing ids; all known things when unset.
    pub thing_ids: Option<String>,
    pub from: Option<i64>,
    pub to: Option<i64>,
}

fn parse_bound(secs: Option<i64>) -> Result<Option<Timestamp>, ApiError> {
    match secs {
        None => Ok(None),
        Some(secs) => from_unix_seconds(secs).map(Some).ok_or_else(|| {
            ApiError::from(EnergyHubError::Validation(ValidationError::InvalidTimestamp(
                secs,
            )))
        }),
    }
}

fn require_concrete_rate(rate: SampleRate) -> Result<SampleRate, ApiError> {
    if rate == SampleRate::Any {
        return Err(ApiError::from(EnergyHubError::Validation(
            ValidationError::SampleRateAny,
        )));
    }
    Ok(rate)
}

/// `GET /api/energy/balance/logs?sampleRate=&from=&to=`
pub async fn balance<R, S, A, Tz>(
    State(state): State<AppState<R, S, A, Tz>>,
    Query(query): Query<BalanceLogsQuery>,
) -> Result<Json<Vec<BalanceLogEntry>>, ApiError>
where
    R: ThingRegistry + Send + Sync + 'static,
    S: RootMeterStore + Send + Sync + 'static,
    A: Archive + Send + Sync + 'static,
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync,
{
    let rate = require_concrete_rate(query.sample_rate)?;
    let from = parse_bound(query.from)?;
    let to = parse_bound(query.to)?;

    let rows = state.logger.power_balance_logs(rate, from, to).await;
    Ok(Json(rows.into_iter().map(BalanceLogEntry::from).collect()))
}

/// `GET /api/energy/things/logs?sampleRate=&thingIds=&from=&to=`
pub async fn things<R, S, A, Tz>(
    State(state): State<AppState<R, S, A, Tz>>,
    Query(query): Query<ThingLogsQuery>,
) -> Result<Json<Vec<ThingLogEntry>>, ApiError>
where
    R: ThingRegistry + Send + Sync + 'static,
    S: RootMeterStore + Send + Sync + 'static,
    A: Archive + Send + Sync + 'static,
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync,
{
    let rate = require_concrete_rate(query.sample_rate)?;
    let from = parse_bound(query.from)?;
    let to = parse_bound(query.to)?;

    let mut thing_ids = Vec::new();
    if let Some(raw) = query.thing_ids.as_deref() {
        for part in raw.split(',').filter(|part| !part.is_empty()) {
            let id = ThingId::from_str(part).map_err(|_| {
                ApiError::from(EnergyHubError::Validation(ValidationError::InvalidThingId(
                    part.to_owned(),
                )))
            })?;
            thing_ids.push(id);
        }
    }

    let rows = state
        .logger
        .thing_power_logs(rate, &thing_ids, from, to)
        .await;
    Ok(Json(rows.into_iter().map(ThingLogEntry::from).collect()))
}

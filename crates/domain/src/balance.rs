//! Power balance and archived sample rows.
//!
//! Instantaneous channels are watts (signed); cumulative totals are
//! kilowatt-hours and monotonically non-decreasing per series. Sample rows
//! are created by the sampler or the realtime log path, never mutated, and
//! removed only by retention trimming.

use serde::{Deserialize, Serialize};

use crate::id::ThingId;
use crate::live_log::Timestamped;
use crate::time::Timestamp;

/// The household power balance at an instant, plus its running totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerBalance {
    /// Household consumption in watts.
    pub consumption: f64,
    /// Summed producer output in watts.
    pub production: f64,
    /// Grid import (positive) or export (negative) in watts.
    pub acquisition: f64,
    /// Summed storage flow in watts (positive = charging).
    pub storage: f64,
    pub total_consumption: f64,
    pub total_production: f64,
    pub total_acquisition: f64,
    pub total_return: f64,
}

/// One archived (or live) row of the household power balance series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSample {
    pub timestamp: Timestamp,
    pub consumption: f64,
    pub production: f64,
    pub acquisition: f64,
    pub storage: f64,
    pub total_consumption: f64,
    pub total_production: f64,
    pub total_acquisition: f64,
    pub total_return: f64,
}

impl BalanceSample {
    /// Build a sample at `timestamp` from the aggregator's current balance.
    #[must_use]
    pub fn from_balance(timestamp: Timestamp, balance: &PowerBalance) -> Self {
        Self {
            timestamp,
            consumption: balance.consumption,
            production: balance.production,
            acquisition: balance.acquisition,
            storage: balance.storage,
            total_consumption: balance.total_consumption,
            total_production: balance.total_production,
            total_acquisition: balance.total_acquisition,
            total_return: balance.total_return,
        }
    }

    /// A zero-power gap-fill row carrying `previous`'s cumulative totals.
    #[must_use]
    pub fn zeroed_at(timestamp: Timestamp, previous: &Self) -> Self {
        Self {
            timestamp,
            consumption: 0.0,
            production: 0.0,
            acquisition: 0.0,
            storage: 0.0,
            total_consumption: previous.total_consumption,
            total_production: previous.total_production,
            total_acquisition: previous.total_acquisition,
            total_return: previous.total_return,
        }
    }
}

impl Timestamped for BalanceSample {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// One archived (or live) row of a per-thing power series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThingSample {
    pub timestamp: Timestamp,
    pub thing_id: ThingId,
    /// Power reading in watts, signed.
    pub current_power: f64,
    pub total_consumption: f64,
    pub total_production: f64,
}

impl ThingSample {
    /// A zero-power gap-fill row carrying `previous`'s cumulative totals.
    #[must_use]
    pub fn zeroed_at(timestamp: Timestamp, previous: &Self) -> Self {
        Self {
            timestamp,
            thing_id: previous.thing_id,
            current_power: 0.0,
            total_consumption: previous.total_consumption,
            total_production: previous.total_production,
        }
    }

    /// An all-zero row for a series with no history at all.
    #[must_use]
    pub fn empty(timestamp: Timestamp, thing_id: ThingId) -> Self {
        Self {
            timestamp,
            thing_id,
            current_power: 0.0,
            total_consumption: 0.0,
            total_production: 0.0,
        }
    }
}

impl Timestamped for ThingSample {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

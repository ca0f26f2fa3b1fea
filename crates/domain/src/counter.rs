//! Drift/reset tolerant tracking of cumulative device counters.
//!
//! Devices report raw, lifetime kWh counters that may jump backwards when a
//! device is factory-reset or replaced. [`EnergyCounter`] converts those raw
//! readings into an internal total that never decreases: the first non-zero
//! observation and any backwards jump resynchronise the raw baseline without
//! accounting, everything else accumulates the forward difference.

use serde::{Deserialize, Serialize};

/// Tracks one raw device counter and the monotonic internal total derived
/// from it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyCounter {
    last_raw: f64,
    internal: f64,
}

impl EnergyCounter {
    /// A fresh counter that will adopt the first non-zero raw value it sees.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a counter from persisted state.
    ///
    /// `last_raw` comes from the thing cache, `internal` from the newest
    /// archived sample of the series.
    #[must_use]
    pub fn restore(last_raw: f64, internal: f64) -> Self {
        Self { last_raw, internal }
    }

    /// Feed a new raw reading, returning the (non-negative) delta that was
    /// accounted to the internal total.
    pub fn update(&mut self, new_raw: f64) -> f64 {
        if self.last_raw == 0.0 && new_raw != 0.0 {
            // First observation since boot: adopt without accounting.
            self.last_raw = new_raw;
        }
        if new_raw < self.last_raw {
            // Device counter reset: resync without accounting.
            self.last_raw = new_raw;
        }
        let diff = new_raw - self.last_raw;
        self.internal += diff;
        self.last_raw = new_raw;
        diff
    }

    /// The monotonic internal total in kWh.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.internal
    }

    /// The last raw device value observed.
    #[must_use]
    pub fn last_raw(&self) -> f64 {
        self.last_raw
    }
}

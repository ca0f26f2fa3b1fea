//! Events — notifications emitted by the energy core.
//!
//! Events are pure data: no back-pointers into live objects. Log-entry
//! events fire once per committed row; subscribers that lag are not
//! replayed.

use serde::{Deserialize, Serialize};

use crate::balance::{BalanceSample, PowerBalance, ThingSample};
use crate::id::ThingId;
use crate::sample_rate::SampleRate;

/// A notification emitted by the energy core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EnergyEvent {
    /// The designated root meter changed (or was cleared).
    #[serde(rename_all = "camelCase")]
    RootMeterChanged { root_meter_thing_id: Option<ThingId> },

    /// An instantaneous channel of the household balance changed.
    #[serde(rename_all = "camelCase")]
    PowerBalanceChanged { balance: PowerBalance },

    /// A balance row was durably committed to the archive.
    #[serde(rename_all = "camelCase")]
    PowerBalanceLogEntryAdded {
        sample_rate: SampleRate,
        entry: BalanceSample,
    },

    /// A per-thing row was durably committed to the archive.
    #[serde(rename_all = "camelCase")]
    ThingPowerLogEntryAdded {
        sample_rate: SampleRate,
        entry: ThingSample,
    },
}

impl EnergyEvent {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RootMeterChanged { .. } => "rootMeterChanged",
            Self::PowerBalanceChanged { .. } => "powerBalanceChanged",
            Self::PowerBalanceLogEntryAdded { .. } => "powerBalanceLogEntryAdded",
            Self::ThingPowerLogEntryAdded { .. } => "thingPowerLogEntryAdded",
        }
    }
}

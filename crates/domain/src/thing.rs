//! Things — metered devices observed by the energy core.
//!
//! The core does not own devices; it observes the registry's capability tags
//! and reads three numeric states per thing. Everything else about a device
//! (discovery, configuration, control) lives outside the core.

use serde::{Deserialize, Serialize};

use crate::id::ThingId;

/// Capability tags relevant to energy accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThingCapability {
    /// The grid interface meter.
    EnergyMeter,
    /// A producer such as a solar inverter.
    SmartMeterProducer,
    /// A metered consumer.
    SmartMeterConsumer,
    /// A battery.
    EnergyStorage,
}

impl ThingCapability {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EnergyMeter => "energymeter",
            Self::SmartMeterProducer => "smartmeterproducer",
            Self::SmartMeterConsumer => "smartmeterconsumer",
            Self::EnergyStorage => "energystorage",
        }
    }
}

/// A device as seen through the registry port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThingInfo {
    pub id: ThingId,
    pub name: String,
    pub capabilities: Vec<ThingCapability>,
}

impl ThingInfo {
    #[must_use]
    pub fn has_capability(&self, capability: ThingCapability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Whether a state change of this thing must trigger a balance recompute.
    #[must_use]
    pub fn affects_balance(&self) -> bool {
        self.has_capability(ThingCapability::EnergyMeter)
            || self.has_capability(ThingCapability::SmartMeterProducer)
            || self.has_capability(ThingCapability::EnergyStorage)
    }

    /// Whether this thing's power readings are logged per-thing.
    #[must_use]
    pub fn is_logged(&self) -> bool {
        self.affects_balance() || self.has_capability(ThingCapability::SmartMeterConsumer)
    }
}

/// The three numeric states the core reads from a thing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThingReading {
    /// Watts, signed (storage: positive = charging).
    pub current_power: f64,
    /// Kilowatt-hours, monotonic except on device reset.
    pub total_energy_consumed: f64,
    /// Kilowatt-hours, monotonic except on device reset.
    pub total_energy_produced: f64,
}

//! A deterministic simulated household feeding the energy core.

use tokio::sync::mpsc;

use energyhub_app::ports::ThingEvent;
use energyhub_domain::id::ThingId;
use energyhub_domain::thing::{ThingCapability, ThingInfo, ThingReading};

use crate::registry::VirtualRegistry;

/// Household base load in watts.
const BASE_LOAD_W: f64 = 450.0;
/// Peak solar production in watts.
const SOLAR_PEAK_W: f64 = 3_000.0;
/// Length of one simulated production ramp in steps.
const SOLAR_CYCLE_STEPS: u64 = 240;
/// Battery charge/discharge limit in watts.
const BATTERY_LIMIT_W: f64 = 1_500.0;

/// Simulated grid meter, solar inverter and battery.
///
/// The simulation is deliberately deterministic (a triangular production
/// ramp instead of randomness) so demo runs and tests are reproducible.
pub struct SimulatedHome {
    registry: VirtualRegistry,
    meter: ThingInfo,
    inverter: ThingInfo,
    battery: ThingInfo,
    step: u64,
    meter_import_kwh: f64,
    meter_export_kwh: f64,
    solar_kwh: f64,
    battery_out_kwh: f64,
    battery_in_kwh: f64,
}

impl SimulatedHome {
    /// Create the simulated things inside `registry`.
    #[must_use]
    pub fn new(registry: VirtualRegistry) -> Self {
        let meter = ThingInfo {
            id: ThingId::new(),
            name: "Grid Meter".to_string(),
            capabilities: vec![ThingCapability::EnergyMeter],
        };
        let inverter = ThingInfo {
            id: ThingId::new(),
            name: "Solar Inverter".to_string(),
            capabilities: vec![ThingCapability::SmartMeterProducer],
        };
        let battery = ThingInfo {
            id: ThingId::new(),
            name: "Home Battery".to_string(),
            capabilities: vec![ThingCapability::EnergyStorage],
        };

        registry.upsert_thing(meter.clone());
        registry.upsert_thing(inverter.clone());
        registry.upsert_thing(battery.clone());

        Self {
            registry,
            meter,
            inverter,
            battery,
            step: 0,
            meter_import_kwh: 0.0,
            meter_export_kwh: 0.0,
            solar_kwh: 0.0,
            battery_out_kwh: 0.0,
            battery_in_kwh: 0.0,
        }
    }

    /// Announce the simulated things to the core.
    pub async fn announce(&self, events: &mpsc::Sender<ThingEvent>) {
        for info in [&self.meter, &self.inverter, &self.battery] {
            let _ = events.send(ThingEvent::Added(info.clone())).await;
        }
    }

    /// Advance the simulation by `dt_secs` seconds and emit state changes.
    pub async fn advance(&mut self, dt_secs: f64, events: &mpsc::Sender<ThingEvent>) {
        self.step += 1;

        // Triangular production ramp: up for half a cycle, down for the rest.
        let phase = self.step % SOLAR_CYCLE_STEPS;
        let half = SOLAR_CYCLE_STEPS / 2;
        let solar_w = if phase < half {
            SOLAR_PEAK_W * phase as f64 / half as f64
        } else {
            SOLAR_PEAK_W * (SOLAR_CYCLE_STEPS - phase) as f64 / half as f64
        };

        // The battery absorbs surplus production up to its limit and covers
        // deficit the same way; whatever remains flows through the meter.
        let surplus_w = solar_w - BASE_LOAD_W;
        let battery_w = surplus_w.clamp(-BATTERY_LIMIT_W, BATTERY_LIMIT_W);
        let grid_w = BASE_LOAD_W + battery_w - solar_w;

        let hours = dt_secs / 3600.0;
        if grid_w >= 0.0 {
            self.meter_import_kwh += grid_w * hours / 1000.0;
        } else {
            self.meter_export_kwh += -grid_w * hours / 1000.0;
        }
        self.solar_kwh += solar_w * hours / 1000.0;
        if battery_w >= 0.0 {
            self.battery_in_kwh += battery_w * hours / 1000.0;
        } else {
            self.battery_out_kwh += -battery_w * hours / 1000.0;
        }

        let updates = [
            (
                self.meter.id,
                ThingReading {
                    current_power: grid_w,
                    total_energy_consumed: self.meter_import_kwh,
                    total_energy_produced: self.meter_export_kwh,
                },
            ),
            (
                self.inverter.id,
                ThingReading {
                    current_power: solar_w,
                    total_energy_consumed: 0.0,
                    total_energy_produced: self.solar_kwh,
                },
            ),
            (
                self.battery.id,
                ThingReading {
                    current_power: battery_w,
                    total_energy_consumed: self.battery_in_kwh,
                    total_energy_produced: self.battery_out_kwh,
                },
            ),
        ];

        for (thing_id, reading) in updates {
            self.registry.set_reading(thing_id, reading);
            let _ = events
                .send(ThingEvent::StateChanged { thing_id, reading })
                .await;
        }

        tracing::trace!(
            step = self.step,
            grid = grid_w,
            solar = solar_w,
            battery = battery_w,
            "simulated household advanced"
        );
    }
}

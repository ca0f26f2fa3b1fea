//! Energy manager — balance aggregation and root-meter lifecycle.
//!
//! Subscribes (via the composition root) to state changes of things tagged
//! `energymeter`, `smartmeterproducer` or `energystorage` and derives the
//! household power balance from the registry's current readings. Changes are
//! coalesced outside this service: callers debounce bursts of state changes
//! and invoke [`EnergyManager::update_power_balance`] once per burst.
//!
//! The manager keeps its own pair of [`EnergyCounter`] caches, strictly
//! separate from the per-thing caches inside the logger: balance-level and
//! per-thing logging run on different timelines and sharing counters would
//! corrupt one side's diffs.

use std::collections::HashMap;

use tokio::sync::Mutex;

use energyhub_domain::balance::{BalanceSample, PowerBalance};
use energyhub_domain::counter::EnergyCounter;
use energyhub_domain::error::EnergyError;
use energyhub_domain::event::EnergyEvent;
use energyhub_domain::id::ThingId;
use energyhub_domain::thing::{ThingCapability, ThingInfo};

use crate::ports::{EventPublisher, RootMeterStore, ThingRegistry};

#[derive(Default)]
struct ManagerState {
    root_meter: Option<ThingId>,
    balance: PowerBalance,
    total_from_storage: f64,
    /// Balance-view trackers of `totalEnergyConsumed` per thing.
    consumed_cache: HashMap<ThingId, EnergyCounter>,
    /// Balance-view trackers of `totalEnergyProduced` per thing.
    produced_cache: HashMap<ThingId, EnergyCounter>,
}

/// Application service deriving household-level instantaneous and cumulative
/// values from device readings.
pub struct EnergyManager<R, S, P> {
    registry: R,
    store: S,
    publisher: P,
    state: Mutex<ManagerState>,
}

impl<R, S, P> EnergyManager<R, S, P>
where
    R: ThingRegistry,
    S: RootMeterStore,
    P: EventPublisher,
{
    /// Create a new manager backed by the given ports.
    pub fn new(registry: R, store: S, publisher: P) -> Self {
        Self {
            registry,
            store,
            publisher,
            state: Mutex::new(ManagerState::default()),
        }
    }

    /// Restore state after a restart and start watching the registry.
    ///
    /// `latest` is the newest archived balance row at any rate; its totals
    /// carry the cumulative counters across the restart. The persisted
    /// root-meter id is re-validated against the registry, and every already
    /// known thing is watched (adopting its current raw counters without
    /// accounting).
    pub async fn startup(&self, latest: Option<&BalanceSample>) {
        if let Some(latest) = latest {
            let mut state = self.state.lock().await;
            state.balance.total_consumption = latest.total_consumption;
            state.balance.total_production = latest.total_production;
            state.balance.total_acquisition = latest.total_acquisition;
            state.balance.total_return = latest.total_return;
            state.total_from_storage = latest.total_consumption
                - latest.total_acquisition
                - latest.total_production
                + latest.total_return;
            tracing::debug!(
                consumption = state.balance.total_consumption,
                production = state.balance.total_production,
                acquisition = state.balance.total_acquisition,
                r#return = state.balance.total_return,
                "restored power balance totals"
            );
        }

        match self.store.load().await {
            Ok(Some(id)) => {
                if let Err(err) = self.set_root_meter(Some(id)).await {
                    tracing::warn!(thing = %id, %err, "persisted root meter is not usable");
                }
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(%err, "failed to load persisted root meter"),
        }

        for info in self.registry.things().await {
            self.watch_thing(&info).await;
        }
    }

    /// Begin observing a thing.
    ///
    /// The first `energymeter` that appears is auto-adopted as root meter if
    /// none is set; it may be changed through the RPC surface later. The
    /// thing's current raw counters are adopted into the balance caches
    /// without accounting.
    pub async fn watch_thing(&self, info: &ThingInfo) {
        if info.has_capability(ThingCapability::EnergyMeter)
            && self.root_meter().await.is_none()
        {
            if let Err(err) = self.set_root_meter(Some(info.id)).await {
                tracing::warn!(thing = %info.id, %err, "failed to auto-adopt root meter");
            }
        }

        if !info.affects_balance() {
            return;
        }

        tracing::debug!(thing = %info.id, name = %info.name, "watching thing");
        if let Some(reading) = self.registry.reading(info.id).await {
            let mut state = self.state.lock().await;
            state
                .consumed_cache
                .entry(info.id)
                .or_default()
                .update(reading.total_energy_consumed);
            state
                .produced_cache
                .entry(info.id)
                .or_default()
                .update(reading.total_energy_produced);
        }
    }

    /// Stop observing a removed thing; clears the root meter if it was the
    /// one removed.
    pub async fn unwatch_thing(&self, thing_id: ThingId) {
        let was_root = {
            let mut state = self.state.lock().await;
            state.consumed_cache.remove(&thing_id);
            state.produced_cache.remove(&thing_id);
            if state.root_meter == Some(thing_id) {
                state.root_meter = None;
                true
            } else {
                false
            }
        };

        if was_root {
            if let Err(err) = self.store.clear().await {
                tracing::warn!(%err, "failed to clear persisted root meter");
            }
            let _ = self
                .publisher
                .publish(EnergyEvent::RootMeterChanged {
                    root_meter_thing_id: None,
                })
                .await;
        }
    }

    /// The currently designated root meter, if any.
    pub async fn root_meter(&self) -> Option<ThingId> {
        self.state.lock().await.root_meter
    }

    /// Designate the household's root meter.
    ///
    /// # Errors
    ///
    /// [`EnergyError::MissingParameter`] when no id is given,
    /// [`EnergyError::InvalidParameter`] when the id is unknown or the thing
    /// is not tagged `energymeter`. State is unchanged on error.
    pub async fn set_root_meter(&self, thing_id: Option<ThingId>) -> Result<(), EnergyError> {
        let thing_id = thing_id.ok_or(EnergyError::MissingParameter)?;

        let info = self
            .registry
            .thing(thing_id)
            .await
            .ok_or(EnergyError::InvalidParameter)?;
        if !info.has_capability(ThingCapability::EnergyMeter) {
            return Err(EnergyError::InvalidParameter);
        }

        let changed = {
            let mut state = self.state.lock().await;
            if state.root_meter == Some(thing_id) {
                false
            } else {
                state.root_meter = Some(thing_id);
                true
            }
        };

        if changed {
            tracing::info!(thing = %thing_id, name = %info.name, "root meter set");
            if let Err(err) = self.store.save(thing_id).await {
                tracing::warn!(%err, "failed to persist root meter");
            }
            let _ = self
                .publisher
                .publish(EnergyEvent::RootMeterChanged {
                    root_meter_thing_id: Some(thing_id),
                })
                .await;
        }
        Ok(())
    }

    /// Recompute the household balance from the registry's current readings.
    ///
    /// Cumulative totals always advance; `PowerBalanceChanged` fires and the
    /// new balance is returned only when an instantaneous channel differs
    /// from the last emitted value. The caller pushes the returned balance
    /// into the realtime log.
    pub async fn update_power_balance(&self) -> Option<PowerBalance> {
        let mut state = self.state.lock().await;

        let mut acquisition = 0.0;
        if let Some(root_id) = state.root_meter {
            if let Some(reading) = self.registry.reading(root_id).await {
                acquisition = reading.current_power;
                let consumed_delta = state
                    .consumed_cache
                    .entry(root_id)
                    .or_default()
                    .update(reading.total_energy_consumed);
                state.balance.total_acquisition += consumed_delta;
                let produced_delta = state
                    .produced_cache
                    .entry(root_id)
                    .or_default()
                    .update(reading.total_energy_produced);
                state.balance.total_return += produced_delta;
            }
        }

        let mut production = 0.0;
        let mut storage = 0.0;
        for info in self.registry.things().await {
            let is_producer = info.has_capability(ThingCapability::SmartMeterProducer);
            let is_storage = info.has_capability(ThingCapability::EnergyStorage);
            if !is_producer && !is_storage {
                continue;
            }
            let Some(reading) = self.registry.reading(info.id).await else {
                continue;
            };
            let produced_delta = state
                .produced_cache
                .entry(info.id)
                .or_default()
                .update(reading.total_energy_produced);
            if is_producer {
                production += reading.current_power;
                state.balance.total_production += produced_delta;
            } else {
                storage += reading.current_power;
                state.total_from_storage += produced_delta;
            }
        }

        // Producers reporting generation as negative power feed the household
        // directly; production above acquisition shows up as export and must
        // not drive consumption negative.
        let consumption = (acquisition + (-production).max(0.0) - storage).max(0.0);
        state.balance.total_consumption = state.balance.total_acquisition
            + state.balance.total_production
            + state.total_from_storage
            - state.balance.total_return;

        let changed = acquisition != state.balance.acquisition
            || consumption != state.balance.consumption
            || production != state.balance.production
            || storage != state.balance.storage;

        state.balance.acquisition = acquisition;
        state.balance.consumption = consumption;
        state.balance.production = production;
        state.balance.storage = storage;

        tracing::debug!(
            consumption,
            production,
            acquisition,
            storage,
            "power balance updated"
        );

        if changed {
            let balance = state.balance;
            drop(state);
            let _ = self
                .publisher
                .publish(EnergyEvent::PowerBalanceChanged { balance })
                .await;
            Some(balance)
        } else {
            None
        }
    }

    /// The current balance, instantaneous channels and totals.
    pub async fn power_balance(&self) -> PowerBalance {
        self.state.lock().await.balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    use energyhub_domain::error::EnergyHubError;
    use energyhub_domain::thing::ThingReading;
    use energyhub_domain::time::now;

    #[derive(Default)]
    struct StubRegistry {
        things: StdMutex<Vec<ThingInfo>>,
        readings: StdMutex<HashMap<ThingId, ThingReading>>,
    }

    impl StubRegistry {
        fn add_thing(&self, capabilities: Vec<ThingCapability>) -> ThingId {
            let info = ThingInfo {
                id: ThingId::new(),
                name: "Stub Thing".to_string(),
                capabilities,
            };
            let id = info.id;
            self.things.lock().unwrap().push(info);
            id
        }

        fn set_reading(&self, id: ThingId, power: f64, consumed: f64, produced: f64) {
            self.readings.lock().unwrap().insert(
                id,
                ThingReading {
                    current_power: power,
                    total_energy_consumed: consumed,
                    total_energy_produced: produced,
                },
            );
        }
    }

    impl ThingRegistry for &StubRegistry {
        async fn things(&self) -> Vec<ThingInfo> {
            self.things.lock().unwrap().clone()
        }
        async fn thing(&self, id: ThingId) -> Option<ThingInfo> {
            self.things
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.id == id)
                .cloned()
        }
        async fn reading(&self, id: ThingId) -> Option<ThingReading> {
            self.readings.lock().unwrap().get(&id).copied()
        }
    }

    #[derive(Default)]
    struct StubStore {
        saved: StdMutex<Option<ThingId>>,
    }

    impl RootMeterStore for &StubStore {
        async fn load(&self) -> Result<Option<ThingId>, EnergyHubError> {
            Ok(*self.saved.lock().unwrap())
        }
        async fn save(&self, thing_id: ThingId) -> Result<(), EnergyHubError> {
            *self.saved.lock().unwrap() = Some(thing_id);
            Ok(())
        }
        async fn clear(&self) -> Result<(), EnergyHubError> {
            *self.saved.lock().unwrap() = None;
            Ok(())
        }
    }

    #[derive(Default)]
    struct StubPublisher {
        events: StdMutex<Vec<EnergyEvent>>,
    }

    impl EventPublisher for &StubPublisher {
        async fn publish(&self, event: EnergyEvent) -> Result<(), EnergyHubError> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    fn manager<'a>(
        registry: &'a StubRegistry,
        store: &'a StubStore,
        publisher: &'a StubPublisher,
    ) -> EnergyManager<&'a StubRegistry, &'a StubStore, &'a StubPublisher> {
        EnergyManager::new(registry, store, publisher)
    }

    #[tokio::test]
    async fn should_reject_set_root_meter_without_id() {
        let (registry, store, publisher) = Default::default();
        let manager = manager(&registry, &store, &publisher);

        let result = manager.set_root_meter(None).await;
        assert_eq!(result, Err(EnergyError::MissingParameter));
    }

    #[tokio::test]
    async fn should_reject_unknown_or_untagged_root_meter() {
        let (registry, store, publisher): (StubRegistry, _, _) = Default::default();
        let manager = manager(&registry, &store, &publisher);

        let result = manager.set_root_meter(Some(ThingId::new())).await;
        assert_eq!(result, Err(EnergyError::InvalidParameter));

        let producer = registry.add_thing(vec![ThingCapability::SmartMeterProducer]);
        let result = manager.set_root_meter(Some(producer)).await;
        assert_eq!(result, Err(EnergyError::InvalidParameter));
        assert_eq!(manager.root_meter().await, None);
    }

    #[tokio::test]
    async fn should_persist_and_announce_root_meter() {
        let (registry, store, publisher): (StubRegistry, StubStore, StubPublisher) =
            Default::default();
        let manager = manager(&registry, &store, &publisher);
        let meter = registry.add_thing(vec![ThingCapability::EnergyMeter]);

        manager.set_root_meter(Some(meter)).await.unwrap();

        assert_eq!(manager.root_meter().await, Some(meter));
        assert_eq!(*store.saved.lock().unwrap(), Some(meter));
        assert_eq!(
            publisher.events.lock().unwrap().as_slice(),
            &[EnergyEvent::RootMeterChanged {
                root_meter_thing_id: Some(meter),
            }]
        );
    }

    #[tokio::test]
    async fn should_not_announce_when_root_meter_unchanged() {
        let (registry, store, publisher): (StubRegistry, StubStore, StubPublisher) =
            Default::default();
        let manager = manager(&registry, &store, &publisher);
        let meter = registry.add_thing(vec![ThingCapability::EnergyMeter]);

        manager.set_root_meter(Some(meter)).await.unwrap();
        manager.set_root_meter(Some(meter)).await.unwrap();

        assert_eq!(publisher.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_auto_adopt_first_energy_meter() {
        let (registry, store, publisher): (StubRegistry, StubStore, StubPublisher) =
            Default::default();
        let manager = manager(&registry, &store, &publisher);
        let meter = registry.add_thing(vec![ThingCapability::EnergyMeter]);

        manager.startup(None).await;

        assert_eq!(manager.root_meter().await, Some(meter));
    }

    #[tokio::test]
    async fn should_clear_root_meter_when_thing_removed() {
        let (registry, store, publisher): (StubRegistry, StubStore, StubPublisher) =
            Default::default();
        let manager = manager(&registry, &store, &publisher);
        let meter = registry.add_thing(vec![ThingCapability::EnergyMeter]);
        manager.set_root_meter(Some(meter)).await.unwrap();

        manager.unwatch_thing(meter).await;

        assert_eq!(manager.root_meter().await, None);
        assert_eq!(*store.saved.lock().unwrap(), None);
        assert_eq!(
            publisher.events.lock().unwrap().last(),
            Some(&EnergyEvent::RootMeterChanged {
                root_meter_thing_id: None,
            })
        );
    }

    #[tokio::test]
    async fn should_compute_steady_state_balance() {
        let (registry, store, publisher): (StubRegistry, StubStore, StubPublisher) =
            Default::default();
        let manager = manager(&registry, &store, &publisher);
        let meter = registry.add_thing(vec![ThingCapability::EnergyMeter]);
        registry.set_reading(meter, 500.0, 10.0, 0.0);
        manager.startup(None).await;

        // First cycle adopts the raw counter without accounting.
        let balance = manager.update_power_balance().await.unwrap();
        assert_eq!(balance.acquisition, 500.0);
        assert_eq!(balance.consumption, 500.0);
        assert_eq!(balance.production, 0.0);
        assert_eq!(balance.storage, 0.0);
        assert_eq!(balance.total_acquisition, 0.0);

        // The next counter advance is accounted.
        registry.set_reading(meter, 500.0, 10.008, 0.0);
        manager.update_power_balance().await;
        let balance = manager.power_balance().await;
        assert!((balance.total_acquisition - 0.008).abs() < 1e-9);
        assert!((balance.total_consumption - 0.008).abs() < 1e-9);
    }

    #[tokio::test]
    async fn should_clamp_consumption_when_production_exceeds_acquisition() {
        let (registry, store, publisher): (StubRegistry, StubStore, StubPublisher) =
            Default::default();
        let manager = manager(&registry, &store, &publisher);
        let meter = registry.add_thing(vec![ThingCapability::EnergyMeter]);
        let inverter = registry.add_thing(vec![ThingCapability::SmartMeterProducer]);
        registry.set_reading(meter, -200.0, 0.0, 0.0);
        registry.set_reading(inverter, 1000.0, 0.0, 0.0);
        manager.startup(None).await;

        let balance = manager.update_power_balance().await.unwrap();
        assert_eq!(balance.consumption, 0.0);
        assert_eq!(balance.production, 1000.0);
        assert_eq!(balance.acquisition, -200.0);
        assert_eq!(balance.storage, 0.0);
    }

    #[tokio::test]
    async fn should_sum_storage_flow_into_balance() {
        let (registry, store, publisher): (StubRegistry, StubStore, StubPublisher) =
            Default::default();
        let manager = manager(&registry, &store, &publisher);
        let meter = registry.add_thing(vec![ThingCapability::EnergyMeter]);
        let battery = registry.add_thing(vec![ThingCapability::EnergyStorage]);
        registry.set_reading(meter, 800.0, 0.0, 0.0);
        registry.set_reading(battery, 300.0, 0.0, 0.0);
        manager.startup(None).await;

        let balance = manager.update_power_balance().await.unwrap();
        assert_eq!(balance.storage, 300.0);
        assert_eq!(balance.consumption, 500.0);
    }

    #[tokio::test]
    async fn should_not_emit_when_instantaneous_values_unchanged() {
        let (registry, store, publisher): (StubRegistry, StubStore, StubPublisher) =
            Default::default();
        let manager = manager(&registry, &store, &publisher);
        let meter = registry.add_thing(vec![ThingCapability::EnergyMeter]);
        registry.set_reading(meter, 500.0, 10.0, 0.0);
        manager.startup(None).await;

        assert!(manager.update_power_balance().await.is_some());
        // Same instantaneous power, only the counter advanced.
        registry.set_reading(meter, 500.0, 10.5, 0.0);
        assert!(manager.update_power_balance().await.is_none());
        // Totals still advanced.
        assert!((manager.power_balance().await.total_acquisition - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn should_tolerate_device_counter_reset() {
        let (registry, store, publisher): (StubRegistry, StubStore, StubPublisher) =
            Default::default();
        let manager = manager(&registry, &store, &publisher);
        let meter = registry.add_thing(vec![ThingCapability::EnergyMeter]);
        registry.set_reading(meter, 100.0, 5.0, 0.0);
        manager.startup(None).await;
        manager.update_power_balance().await;

        registry.set_reading(meter, 100.0, 5.1, 0.0);
        manager.update_power_balance().await;
        // Device resets, then advances again.
        registry.set_reading(meter, 100.0, 0.05, 0.0);
        manager.update_power_balance().await;
        registry.set_reading(meter, 100.0, 0.2, 0.0);
        manager.update_power_balance().await;

        let balance = manager.power_balance().await;
        assert!((balance.total_acquisition - 0.25).abs() < 1e-9);
    }

    #[tokio::test]
    async fn should_treat_missing_root_meter_state_as_zero_acquisition() {
        let (registry, store, publisher): (StubRegistry, StubStore, StubPublisher) =
            Default::default();
        let manager = manager(&registry, &store, &publisher);
        let meter = registry.add_thing(vec![ThingCapability::EnergyMeter]);
        let inverter = registry.add_thing(vec![ThingCapability::SmartMeterProducer]);
        // No reading for the meter yet.
        registry.set_reading(inverter, 400.0, 0.0, 0.0);
        manager.set_root_meter(Some(meter)).await.unwrap();

        let balance = manager.update_power_balance().await.unwrap();
        assert_eq!(balance.acquisition, 0.0);
        assert_eq!(balance.production, 400.0);
    }

    #[tokio::test]
    async fn should_restore_totals_from_latest_sample() {
        let (registry, store, publisher): (StubRegistry, StubStore, StubPublisher) =
            Default::default();
        let manager = manager(&registry, &store, &publisher);

        let latest = BalanceSample {
            timestamp: now(),
            consumption: 0.0,
            production: 0.0,
            acquisition: 0.0,
            storage: 0.0,
            total_consumption: 12.5,
            total_production: 4.0,
            total_acquisition: 9.0,
            total_return: 0.5,
        };
        manager.startup(Some(&latest)).await;

        let balance = manager.power_balance().await;
        assert_eq!(balance.total_consumption, 12.5);
        assert_eq!(balance.total_production, 4.0);
        assert_eq!(balance.total_acquisition, 9.0);
        assert_eq!(balance.total_return, 0.5);
    }

    #[tokio::test]
    async fn should_reload_persisted_root_meter_on_startup() {
        let (registry, store, publisher): (StubRegistry, StubStore, StubPublisher) =
            Default::default();
        let meter_id = registry.add_thing(vec![ThingCapability::EnergyMeter]);
        *store.saved.lock().unwrap() = Some(meter_id);

        let manager = manager(&registry, &store, &publisher);
        manager.startup(None).await;

        assert_eq!(manager.root_meter().await, Some(meter_id));
    }
}

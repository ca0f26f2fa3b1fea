//! In-memory implementation of the [`ThingRegistry`] port.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use energyhub_app::ports::ThingRegistry;
use energyhub_domain::id::ThingId;
use energyhub_domain::thing::{ThingInfo, ThingReading};

#[derive(Default)]
struct Inner {
    things: HashMap<ThingId, ThingInfo>,
    readings: HashMap<ThingId, ThingReading>,
}

/// Shared in-memory thing registry.
///
/// Cheap to clone; all clones observe the same set of things. Integrations
/// mutate it and emit the matching
/// [`ThingEvent`](energyhub_app::ports::ThingEvent)s themselves.
#[derive(Clone, Default)]
pub struct VirtualRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl VirtualRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a thing.
    pub fn upsert_thing(&self, info: ThingInfo) {
        self.inner.write().unwrap().things.insert(info.id, info);
    }

    /// Remove a thing and its reading.
    pub fn remove_thing(&self, id: ThingId) {
        let mut inner = self.inner.write().unwrap();
        inner.things.remove(&id);
        inner.readings.remove(&id);
    }

    /// Publish a thing's current reading.
    pub fn set_reading(&self, id: ThingId, reading: ThingReading) {
        self.inner.write().unwrap().readings.insert(id, reading);
    }
}

impl ThingRegistry for VirtualRegistry {
    async fn things(&self) -> Vec<ThingInfo> {
        self.inner.read().unwrap().things.values().cloned().collect()
    }

    async fn thing(&self, id: ThingId) -> Option<ThingInfo> {
        self.inner.read().unwrap().things.get(&id).cloned()
    }

    async fn reading(&self, id: ThingId) -> Option<ThingReading> {
        self.inner.read().unwrap().readings.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use energyhub_domain::thing::ThingCapability;

    fn meter() -> ThingInfo {
        ThingInfo {
            id: ThingId::new(),
            name: "Grid Meter".to_string(),
            capabilities: vec![ThingCapability::EnergyMeter],
        }
    }

    #[tokio::test]
    async fn should_register_and_look_up_things() {
        let registry = VirtualRegistry::new();
        let info = meter();
        let id = info.id;
        registry.upsert_thing(info);

        assert_eq!(registry.things().await.len(), 1);
        assert_eq!(registry.thing(id).await.unwrap().name, "Grid Meter");
        assert!(registry.thing(ThingId::new()).await.is_none());
    }

    #[tokio::test]
    async fn should_share_state_between_clones() {
        let registry = VirtualRegistry::new();
        let clone = registry.clone();
        let info = meter();
        let id = info.id;
        registry.upsert_thing(info);

        assert!(clone.thing(id).await.is_some());
    }

    #[tokio::test]
    async fn should_return_none_reading_until_state_appears() {
        let registry = VirtualRegistry::new();
        let info = meter();
        let id = info.id;
        registry.upsert_thing(info);

        assert!(registry.reading(id).await.is_none());

        registry.set_reading(
            id,
            ThingReading {
                current_power: 420.0,
                total_energy_consumed: 1.0,
                total_energy_produced: 0.0,
            },
        );
        assert_eq!(registry.reading(id).await.unwrap().current_power, 420.0);
    }

    #[tokio::test]
    async fn should_drop_reading_when_thing_removed() {
        let registry = VirtualRegistry::new();
        let info = meter();
        let id = info.id;
        registry.upsert_thing(info);
        registry.set_reading(id, ThingReading::default());

        registry.remove_thing(id);

        assert!(registry.thing(id).await.is_none());
        assert!(registry.reading(id).await.is_none());
    }
}

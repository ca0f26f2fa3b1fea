//! Shared application state for axum handlers.

use std::sync::Arc;

use chrono::TimeZone;

use energyhub_app::event_bus::InProcessEventBus;
use energyhub_app::ports::{Archive, RootMeterStore, ThingRegistry};
use energyhub_app::services::energy_logger::EnergyLogger;
use energyhub_app::services::energy_manager::EnergyManager;

/// Application state shared across all axum handlers.
///
/// Generic over the port implementations to avoid dynamic dispatch.
/// `Clone` is implemented manually so the service types themselves do not
/// need to be `Clone` — only the `Arc` wrappers are cloned.
pub struct AppState<R, S, A, Tz = chrono::Local> {
    /// Balance aggregation and root-meter lifecycle.
    pub manager: Arc<EnergyManager<R, S, Arc<InProcessEventBus>>>,
    /// Live buffers, sampling and log queries.
    pub logger: Arc<EnergyLogger<A, Arc<InProcessEventBus>, Tz>>,
    /// Notification fan-out, subscribed to by the SSE stream.
    pub event_bus: Arc<InProcessEventBus>,
}

impl<R, S, A, Tz> Clone for AppState<R, S, A, Tz> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            logger: Arc::clone(&self.logger),
            event_bus: Arc::clone(&self.event_bus),
        }
    }
}

impl<R, S, A, Tz> AppState<R, S, A, Tz>
where
    R: ThingRegistry + Send + Sync + 'static,
    S: RootMeterStore + Send + Sync + 'static,
    A: Archive + Send + Sync + 'static,
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync,
{
    /// Create a new application state from already shared services.
    pub fn new(
        manager: Arc<EnergyManager<R, S, Arc<InProcessEventBus>>>,
        logger: Arc<EnergyLogger<A, Arc<InProcessEventBus>, Tz>>,
        event_bus: Arc<InProcessEventBus>,
    ) -> Self {
        Self {
            manager,
            logger,
            event_bus,
        }
    }
}

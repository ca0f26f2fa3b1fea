//! In-process notification fan-out for [`EnergyEvent`]s.
//!
//! The core publishes fire-and-forget: a notification is emitted once per
//! committed row or changed state, delivered to whoever is subscribed at
//! that moment, and never replayed. A `tokio` [`broadcast`] channel gives
//! exactly those semantics — subscribers that fall behind lose the oldest
//! events, and publishing into an empty bus is not an error.

use energyhub_domain::error::EnergyHubError;
use energyhub_domain::event::EnergyEvent;
use tokio::sync::broadcast;

use crate::ports::EventPublisher;

/// Buffered notifications per subscriber before the oldest are dropped.
const DEFAULT_CAPACITY: usize = 256;

/// Broadcast-backed event bus shared by the manager, the logger and the
/// RPC notification stream.
pub struct InProcessEventBus {
    sender: broadcast::Sender<EnergyEvent>,
}

impl InProcessEventBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to notifications published from this point on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EnergyEvent> {
        self.sender.subscribe()
    }
}

impl Default for InProcessEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventPublisher for InProcessEventBus {
    async fn publish(&self, event: EnergyEvent) -> Result<(), EnergyHubError> {
        // A send error only means nobody is subscribed right now; the
        // notification contract allows dropping such events.
        let _ = self.sender.send(event);
        Ok(())
    }
}

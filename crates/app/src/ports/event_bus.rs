//! Notification publishing port.
//!
//! The manager and the logger push [`EnergyEvent`]s through this port after
//! the fact they describe is durable: a `PowerBalanceLogEntryAdded` is only
//! published once its row is committed, a `RootMeterChanged` once the new
//! id is persisted. Delivery is best-effort; implementations must accept an
//! event even when nobody is listening.

use std::future::Future;
use std::sync::Arc;

use energyhub_domain::error::EnergyHubError;
use energyhub_domain::event::EnergyEvent;

/// Fans one core notification out to all current subscribers.
pub trait EventPublisher {
    /// Publish an event. Having zero subscribers is not a failure.
    fn publish(
        &self,
        event: EnergyEvent,
    ) -> impl Future<Output = Result<(), EnergyHubError>> + Send;
}

/// Shared publishers pass events through to the wrapped bus, so services
/// and background tasks can hold the same bus behind an [`Arc`].
impl<P: EventPublisher + Sync + Send> EventPublisher for Arc<P> {
    async fn publish(&self, event: EnergyEvent) -> Result<(), EnergyHubError> {
        (**self).publish(event).await
    }
}

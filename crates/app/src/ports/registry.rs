//! Device-registry port — the set of things the core observes.
//!
//! The registry is an external collaborator: the core holds no strong
//! references to devices, only id lookups through this port. State-change
//! events arrive as [`ThingEvent`] values over a channel owned by the
//! composition root.

use std::future::Future;

use energyhub_domain::id::ThingId;
use energyhub_domain::thing::{ThingInfo, ThingReading};

/// A registry-originated event the core reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum ThingEvent {
    /// A thing appeared in the registry.
    Added(ThingInfo),
    /// A thing was removed from the registry.
    Removed(ThingId),
    /// One of the three observed numeric states changed.
    StateChanged {
        thing_id: ThingId,
        reading: ThingReading,
    },
}

/// Read-only view of the device registry.
///
/// Lookups are infallible by design: a thing that is unknown, or whose state
/// has not appeared yet, reads as `None` and contributes zero to the balance.
pub trait ThingRegistry {
    /// All currently known things.
    fn things(&self) -> impl Future<Output = Vec<ThingInfo>> + Send;

    /// Look up one thing by id.
    fn thing(&self, id: ThingId) -> impl Future<Output = Option<ThingInfo>> + Send;

    /// The current reading of a thing, if its state is available.
    fn reading(&self, id: ThingId) -> impl Future<Output = Option<ThingReading>> + Send;
}

//! Configuration-store port for the chosen root-meter id.

use std::future::Future;

use energyhub_domain::error::EnergyHubError;
use energyhub_domain::id::ThingId;

/// Persists which thing is the household's root meter.
pub trait RootMeterStore {
    /// The persisted root-meter id, if one was ever chosen.
    fn load(&self) -> impl Future<Output = Result<Option<ThingId>, EnergyHubError>> + Send;

    /// Persist a newly chosen root-meter id.
    fn save(&self, thing_id: ThingId)
    -> impl Future<Output = Result<(), EnergyHubError>> + Send;

    /// Forget the persisted root-meter id.
    fn clear(&self) -> impl Future<Output = Result<(), EnergyHubError>> + Send;
}

//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod archive;
pub mod event_bus;
pub mod registry;
pub mod root_meter_store;

pub use archive::{Archive, ThingCounterCache};
pub use event_bus::EventPublisher;
pub use registry::{ThingEvent, ThingRegistry};
pub use root_meter_store::RootMeterStore;

//! # energyhub-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `Archive` — durable multi-table time-series store
//!   - `ThingRegistry` — the device registry the core observes
//!   - `EventPublisher` — notification fan-out
//!   - `RootMeterStore` — persistence of the chosen root-meter id
//! - Define **driving/inbound ports** as use-case structs:
//!   - `EnergyManager` — balance aggregation and root-meter lifecycle
//!   - `EnergyLogger` — live buffers, sampling, retention and log queries
//! - Orchestrate domain objects without knowing *how* persistence or IO works
//!
//! ## Dependency rule
//! Depends on `energyhub-domain` only.
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod event_bus;
pub mod ports;
pub mod services;

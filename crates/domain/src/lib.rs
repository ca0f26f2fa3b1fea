//! # energyhub-domain
//!
//! Pure domain model for the energyhub energy-telemetry core.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **sample rates** and their boundary alignment / retention rules
//! - Define **samples** (power balance and per-thing rows, never mutated)
//! - Define **things** (metered devices: capability tags and raw readings)
//! - Define **counters** (drift/reset tolerant cumulative-energy tracking)
//! - Define **live logs** (in-memory 24-hour rolling windows of raw readings)
//! - Define **events** (notification records emitted by the core)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod balance;
pub mod counter;
pub mod event;
pub mod live_log;
pub mod sample_rate;
pub mod thing;

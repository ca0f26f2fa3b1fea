//! # energyhub-adapter-http-axum
//!
//! HTTP/JSON RPC surface of the energy core, built on
//! [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Translate queries into calls on the application services
//! - Map domain errors and RPC error codes onto HTTP responses
//! - Stream notifications to subscribers over SSE
//! - Convert between wire timestamps (Unix seconds) and internal ones
//!
//! ## Dependency rule
//! Depends on `energyhub-app` (services, ports) and `energyhub-domain`.
//! The `app` and `domain` crates must never reference this adapter.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

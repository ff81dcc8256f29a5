//! HTTP service for the tap relay.
//!
//! Exposes the relay and payment-request endpoints over axum and wires
//! the engine together from configuration.

/// Component wiring from configuration.
pub mod bootstrap;
/// Endpoint handlers.
pub mod handlers;
/// Router and server startup.
pub mod server;

//! Application Services
//!
//! Services that orchestrate the domain cache and coordinate the ports.
//!
//! - `refresher`: Periodic REST polling into the registry
//! - `subscription`: Push socket lifecycle and reconnection
//! - `rates`: The public [`RateClient`](rates::RateClient) facade

/// Periodic REST polling into the registry.
pub mod refresher;

/// Push socket lifecycle and reconnection.
pub mod subscription;

/// The public rate facade.
pub mod rates;

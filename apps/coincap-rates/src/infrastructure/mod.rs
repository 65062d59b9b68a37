//! Infrastructure Layer
//!
//! Adapters binding the application ports to the outside world.

/// Configuration loaded from environment variables.
pub mod config;

/// CoinCap v2 REST and WebSocket adapters.
pub mod coincap;

/// In-memory transports for tests.
pub mod mock;

//! CoinCap v2 Adapters
//!
//! Concrete transports for the CoinCap API:
//!
//! - `rest`: asset-list fetches over HTTPS
//! - `socket`: the push price WebSocket
//! - `messages`: wire DTOs shared by both

pub mod messages;
pub mod rest;
pub mod socket;

pub use rest::CoinCapRestClient;
pub use socket::CoinCapSocketConnector;

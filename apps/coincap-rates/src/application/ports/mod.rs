//! Port Interfaces
//!
//! Contracts the infrastructure adapters implement, following the Hexagonal
//! Architecture pattern. The feed services only ever see these traits, so
//! tests drive them with the in-memory transports from
//! [`infrastructure::mock`](crate::infrastructure::mock).
//!
//! ## Driven Ports (Outbound)
//!
//! - [`AssetSource`]: One-shot REST fetch of the full asset list
//! - [`PushConnector`] / [`PushSession`]: The push price socket

use async_trait::async_trait;

use crate::domain::registry::AssetSnapshot;

// =============================================================================
// Error Type
// =============================================================================

/// Transport-level failures, REST or socket.
///
/// These are transient by contract: REST failures are retried on the next
/// poll tick, socket failures drive the fixed-delay reconnect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection or I/O failure before a response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// The REST endpoint answered with a non-success status.
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    /// The response body could not be decoded.
    #[error("malformed response body: {0}")]
    Decode(String),

    /// The socket handshake did not complete.
    #[error("socket handshake failed: {0}")]
    Handshake(String),
}

// =============================================================================
// REST Source
// =============================================================================

/// Source of full asset-list snapshots.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch the current asset list together with the server's timestamp.
    async fn fetch_assets(&self) -> Result<AssetSnapshot, TransportError>;
}

// =============================================================================
// Push Transport
// =============================================================================

/// One event from an open push session.
#[derive(Debug, Clone)]
pub enum PushEvent {
    /// A raw text payload to validate and merge.
    Message(String),
    /// The peer closed the connection.
    Closed,
    /// The connection failed mid-session.
    Failed(String),
}

/// An open push session delivering price events.
///
/// Dropping the session releases the underlying connection; there is no
/// explicit close handshake.
#[async_trait]
pub trait PushSession: Send {
    /// Wait for the next event. After `Closed` or `Failed` the session is
    /// spent and must be dropped.
    async fn next_event(&mut self) -> PushEvent;
}

/// Factory opening push sessions for a set of asset ids.
#[async_trait]
pub trait PushConnector: Send + Sync {
    /// Open a session subscribed to exactly `asset_ids`. Returning `Ok`
    /// means the handshake completed.
    async fn connect(&self, asset_ids: &[String]) -> Result<Box<dyn PushSession>, TransportError>;
}

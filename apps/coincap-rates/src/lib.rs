#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements
    )
)]

//! CoinCap Rates - Price Feed Client
//!
//! Maintains a locally-cached view of crypto asset prices fed by two sources:
//! periodic REST polling of the CoinCap asset list and a push WebSocket
//! subscription for the assets callers have asked about. On top of the cache
//! it offers cross-asset unit conversion (e.g. wei to satoshi).
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Pure logic with no I/O
//!   - `registry`: Asset cache with freshness-preserving merge rules
//!   - `validation`: Strict decoding of push price payloads
//!   - `conversion`: Scalar rescaling between asset units
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Interfaces for the REST source and the push transport
//!   - `services`: Polling refresher, subscription lifecycle, rate facade
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `coincap`: reqwest/tungstenite clients for the CoinCap v2 API
//!   - `config`: Settings loaded from environment variables
//!   - `mock`: In-memory transports for tests
//!
//! # Data Flow
//!
//! ```text
//! CoinCap REST ──poll──┐
//!                      ├──merge──► AssetRegistry ◄──price()── RateClient
//! CoinCap WS ──push────┘               ▲
//!       ▲                              │ subscribe()
//!       └──────resubscribe─────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Pure price-cache and conversion logic with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::conversion::{ConversionError, UnitDef};
pub use domain::registry::{Asset, AssetRecord, AssetRegistry, AssetSnapshot};
pub use domain::validation::PayloadError;

// Application ports and services
pub use application::ports::{
    AssetSource, PushConnector, PushEvent, PushSession, TransportError,
};
pub use application::services::rates::{RateClient, RateClientConfig, RateError};
pub use application::services::subscription::ConnectionState;

// Infrastructure config
pub use infrastructure::config::{ConfigError, FeedSettings};

// CoinCap adapters
pub use infrastructure::coincap::{CoinCapRestClient, CoinCapSocketConnector};

// Mock transports (for integration tests)
pub use infrastructure::mock::{MockAssetSource, MockPushConnector};

//! Rate Facade
//!
//! The public surface of the crate: an owned client instance created by an
//! async connect factory, a synchronous price lookup with a freshness
//! contract, cross-asset unit conversion, and idempotent teardown.
//!
//! Each [`RateClient`] owns its registry, refresher task, and push session;
//! multiple independent clients can coexist in one process.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{AssetSource, PushConnector, TransportError};
use crate::application::services::refresher::PollingRefresher;
use crate::application::services::subscription::{ConnectionState, SubscriptionManager};
use crate::domain::conversion::{self, ConversionError, UnitDef};
use crate::domain::registry::AssetRegistry;
use crate::domain::validation::PayloadError;

// =============================================================================
// Error Type
// =============================================================================

/// Errors surfaced to callers of the rate facade.
///
/// The variants are deliberately coarse-grained buckets: "retry shortly"
/// (`UnknownAsset`, `StalePrice`, `Transport`) versus "the integration is
/// broken" (`InvalidFeedPayload`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateError {
    /// The symbol has no registry entry. Recoverable once assets load.
    #[error("unknown asset: {symbol}")]
    UnknownAsset {
        /// The symbol that was looked up.
        symbol: String,
    },

    /// A registry entry exists but exceeds the freshness threshold.
    /// Recoverable by retrying after the feed catches up.
    #[error("price for {symbol} is stale ({age_secs}s old)")]
    StalePrice {
        /// Symbol of the stale entry.
        symbol: String,
        /// Age of the entry in whole seconds.
        age_secs: i64,
    },

    /// The push feed sent a payload that failed validation. Fatal: the
    /// provider's wire format no longer matches this client.
    #[error("price feed sent an invalid payload: {0}")]
    InvalidFeedPayload(#[from] PayloadError),

    /// A transport-level failure, REST or socket. Transient.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// Unit conversion failed.
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

// =============================================================================
// Configuration
// =============================================================================

/// Tunables for one client instance.
#[derive(Debug, Clone)]
pub struct RateClientConfig {
    /// How often the REST asset list is refreshed.
    pub poll_interval: Duration,
    /// Maximum age a price may have before lookups fail with `StalePrice`.
    pub staleness_threshold: Duration,
    /// Flat delay between socket reconnect attempts.
    pub reconnect_delay: Duration,
    /// Currency all prices are denominated in. Lookups of this symbol
    /// short-circuit to 1.
    pub reference_currency: String,
}

impl Default for RateClientConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(20),
            staleness_threshold: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
            reference_currency: "USD".to_string(),
        }
    }
}

// =============================================================================
// Rate Client
// =============================================================================

/// Live price client backed by REST polling plus a push subscription.
pub struct RateClient {
    config: RateClientConfig,
    registry: Arc<AssetRegistry>,
    subscriptions: Arc<SubscriptionManager>,
    refresher: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl RateClient {
    /// Connect a new client.
    ///
    /// Performs one REST fetch to seed the registry before returning, then
    /// starts the polling refresher. No socket is opened until the first
    /// price lookup subscribes an asset.
    ///
    /// # Errors
    ///
    /// [`RateError::Transport`] when the initial fetch fails.
    pub async fn connect(
        config: RateClientConfig,
        source: Arc<dyn AssetSource>,
        connector: Arc<dyn PushConnector>,
    ) -> Result<Self, RateError> {
        let registry = Arc::new(AssetRegistry::new());
        let snapshot = source.fetch_assets().await?;
        registry.merge_snapshot(&snapshot);
        tracing::info!(assets = registry.len(), "asset registry seeded");

        let cancel = CancellationToken::new();
        let subscriptions = Arc::new(SubscriptionManager::new(
            connector,
            Arc::clone(&registry),
            config.reconnect_delay,
            cancel.child_token(),
        ));
        let refresher = PollingRefresher::new(
            source,
            Arc::clone(&registry),
            config.poll_interval,
            cancel.child_token(),
        );
        let refresher_task = tokio::spawn(refresher.run());

        Ok(Self {
            config,
            registry,
            subscriptions,
            refresher: tokio::sync::Mutex::new(Some(refresher_task)),
            cancel,
        })
    }

    /// Current price of `symbol` in the reference currency.
    ///
    /// Looking up a known but not-yet-subscribed symbol marks it subscribed
    /// and triggers a non-blocking resubscribe; the value returned by *this*
    /// call is whatever the registry held before that reconnect. Callers
    /// retrying after a [`RateError::StalePrice`] will see push data once
    /// the new session delivers. Must be called from within a Tokio runtime
    /// for that side effect to be spawned.
    ///
    /// # Errors
    ///
    /// See [`RateError`]; the reference currency itself never fails.
    pub fn price(&self, symbol: &str) -> Result<Decimal, RateError> {
        if symbol == self.config.reference_currency {
            return Ok(Decimal::ONE);
        }

        if let Some(failure) = self.subscriptions.poisoned() {
            return Err(RateError::InvalidFeedPayload(failure));
        }

        let asset = self
            .registry
            .get(symbol)
            .ok_or_else(|| RateError::UnknownAsset {
                symbol: symbol.to_string(),
            })?;

        if !asset.subscribed {
            self.registry.subscribe(&asset.symbol);
            tracing::debug!(symbol = %asset.symbol, "subscription requested");
            let subscriptions = Arc::clone(&self.subscriptions);
            tokio::spawn(async move {
                subscriptions.resubscribe().await;
            });
        }

        let age = Utc::now().signed_duration_since(asset.updated_at);
        let threshold = chrono::Duration::from_std(self.config.staleness_threshold)
            .unwrap_or(chrono::TimeDelta::MAX);
        if age > threshold {
            return Err(RateError::StalePrice {
                symbol: asset.symbol,
                age_secs: age.num_seconds(),
            });
        }

        Ok(asset.price_usd)
    }

    /// Convert `amount` of `from_unit` into `to_unit` (e.g. `wei` into
    /// `satoshi`), using live prices for cross-asset pairs.
    ///
    /// # Errors
    ///
    /// Unit resolution and conversion failures as [`RateError::Conversion`];
    /// price lookups fail as [`price`](Self::price) does.
    pub fn convert(
        &self,
        amount: Decimal,
        from_unit: &str,
        to_unit: &str,
    ) -> Result<Decimal, RateError> {
        let from = UnitDef::builtin(from_unit)
            .ok_or_else(|| ConversionError::UnknownUnit(from_unit.to_string()))?;
        let to = UnitDef::builtin(to_unit)
            .ok_or_else(|| ConversionError::UnknownUnit(to_unit.to_string()))?;

        let (from_price, to_price) = if from.asset == to.asset {
            (Decimal::ONE, Decimal::ONE)
        } else {
            (self.price(&from.asset)?, self.price(&to.asset)?)
        };

        Ok(conversion::convert(amount, &from, &to, from_price, to_price)?)
    }

    /// Number of assets currently cached.
    #[must_use]
    pub fn asset_count(&self) -> usize {
        self.registry.len()
    }

    /// Lifecycle state of the push connection.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.subscriptions.state()
    }

    /// Tear down the socket and the polling timer and discard the cache.
    ///
    /// Idempotent: calling it on an already disconnected client is a no-op.
    pub async fn disconnect(&self) {
        self.cancel.cancel();

        if let Some(task) = self.refresher.lock().await.take() {
            let _ = task.await;
        }
        self.subscriptions.shutdown().await;
        self.registry.clear();

        tracing::info!("rate client disconnected");
    }
}

// =============================================================================
// Tests
// =============================================================================

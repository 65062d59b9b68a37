//! Polling Refresher
//!
//! Periodically fetches the full asset list over REST and merges it into the
//! registry. A failed fetch is skipped; the next scheduled tick is the retry,
//! so the interval itself throttles retries and no extra backoff is applied.
//!
//! The refresher runs independently of the push socket and is not restarted
//! on socket reconnects.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::application::ports::AssetSource;
use crate::domain::registry::AssetRegistry;

/// Periodic REST refresh task.
pub struct PollingRefresher {
    source: Arc<dyn AssetSource>,
    registry: Arc<AssetRegistry>,
    interval: Duration,
    cancel: CancellationToken,
}

impl PollingRefresher {
    /// Create a refresher. Nothing runs until [`run`](Self::run) is awaited.
    #[must_use]
    pub fn new(
        source: Arc<dyn AssetSource>,
        registry: Arc<AssetRegistry>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            registry,
            interval,
            cancel,
        }
    }

    /// Run the refresh loop until cancelled.
    ///
    /// The first tick fires one full interval after start; the registry is
    /// expected to have been seeded by the initial fetch already.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() fires immediately; consume that tick.
        ticker.tick().await;

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("polling refresher cancelled");
                    return;
                }
                _ = ticker.tick() => {}
            }

            match self.source.fetch_assets().await {
                Ok(snapshot) => {
                    // The fetch may have resolved after a disconnect.
                    if self.cancel.is_cancelled() {
                        return;
                    }
                    let count = snapshot.assets.len();
                    self.registry.merge_snapshot(&snapshot);
                    tracing::debug!(assets = count, "asset list refreshed");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "asset refresh failed, retrying next tick");
                }
            }
        }
    }
}

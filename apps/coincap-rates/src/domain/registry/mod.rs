//! Asset Registry
//!
//! In-memory cache of known assets and their last observed USD prices,
//! updated by two feed sources with different merge rules:
//!
//! - REST snapshots upsert whole entries but never overwrite an entry that
//!   is already fresher than the snapshot itself.
//! - Push updates overwrite price and timestamp only, for assets that are
//!   already known.
//!
//! An asset's `updated_at` is taken as the minimum of local receipt time and
//! the provider-asserted time, so a provider clock skewed into the future can
//! never make an entry look fresher than it is. Per entry, `updated_at` is
//! monotonically non-decreasing across any sequence of merges.
//!
//! The registry starts empty, is seeded by the first REST fetch, and entries
//! are never deleted during normal operation. `clear` discards the whole
//! cache on disconnect.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Types
// =============================================================================

/// One tracked asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Provider-specific stable identifier (e.g. `bitcoin`). May differ from
    /// the trading symbol.
    pub id: String,
    /// Short uppercase ticker used by callers (e.g. `BTC`). Unique within
    /// the registry.
    pub symbol: String,
    /// Last known price in the reference currency.
    pub price_usd: Decimal,
    /// Timestamp of the last price update.
    pub updated_at: DateTime<Utc>,
    /// Whether this asset is part of the live push subscription.
    pub subscribed: bool,
}

/// One asset row of a REST snapshot, before merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    /// Provider-specific stable identifier.
    pub id: String,
    /// Short uppercase ticker.
    pub symbol: String,
    /// Price in the reference currency.
    pub price_usd: Decimal,
}

/// A full asset-list snapshot as returned by one REST fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetSnapshot {
    /// Assets contained in the snapshot.
    pub assets: Vec<AssetRecord>,
    /// Server-asserted time the snapshot was taken.
    pub server_time: DateTime<Utc>,
}

// =============================================================================
// Registry
// =============================================================================

/// Thread-safe cache of known assets.
///
/// All mutation happens under a single write lock, so merges from the polling
/// refresher and the push session are serialized against each other and
/// against caller lookups.
///
/// Lookups are linear scans. Asset lists are a few hundred entries, so a map
/// keyed by one of the two lookup fields would not pay for itself.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    assets: RwLock<Vec<Asset>>,
}

impl AssetRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            assets: RwLock::new(Vec::new()),
        }
    }

    /// Merge a REST snapshot into the registry.
    ///
    /// For each asset in the snapshot: if a local entry under the same symbol
    /// is already fresher than the snapshot's server time, the local entry is
    /// kept unchanged. Otherwise identity and price fields are replaced, the
    /// entry is stamped with `min(now, server_time)`, and an existing entry's
    /// `subscribed` flag is preserved.
    pub fn merge_snapshot(&self, snapshot: &AssetSnapshot) {
        let received_at = Utc::now();
        let updated_at = received_at.min(snapshot.server_time);

        let mut assets = self.assets.write();
        for record in &snapshot.assets {
            match assets.iter_mut().find(|a| a.symbol == record.symbol) {
                Some(existing) => {
                    if existing.updated_at > snapshot.server_time {
                        // Local entry is fresher than the whole snapshot.
                        continue;
                    }
                    existing.id = record.id.clone();
                    existing.price_usd = record.price_usd;
                    existing.updated_at = updated_at;
                }
                None => assets.push(Asset {
                    id: record.id.clone(),
                    symbol: record.symbol.clone(),
                    price_usd: record.price_usd,
                    updated_at,
                    subscribed: false,
                }),
            }
        }
    }

    /// Apply validated push updates, keyed by asset id.
    ///
    /// Overwrites price and stamps the receipt time. Ids that do not match a
    /// known asset are skipped; the payload validator rejects them before
    /// they normally get here.
    pub fn apply_push(&self, updates: &[(String, Decimal)]) {
        let now = Utc::now();

        let mut assets = self.assets.write();
        for (id, price) in updates {
            match assets.iter_mut().find(|a| &a.id == id) {
                Some(asset) => {
                    asset.price_usd = *price;
                    asset.updated_at = now;
                }
                None => tracing::debug!(id = %id, "push update for unknown asset id skipped"),
            }
        }
    }

    /// Mark the asset with the given symbol as subscribed.
    ///
    /// Returns `false` when the symbol is unknown; the caller surfaces that
    /// as an error before the flag would matter.
    pub fn subscribe(&self, symbol: &str) -> bool {
        let mut assets = self.assets.write();
        match assets.iter_mut().find(|a| a.symbol == symbol) {
            Some(asset) => {
                asset.subscribed = true;
                true
            }
            None => false,
        }
    }

    /// Look up an asset by exact symbol or id match.
    #[must_use]
    pub fn get(&self, symbol_or_id: &str) -> Option<Asset> {
        self.assets
            .read()
            .iter()
            .find(|a| a.symbol == symbol_or_id || a.id == symbol_or_id)
            .cloned()
    }

    /// Whether the given provider id is known.
    #[must_use]
    pub fn contains_id(&self, id: &str) -> bool {
        self.assets.read().iter().any(|a| a.id == id)
    }

    /// Ids of all subscribed assets, sorted for deterministic socket URLs.
    #[must_use]
    pub fn subscribed_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .assets
            .read()
            .iter()
            .filter(|a| a.subscribed)
            .map(|a| a.id.clone())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Number of known assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.read().len()
    }

    /// Whether the registry holds no assets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.read().is_empty()
    }

    /// Discard every entry, including subscription flags.
    pub fn clear(&self) {
        self.assets.write().clear();
    }
}

// =============================================================================
// Tests
// =============================================================================

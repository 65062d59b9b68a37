//! CoinCap Wire Types
//!
//! DTOs for the REST asset list. The endpoint returns
//!
//! ```json
//! {
//!   "data": [
//!     {"id": "bitcoin", "symbol": "BTC", "priceUsd": "50815.2129462628", ...}
//!   ],
//!   "timestamp": 1712345678901
//! }
//! ```
//!
//! Rows occasionally ship with a null or unparseable `priceUsd`; those are
//! dropped at decode time with a debug log rather than failing the whole
//! snapshot.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::ports::TransportError;
use crate::domain::registry::{AssetRecord, AssetSnapshot};

/// Response envelope of `GET /v2/assets`.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetsResponse {
    /// Asset rows.
    pub data: Vec<AssetDto>,
    /// Server time in epoch milliseconds.
    pub timestamp: i64,
}

/// One asset row. Fields the client does not consume are not modeled.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetDto {
    /// Provider-stable identifier.
    pub id: String,
    /// Uppercase ticker.
    pub symbol: String,
    /// Decimal-string price, sometimes null.
    #[serde(rename = "priceUsd")]
    pub price_usd: Option<String>,
}

impl AssetsResponse {
    /// Convert the envelope into a domain snapshot.
    ///
    /// # Errors
    ///
    /// [`TransportError::Decode`] when the server timestamp is out of range.
    pub fn into_snapshot(self) -> Result<AssetSnapshot, TransportError> {
        let server_time: DateTime<Utc> = DateTime::from_timestamp_millis(self.timestamp)
            .ok_or_else(|| {
                TransportError::Decode(format!("timestamp out of range: {}", self.timestamp))
            })?;

        let assets = self
            .data
            .into_iter()
            .filter_map(|dto| {
                let raw = dto.price_usd?;
                match raw.parse::<Decimal>() {
                    Ok(price_usd) => Some(AssetRecord {
                        id: dto.id,
                        symbol: dto.symbol,
                        price_usd,
                    }),
                    Err(_) => {
                        tracing::debug!(id = %dto.id, price = %raw, "dropping unparseable asset row");
                        None
                    }
                }
            })
            .collect();

        Ok(AssetSnapshot {
            assets,
            server_time,
        })
    }
}

//! CoinCap REST Client
//!
//! Fetches the full asset list from `GET {base}/assets`. Failures map to
//! [`TransportError`]; the polling refresher treats them as transient and
//! retries on its next tick.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::application::ports::{AssetSource, TransportError};
use crate::domain::registry::AssetSnapshot;

use super::messages::AssetsResponse;

/// Request timeout. Comfortably under the polling interval so a hung fetch
/// cannot overlap the next tick.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// REST adapter for the CoinCap asset list.
#[derive(Debug, Clone)]
pub struct CoinCapRestClient {
    client: Client,
    base_url: String,
}

impl CoinCapRestClient {
    /// Create a client against the given base URL (e.g.
    /// `https://api.coincap.io/v2`).
    ///
    /// # Errors
    ///
    /// [`TransportError::Network`] when the underlying HTTP client cannot be
    /// constructed.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AssetSource for CoinCapRestClient {
    async fn fetch_assets(&self) -> Result<AssetSnapshot, TransportError> {
        let url = format!("{}/assets", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body: AssetsResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        body.into_snapshot()
    }
}

//! CoinCap Push Socket
//!
//! WebSocket adapter for the push price feed. A session is opened against
//! `{base}/prices?assets=<comma-joined-ids>`; the server then sends flat
//! JSON objects mapping asset ids to decimal-string prices, with no
//! handshake beyond the HTTP upgrade itself.
//!
//! Ping frames are answered inside the adapter. Close frames, stream end,
//! and protocol errors all surface as session events; reconnection is the
//! subscription manager's job, not this adapter's.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::application::ports::{PushConnector, PushEvent, PushSession, TransportError};

/// Connector opening sessions against the CoinCap price socket.
#[derive(Debug, Clone)]
pub struct CoinCapSocketConnector {
    ws_base: String,
}

impl CoinCapSocketConnector {
    /// Create a connector against the given WebSocket base URL (e.g.
    /// `wss://ws.coincap.io`).
    #[must_use]
    pub fn new(ws_base: &str) -> Self {
        Self {
            ws_base: ws_base.trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, asset_ids: &[String]) -> String {
        format!("{}/prices?assets={}", self.ws_base, asset_ids.join(","))
    }
}

#[async_trait]
impl PushConnector for CoinCapSocketConnector {
    async fn connect(&self, asset_ids: &[String]) -> Result<Box<dyn PushSession>, TransportError> {
        let url = self.url_for(asset_ids);
        tracing::debug!(url = %url, "opening price socket");

        let (stream, _response) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|e| TransportError::Handshake(e.to_string()))?;

        Ok(Box::new(CoinCapSocketSession { stream }))
    }
}

/// One open socket session.
struct CoinCapSocketSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl PushSession for CoinCapSocketSession {
    async fn next_event(&mut self) -> PushEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return PushEvent::Message(text.to_string()),
                Some(Ok(Message::Ping(data))) => {
                    if self.stream.send(Message::Pong(data)).await.is_err() {
                        return PushEvent::Closed;
                    }
                }
                Some(Ok(Message::Close(_))) | None => return PushEvent::Closed,
                Some(Ok(_)) => {
                    // Binary, pong, and frame messages carry nothing for us.
                }
                Some(Err(e)) => return PushEvent::Failed(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_carries_comma_joined_ids() {
        let connector = CoinCapSocketConnector::new("wss://ws.coincap.io/");
        let url = connector.url_for(&["bitcoin".to_string(), "ethereum".to_string()]);
        assert_eq!(url, "wss://ws.coincap.io/prices?assets=bitcoin,ethereum");
    }

    #[test]
    fn url_for_single_asset_has_no_trailing_comma() {
        let connector = CoinCapSocketConnector::new("wss://ws.coincap.io");
        let url = connector.url_for(&["bitcoin".to_string()]);
        assert_eq!(url, "wss://ws.coincap.io/prices?assets=bitcoin");
    }
}

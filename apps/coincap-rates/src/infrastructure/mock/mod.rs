//! Mock Transports
//!
//! In-memory implementations of the transport ports, used by the unit and
//! integration suites. Shipped as part of the library so downstream crates
//! can drive a [`RateClient`](crate::application::services::rates::RateClient)
//! without a network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::application::ports::{
    AssetSource, PushConnector, PushEvent, PushSession, TransportError,
};
use crate::domain::registry::AssetSnapshot;

// =============================================================================
// REST Source
// =============================================================================

/// Scriptable in-memory [`AssetSource`].
///
/// Responses queued with [`push_response`](Self::push_response) are served
/// first, in order; once the queue is empty every fetch returns the snapshot
/// set with [`set_snapshot`](Self::set_snapshot).
#[derive(Debug, Default)]
pub struct MockAssetSource {
    queue: Mutex<VecDeque<Result<AssetSnapshot, TransportError>>>,
    fallback: Mutex<Option<AssetSnapshot>>,
    calls: AtomicUsize,
}

impl MockAssetSource {
    /// Create a source with nothing scripted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the snapshot served once the response queue is drained.
    pub fn set_snapshot(&self, snapshot: AssetSnapshot) {
        *self.fallback.lock() = Some(snapshot);
    }

    /// Queue one response ahead of the fallback snapshot.
    pub fn push_response(&self, response: Result<AssetSnapshot, TransportError>) {
        self.queue.lock().push_back(response);
    }

    /// Number of fetches served so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssetSource for MockAssetSource {
    async fn fetch_assets(&self) -> Result<AssetSnapshot, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(response) = self.queue.lock().pop_front() {
            return response;
        }
        self.fallback
            .lock()
            .clone()
            .ok_or_else(|| TransportError::Network("no snapshot scripted".to_string()))
    }
}

// =============================================================================
// Push Transport
// =============================================================================

enum Script {
    Accept(mpsc::Receiver<PushEvent>),
    Refuse(TransportError),
}

/// Scriptable in-memory [`PushConnector`].
///
/// Every accepted connect is recorded with the exact id set it carried.
/// Sessions scripted with [`script_session`](Self::script_session) are
/// handed out in order; an unscripted connect gets a session that stays
/// silent until the connector itself is dropped.
#[derive(Default)]
pub struct MockPushConnector {
    connects: Mutex<Vec<Vec<String>>>,
    scripts: Mutex<VecDeque<Script>>,
    retained: Mutex<Vec<mpsc::Sender<PushEvent>>>,
}

impl MockPushConnector {
    /// Create a connector with nothing scripted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next accepted session and get its remote control.
    pub fn script_session(&self) -> ScriptedSession {
        let (tx, rx) = mpsc::channel(32);
        self.scripts.lock().push_back(Script::Accept(rx));
        ScriptedSession { tx }
    }

    /// Script the next connect attempt to be refused.
    pub fn script_failure(&self, error: TransportError) {
        self.scripts.lock().push_back(Script::Refuse(error));
    }

    /// Number of successful and refused connect attempts seen.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.connects.lock().len()
    }

    /// The id sets of every connect attempt, in order.
    #[must_use]
    pub fn connected_sets(&self) -> Vec<Vec<String>> {
        self.connects.lock().clone()
    }
}

#[async_trait]
impl PushConnector for MockPushConnector {
    async fn connect(&self, asset_ids: &[String]) -> Result<Box<dyn PushSession>, TransportError> {
        self.connects.lock().push(asset_ids.to_vec());

        match self.scripts.lock().pop_front() {
            Some(Script::Accept(rx)) => Ok(Box::new(MockPushSession { rx })),
            Some(Script::Refuse(error)) => Err(error),
            None => {
                let (tx, rx) = mpsc::channel(32);
                self.retained.lock().push(tx);
                Ok(Box::new(MockPushSession { rx }))
            }
        }
    }
}

/// Remote control for one scripted session.
pub struct ScriptedSession {
    tx: mpsc::Sender<PushEvent>,
}

impl ScriptedSession {
    /// Deliver a text payload to the session.
    pub async fn send(&self, payload: &str) {
        let _ = self.tx.send(PushEvent::Message(payload.to_string())).await;
    }

    /// Close the session from the peer side.
    pub async fn close(&self) {
        let _ = self.tx.send(PushEvent::Closed).await;
    }

    /// Fail the session mid-stream.
    pub async fn fail(&self, reason: &str) {
        let _ = self.tx.send(PushEvent::Failed(reason.to_string())).await;
    }
}

struct MockPushSession {
    rx: mpsc::Receiver<PushEvent>,
}

#[async_trait]
impl PushSession for MockPushSession {
    async fn next_event(&mut self) -> PushEvent {
        self.rx.recv().await.unwrap_or(PushEvent::Closed)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio_test::assert_ok;

    use super::*;

    #[tokio::test]
    async fn source_serves_queue_then_fallback() {
        let source = MockAssetSource::new();
        source.push_response(Err(TransportError::Status(429)));
        source.set_snapshot(AssetSnapshot {
            assets: vec![],
            server_time: Utc::now(),
        });

        assert_eq!(
            source.fetch_assets().await,
            Err(TransportError::Status(429))
        );
        assert_ok!(source.fetch_assets().await);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn connector_records_id_sets_in_order() {
        let connector = MockPushConnector::new();

        let _first = connector.connect(&["bitcoin".to_string()]).await.unwrap();
        let _second = connector
            .connect(&["bitcoin".to_string(), "ethereum".to_string()])
            .await
            .unwrap();

        assert_eq!(connector.connect_count(), 2);
        assert_eq!(
            connector.connected_sets(),
            vec![
                vec!["bitcoin".to_string()],
                vec!["bitcoin".to_string(), "ethereum".to_string()],
            ]
        );
    }

    #[tokio::test]
    async fn scripted_session_delivers_events() {
        let connector = MockPushConnector::new();
        let control = connector.script_session();

        let mut session = connector.connect(&["bitcoin".to_string()]).await.unwrap();
        control.send(r#"{"bitcoin": "1"}"#).await;
        control.close().await;

        assert!(matches!(session.next_event().await, PushEvent::Message(_)));
        assert!(matches!(session.next_event().await, PushEvent::Closed));
    }

    #[tokio::test]
    async fn scripted_failure_is_returned() {
        let connector = MockPushConnector::new();
        connector.script_failure(TransportError::Handshake("refused".to_string()));

        let result = connector.connect(&["bitcoin".to_string()]).await;
        assert!(matches!(result.err(), Some(TransportError::Handshake(_))));
        assert_eq!(connector.connect_count(), 1);
    }
}

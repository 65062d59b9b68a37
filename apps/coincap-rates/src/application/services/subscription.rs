//! Subscription Manager
//!
//! Owns the push socket lifecycle: opening a session for the current
//! subscribed set, reading and merging its events, tearing it down, and
//! reconnecting after failures.
//!
//! There is no incremental add-symbol message on the wire. Whenever the
//! subscribed set changes, [`SubscriptionManager::resubscribe`] replaces the
//! whole session with a fresh one carrying the entire current set. Teardown
//! cancels the old session's token and awaits its task before the next
//! connect begins, so a stale session's queued events can never be merged
//! into a newer session's run. The session slot sits behind an async mutex;
//! a resubscribe arriving while a previous attempt is still forming waits
//! for that attempt instead of racing it.
//!
//! Socket loss while connecting or open is retried after a flat delay. The
//! polling refresher keeps the cache warm in the meantime, so the flat delay
//! is the sole retry mechanism here.
//!
//! An invalid payload on an open session is different: it signals a contract
//! break with the provider, not a network blip. It poisons the manager,
//! stops the reconnect loop, and surfaces from every subsequent price call.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{PushConnector, PushEvent, PushSession};
use crate::domain::registry::AssetRegistry;
use crate::domain::validation::{self, PayloadError};

// =============================================================================
// Connection State
// =============================================================================

/// Lifecycle state of the push connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No session exists. Terminal until a subscription is requested.
    #[default]
    Idle,
    /// A session is being opened.
    Connecting,
    /// The session handshake completed and events are flowing.
    Open,
    /// An old session is being torn down.
    Closing,
}

impl ConnectionState {
    /// Name for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
        }
    }
}

// =============================================================================
// Subscription Manager
// =============================================================================

/// How a session run ended.
enum SessionEnd {
    /// Cancelled from outside; do not reconnect.
    Cancelled,
    /// The feed sent an invalid payload; do not reconnect.
    Poisoned,
    /// The connection dropped; reconnect after the flat delay.
    Lost(String),
}

/// Handle to the currently running session task.
struct SessionHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the push socket lifecycle for one client instance.
pub struct SubscriptionManager {
    connector: Arc<dyn PushConnector>,
    registry: Arc<AssetRegistry>,
    reconnect_delay: Duration,
    cancel: CancellationToken,
    state: RwLock<ConnectionState>,
    failure: RwLock<Option<PayloadError>>,
    session: tokio::sync::Mutex<Option<SessionHandle>>,
}

impl SubscriptionManager {
    /// Create a manager. No socket is opened until the first resubscribe
    /// with a non-empty subscribed set.
    #[must_use]
    pub fn new(
        connector: Arc<dyn PushConnector>,
        registry: Arc<AssetRegistry>,
        reconnect_delay: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            connector,
            registry,
            reconnect_delay,
            cancel,
            state: RwLock::new(ConnectionState::Idle),
            failure: RwLock::new(None),
            session: tokio::sync::Mutex::new(None),
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// The payload error that poisoned the feed, if any.
    #[must_use]
    pub fn poisoned(&self) -> Option<PayloadError> {
        self.failure.read().clone()
    }

    /// Replace the current session with a fresh one carrying the entire
    /// current subscribed set.
    ///
    /// Waits for any in-flight connect attempt to finish before tearing it
    /// down; overlapping resubscribes queue on the session slot instead of
    /// opening competing sockets. With an empty subscribed set the manager
    /// just goes (or stays) idle.
    pub async fn resubscribe(self: Arc<Self>) {
        let mut slot = self.session.lock().await;

        if let Some(old) = slot.take() {
            *self.state.write() = ConnectionState::Closing;
            old.cancel.cancel();
            let _ = old.task.await;
        }

        if self.cancel.is_cancelled() || self.poisoned().is_some() {
            *self.state.write() = ConnectionState::Idle;
            return;
        }

        let ids = self.registry.subscribed_ids();
        if ids.is_empty() {
            *self.state.write() = ConnectionState::Idle;
            return;
        }

        let session_cancel = self.cancel.child_token();
        let task = tokio::spawn(Arc::clone(&self).run_session(ids, session_cancel.clone()));
        *slot = Some(SessionHandle {
            cancel: session_cancel,
            task,
        });
    }

    /// Tear everything down. Idempotent.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let mut slot = self.session.lock().await;
        if let Some(old) = slot.take() {
            old.cancel.cancel();
            let _ = old.task.await;
        }
        *self.state.write() = ConnectionState::Idle;
    }

    /// Connect-and-read loop for one session slot.
    async fn run_session(self: Arc<Self>, mut ids: Vec<String>, cancel: CancellationToken) {
        loop {
            *self.state.write() = ConnectionState::Connecting;
            tracing::info!(assets = ids.len(), "opening push session");

            let connect = tokio::select! {
                () = cancel.cancelled() => {
                    *self.state.write() = ConnectionState::Idle;
                    return;
                }
                result = self.connector.connect(&ids) => result,
            };

            match connect {
                Ok(session) => {
                    *self.state.write() = ConnectionState::Open;
                    tracing::info!("push session open");

                    match self.read_until_end(session, &cancel).await {
                        SessionEnd::Cancelled | SessionEnd::Poisoned => {
                            *self.state.write() = ConnectionState::Idle;
                            return;
                        }
                        SessionEnd::Lost(reason) => {
                            tracing::warn!(reason = %reason, "push session lost");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "push connect failed");
                }
            }

            *self.state.write() = ConnectionState::Idle;
            tokio::select! {
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(self.reconnect_delay) => {}
            }

            // The set may have grown while we were down; the next attempt
            // always carries the full current set.
            ids = self.registry.subscribed_ids();
            if ids.is_empty() {
                return;
            }
        }
    }

    /// Read one open session until it ends.
    async fn read_until_end(
        &self,
        mut session: Box<dyn PushSession>,
        cancel: &CancellationToken,
    ) -> SessionEnd {
        loop {
            let event = tokio::select! {
                () = cancel.cancelled() => return SessionEnd::Cancelled,
                event = session.next_event() => event,
            };

            match event {
                PushEvent::Message(text) => {
                    match validation::parse_price_map(&text, &self.registry) {
                        Ok(updates) => {
                            if cancel.is_cancelled() {
                                return SessionEnd::Cancelled;
                            }
                            self.registry.apply_push(&updates);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "invalid push payload, feed poisoned");
                            *self.failure.write() = Some(e);
                            return SessionEnd::Poisoned;
                        }
                    }
                }
                PushEvent::Closed => return SessionEnd::Lost("peer closed".to_string()),
                PushEvent::Failed(reason) => return SessionEnd::Lost(reason),
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

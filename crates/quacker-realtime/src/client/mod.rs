//! Public handle for the duck network connection.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::SinkExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backoff::Backoff;
use crate::connection::{session_loop, SessionCommand, SessionEnd};
use crate::error::{RealtimeError, TransportError};
use crate::message::Message;
use crate::registry::{SubscriberRegistry, Subscription, Topic};
use crate::transport::{Connector, WsConnector};
use crate::types::{ConnectionState, RealtimeConfig};


// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle for one logical duck network connection.
///
/// Cloning is cheap and every clone drives the same connection, so pass the
/// handle to whoever needs the channel. When the last clone is dropped the
/// live session is closed and any scheduled reconnection is abandoned.
#[derive(Clone)]
pub struct RealtimeChannelClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: RealtimeConfig,
    connector: Arc<dyn Connector>,
    registry: Arc<SubscriberRegistry>,
    state: Mutex<SessionState>,
    /// Held for the whole of an open attempt, so a new attempt cannot start
    /// until a cancelled one has let go of its transport.
    open_gate: tokio::sync::Mutex<()>,
    /// `true` once reconnection has been abandoned at the attempt ceiling.
    offline: watch::Sender<bool>,
}

struct SessionState {
    connection: ConnectionState,
    backoff: Backoff,
    /// Bumped by `connect()` and `disconnect()`; background work tagged
    /// with an older epoch is stale and must not touch the state.
    epoch: u64,
    outbound: Option<mpsc::UnboundedSender<SessionCommand>>,
    /// Cancels the open attempt in flight, if any.
    opening: Option<CancellationToken>,
    session: Option<JoinHandle<()>>,
    pending_reconnect: Option<JoinHandle<()>>,
}

impl RealtimeChannelClient {
    /// Create a client that speaks WebSocket. Nothing is opened until
    /// [`connect`](Self::connect) is called.
    pub fn new(config: RealtimeConfig) -> Self {
        Self::with_connector(config, WsConnector)
    }

    /// Create a client over a custom transport.
    pub fn with_connector(config: RealtimeConfig, connector: impl Connector) -> Self {
        let backoff = config.backoff();
        Self {
            inner: Arc::new(Inner {
                config,
                connector: Arc::new(connector),
                registry: Arc::new(SubscriberRegistry::new()),
                state: Mutex::new(SessionState {
                    connection: ConnectionState::Disconnected,
                    backoff,
                    epoch: 0,
                    outbound: None,
                    opening: None,
                    session: None,
                    pending_reconnect: None,
                }),
                open_gate: tokio::sync::Mutex::new(()),
                offline: watch::channel(false).0,
            }),
        }
    }

    /// Open the transport.
    ///
    /// No-op when already connected. Fails with
    /// [`RealtimeError::ConnectInProgress`] while another attempt is in
    /// flight. A failure here does not start the reconnect loop.
    pub async fn connect(&self) -> Result<(), RealtimeError> {
        let epoch = {
            let mut state = self.inner.lock_state();
            match state.connection {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Connecting => return Err(RealtimeError::ConnectInProgress),
                ConnectionState::Disconnected => {}
            }
            if let Some(pending) = state.pending_reconnect.take() {
                pending.abort();
            }
            state.epoch += 1;
            state.connection = ConnectionState::Connecting;
            state.epoch
        };
        self.inner.offline.send_replace(false);
        self.inner.open(epoch).await
    }

    /// Register `callback` for messages tagged `topic` (`"*"` for all).
    pub fn subscribe<F>(&self, topic: impl Into<Topic>, callback: F) -> Subscription
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let topic = topic.into();
        let id = self.inner.registry.add(topic.clone(), callback);
        debug!(topic = %topic, "Subscriber registered");
        Subscription::new(id, topic, &self.inner.registry)
    }

    /// Fire-and-forget send.
    ///
    /// Returns `true` if the message was handed to the live connection and
    /// `false` if it was dropped because the connection is not open.
    pub fn send(&self, message: &Message) -> bool {
        let state = self.inner.lock_state();
        let outbound = match (&state.connection, &state.outbound) {
            (ConnectionState::Connected, Some(outbound)) => outbound,
            _ => {
                debug!(kind = %message.kind(), "Not connected; dropping message");
                return false;
            }
        };
        match message.to_json() {
            Ok(json) => outbound.send(SessionCommand::Send(json)).is_ok(),
            Err(e) => {
                warn!(kind = %message.kind(), error = %e, "Failed to encode message");
                false
            }
        }
    }

    pub fn send_quack(&self, intensity: f64, dimension: &str) -> bool {
        self.send_built(Message::quack(intensity, dimension))
    }

    pub fn report_mole(&self, x: f64, y: f64) -> bool {
        self.send_built(Message::mole_sighting(x, y))
    }

    pub fn release_the_quacken(&self) -> bool {
        let sent = self.send_built(Message::release_quacken());
        if sent {
            warn!("QUACKEN RELEASE SIGNAL SENT");
        }
        sent
    }

    fn send_built(&self, message: Result<Message, serde_json::Error>) -> bool {
        match message {
            Ok(message) => self.send(&message),
            Err(e) => {
                warn!(error = %e, "Failed to build message");
                false
            }
        }
    }

    /// Close the connection, cancel keepalive and any scheduled
    /// reconnection, and drop every subscriber.
    pub fn disconnect(&self) {
        // The session task finishes on its own once it sees the close.
        drop(self.teardown());
    }

    /// Like [`disconnect`](Self::disconnect), but also waits until frames
    /// already queued by [`send`](Self::send) are written and the transport
    /// is closed.
    pub async fn close(&self) {
        if let Some(session) = self.teardown() {
            if let Err(e) = session.await {
                debug!(error = %e, "Session task ended abnormally");
            }
        }
    }

    /// Resolves once reconnection has been abandoned because the attempt
    /// ceiling was reached. A later successful `connect()` re-arms it.
    pub async fn wait_until_offline(&self) {
        let mut offline = self.inner.offline.subscribe();
        // The sender lives in `inner`, which `self` keeps alive.
        let _ = offline.wait_for(|gave_up| *gave_up).await;
    }

    fn teardown(&self) -> Option<JoinHandle<()>> {
        let (previous, session) = {
            let mut state = self.inner.lock_state();
            state.epoch += 1;
            if let Some(pending) = state.pending_reconnect.take() {
                pending.abort();
            }
            if let Some(opening) = state.opening.take() {
                opening.cancel();
            }
            if let Some(outbound) = state.outbound.take() {
                let _ = outbound.send(SessionCommand::Close);
            }
            let previous = std::mem::replace(&mut state.connection, ConnectionState::Disconnected);
            (previous, state.session.take())
        };
        self.inner.registry.clear();
        info!(previous = ?previous, "Disconnected from duck network");
        session
    }

    /// Whether the transport is currently open.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock_state().connection
    }

    /// Reconnection attempts made since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.lock_state().backoff.attempts()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for RealtimeChannelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeChannelClient")
            .field("url", &self.inner.config.url)
            .field("state", &self.state())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Connection lifecycle
// ---------------------------------------------------------------------------

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a link for `epoch` and start its session task.
    ///
    /// Returns [`RealtimeError::Cancelled`] if `disconnect()` runs before the
    /// link is up; a link that opens anyway is closed before returning.
    async fn open(self: &Arc<Self>, epoch: u64) -> Result<(), RealtimeError> {
        let cancel = {
            let mut state = self.lock_state();
            if state.epoch != epoch {
                return Err(RealtimeError::Cancelled);
            }
            let token = CancellationToken::new();
            state.opening = Some(token.clone());
            token
        };

        let _gate = tokio::select! {
            gate = self.open_gate.lock() => gate,
            () = cancel.cancelled() => return Err(RealtimeError::Cancelled),
        };

        let url = self.config.url.as_str();
        let timeout = self.config.connect_timeout();
        info!(url = %url, "Connecting to duck network");

        let attempt = tokio::time::timeout(timeout, self.connector.connect(url));
        let outcome = tokio::select! {
            outcome = attempt => outcome,
            () = cancel.cancelled() => {
                debug!("Connection attempt cancelled");
                return Err(RealtimeError::Cancelled);
            }
        };

        let link = match outcome {
            Ok(Ok(link)) => link,
            Ok(Err(e)) => {
                error!(error = %e, "Failed to connect to duck network");
                self.open_failed(epoch);
                return Err(e.into());
            }
            Err(_elapsed) => {
                error!(timeout = ?timeout, "Duck network connection timed out");
                self.open_failed(epoch);
                return Err(TransportError::Timeout(timeout).into());
            }
        };

        let link = {
            let mut state = self.lock_state();
            if state.epoch == epoch {
                let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
                state.backoff.reset();
                state.connection = ConnectionState::Connected;
                state.outbound = Some(outbound_tx);
                state.opening = None;

                let weak = Arc::downgrade(self);
                let registry = Arc::clone(&self.registry);
                let heartbeat = self.config.heartbeat_interval();
                state.session = Some(tokio::spawn(async move {
                    let end = session_loop(link, outbound_rx, registry, heartbeat).await;
                    if end == SessionEnd::Lost {
                        if let Some(inner) = weak.upgrade() {
                            inner.connection_lost(epoch);
                        }
                    }
                }));
                None
            } else {
                Some(link)
            }
        };

        if let Some(mut superseded) = link {
            debug!("Connection attempt superseded; closing new link");
            if let Err(e) = superseded.sink.close().await {
                debug!(error = %e, "Error while closing superseded link");
            }
            return Err(RealtimeError::Cancelled);
        }

        self.offline.send_replace(false);
        info!(url = %url, "Connected to duck network");
        Ok(())
    }

    fn open_failed(&self, epoch: u64) {
        let mut state = self.lock_state();
        if state.epoch == epoch {
            state.connection = ConnectionState::Disconnected;
            state.opening = None;
        }
    }

    /// The transport of `epoch` closed without `disconnect()`.
    fn connection_lost(self: &Arc<Self>, epoch: u64) {
        let mut state = self.lock_state();
        if state.epoch != epoch || state.connection != ConnectionState::Connected {
            return;
        }
        warn!("Duck network connection lost");
        state.connection = ConnectionState::Disconnected;
        state.outbound = None;
        state.session = None;
        self.schedule_reconnect(&mut state);
    }

    /// Schedule the next reconnection unless one is already pending or the
    /// attempt ceiling has been reached.
    fn schedule_reconnect(self: &Arc<Self>, state: &mut SessionState) {
        if state.pending_reconnect.is_some() {
            return;
        }
        let Some(delay) = state.backoff.next_delay() else {
            error!(
                attempts = state.backoff.attempts(),
                "Max reconnection attempts reached. Duck network offline."
            );
            self.offline.send_replace(true);
            return;
        };

        let attempt = state.backoff.attempts();
        info!(delay = ?delay, attempt, "Attempting to reconnect");

        let weak = Arc::downgrade(self);
        let epoch = state.epoch;
        state.pending_reconnect = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.reconnect(epoch).await;
            }
        }));
    }

    async fn reconnect(self: Arc<Self>, epoch: u64) {
        {
            let mut state = self.lock_state();
            if state.epoch != epoch || state.connection != ConnectionState::Disconnected {
                return;
            }
            // This task is the pending reconnection; clearing the slot lets
            // a failure below schedule the next one.
            state.pending_reconnect = None;
            state.connection = ConnectionState::Connecting;
        }

        match self.open(epoch).await {
            Ok(()) => info!("Reconnected to duck network"),
            Err(RealtimeError::Cancelled) => {}
            Err(e) => {
                error!(error = %e, "Reconnection failed");
                let mut state = self.lock_state();
                if state.epoch == epoch {
                    self.schedule_reconnect(&mut state);
                }
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = state.pending_reconnect.take() {
            pending.abort();
        }
        if let Some(opening) = state.opening.take() {
            opening.cancel();
        }
    }
}

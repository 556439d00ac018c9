//! In-memory [`Connector`] for exercising the client without a network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{sink, stream};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::TransportError;
use crate::transport::{Connector, Inbound, Outbound, TransportLink};

type PeerTx = mpsc::UnboundedSender<Result<Inbound, TransportError>>;

/// Scripted result of one `connect` call.
#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    Accept,
    Refuse,
    /// Accept after the given delay.
    AcceptAfter(Duration),
    /// Never resolves; exercises the connect timeout.
    Hang,
}

#[derive(Default)]
struct FakeState {
    script: VecDeque<Outcome>,
    connects: Vec<Instant>,
    in_flight: usize,
    max_in_flight: usize,
    links: usize,
    peer: Option<PeerTx>,
}

/// Marks one connect call as pending until dropped, including when the
/// caller abandons the call.
struct Pending(Arc<Mutex<FakeState>>);

impl Pending {
    fn start(state: &Arc<Mutex<FakeState>>) -> Self {
        let mut guard = state.lock().unwrap();
        guard.in_flight += 1;
        guard.max_in_flight = guard.max_in_flight.max(guard.in_flight);
        Self(Arc::clone(state))
    }
}

impl Drop for Pending {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.lock() {
            state.in_flight -= 1;
        }
    }
}

/// Records every connect call and every frame written. Unscripted connect
/// calls are accepted.
#[derive(Clone, Default)]
pub(crate) struct FakeConnector {
    state: Arc<Mutex<FakeState>>,
    writes: Arc<Mutex<Vec<String>>>,
}

impl FakeConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(&self, outcomes: impl IntoIterator<Item = Outcome>) {
        self.state.lock().unwrap().script.extend(outcomes);
    }

    pub(crate) fn refuse_next(&self, count: usize) {
        self.script(std::iter::repeat(Outcome::Refuse).take(count));
    }

    pub(crate) fn connect_times(&self) -> Vec<Instant> {
        self.state.lock().unwrap().connects.clone()
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.state.lock().unwrap().connects.len()
    }

    /// Connect calls that have not yet returned or been abandoned.
    pub(crate) fn in_flight(&self) -> usize {
        self.state.lock().unwrap().in_flight
    }

    /// Most connect calls ever pending at the same time.
    pub(crate) fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    /// Connect calls that produced a link.
    pub(crate) fn links_opened(&self) -> usize {
        self.state.lock().unwrap().links
    }

    pub(crate) fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    /// Parsed `type` of every written frame.
    pub(crate) fn written_kinds(&self) -> Vec<String> {
        self.writes()
            .iter()
            .map(|raw| {
                let value: serde_json::Value = serde_json::from_str(raw).unwrap();
                value["type"].as_str().unwrap().to_string()
            })
            .collect()
    }

    fn peer(&self) -> PeerTx {
        self.state
            .lock()
            .unwrap()
            .peer
            .clone()
            .expect("no open link")
    }

    /// Deliver a text frame on the most recent link.
    pub(crate) fn push_text(&self, text: &str) {
        let _ = self.peer().send(Ok(Inbound::Text(text.to_string())));
    }

    pub(crate) fn push_error(&self, error: TransportError) {
        let _ = self.peer().send(Err(error));
    }

    pub(crate) fn push_close(&self) {
        let _ = self.peer().send(Ok(Inbound::Close));
    }

    /// End the inbound stream of the most recent link, as a dropped socket would.
    pub(crate) fn drop_link(&self) {
        self.state.lock().unwrap().peer = None;
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _url: &str) -> Result<TransportLink, TransportError> {
        let outcome = {
            let mut state = self.state.lock().unwrap();
            state.connects.push(Instant::now());
            state.script.pop_front().unwrap_or(Outcome::Accept)
        };
        let _pending = Pending::start(&self.state);

        match outcome {
            Outcome::Accept => {}
            Outcome::AcceptAfter(delay) => tokio::time::sleep(delay).await,
            Outcome::Refuse => return Err(TransportError::Connect("connection refused".into())),
            Outcome::Hang => std::future::pending::<()>().await,
        }

        let (peer_tx, peer_rx) = mpsc::unbounded_channel();
        {
            let mut state = self.state.lock().unwrap();
            state.peer = Some(peer_tx);
            state.links += 1;
        }

        let writes = Arc::clone(&self.writes);
        let sink = sink::unfold(writes, |writes, frame: Outbound| async move {
            let Outbound::Text(text) = frame;
            writes.lock().unwrap().push(text);
            Ok::<_, TransportError>(writes)
        });
        let stream = stream::unfold(peer_rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });

        Ok(TransportLink {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}

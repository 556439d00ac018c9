//! Session task: owns one live transport link.
//!
//! Writes queued sends, emits the keepalive ping and dispatches inbound
//! frames in arrival order until the link ends or a close is requested.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::handler::handle_inbound_text;
use crate::message::Message;
use crate::registry::SubscriberRegistry;
use crate::transport::{FrameSink, Inbound, Outbound, TransportLink};

/// Commands from the client handle to the session task.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    Send(String),
    Close,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionEnd {
    /// `disconnect()` asked for it, or the client was dropped.
    Requested,
    /// The transport went away on its own.
    Lost,
}

pub(crate) async fn session_loop(
    link: TransportLink,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    registry: Arc<SubscriberRegistry>,
    heartbeat_interval: Duration,
) -> SessionEnd {
    let TransportLink {
        mut sink,
        mut stream,
    } = link;

    let mut keepalive = tokio::time::interval_at(
        Instant::now() + heartbeat_interval,
        heartbeat_interval,
    );
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            // Commands first so a queued close beats a due keepalive.
            biased;

            command = commands.recv() => match command {
                Some(SessionCommand::Send(text)) => write_text(&mut sink, text).await,
                Some(SessionCommand::Close) | None => {
                    if let Err(e) = sink.close().await {
                        debug!(error = %e, "Error while closing duck network link");
                    }
                    return SessionEnd::Requested;
                }
            },

            frame = stream.next() => match frame {
                Some(Ok(Inbound::Text(text))) => handle_inbound_text(&text, &registry),
                Some(Ok(Inbound::Close)) => {
                    info!("Duck network closed the connection");
                    return SessionEnd::Lost;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "WebSocket error");
                }
                None => {
                    info!("Duck network connection ended");
                    return SessionEnd::Lost;
                }
            },

            _ = keepalive.tick() => match Message::ping().to_json() {
                Ok(json) => write_text(&mut sink, json).await,
                Err(e) => warn!(error = %e, "Failed to encode keepalive ping"),
            },
        }
    }
}

async fn write_text(sink: &mut FrameSink, text: String) {
    if let Err(e) = sink.send(Outbound::Text(text)).await {
        warn!(error = %e, "Failed to write to duck network");
    }
}

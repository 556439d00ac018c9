//! Transport seam between the client and the wire.
//!
//! A [`Connector`] opens one full-duplex text link. The production
//! implementation is [`WsConnector`] over `tokio-tungstenite`; tests swap in
//! an in-memory connector.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{future, Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tracing::debug;

use crate::error::TransportError;

/// A frame written to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
}

/// A frame read from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    /// The peer closed the connection.
    Close,
}

pub type FrameSink = Pin<Box<dyn Sink<Outbound, Error = TransportError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Inbound, TransportError>> + Send>>;

/// Both halves of one open connection. The stream ending means the
/// connection is gone.
pub struct TransportLink {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

/// Opens transport links.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<TransportLink, TransportError>;
}

// ---------------------------------------------------------------------------
// WebSocket
// ---------------------------------------------------------------------------

/// [`Connector`] backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<TransportLink, TransportError> {
        let (ws_stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let (ws_write, ws_read) = ws_stream.split();
        let sink = ws_write
            .sink_map_err(TransportError::from)
            .with(|frame: Outbound| future::ready(Ok::<_, TransportError>(to_ws_message(frame))));
        let stream = ws_read.filter_map(|frame| future::ready(translate_frame(frame)));

        Ok(TransportLink {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}

fn to_ws_message(frame: Outbound) -> WsMessage {
    match frame {
        Outbound::Text(text) => WsMessage::Text(text.into()),
    }
}

/// Map a tungstenite frame to an [`Inbound`]; control frames are dropped
/// since tungstenite answers pings itself.
fn translate_frame(
    frame: Result<WsMessage, tungstenite::Error>,
) -> Option<Result<Inbound, TransportError>> {
    match frame {
        Ok(WsMessage::Text(text)) => Some(Ok(Inbound::Text(text.to_string()))),
        Ok(WsMessage::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Some(Ok(Inbound::Text(text))),
            Err(_) => {
                debug!(len = bytes.len(), "Ignoring non-UTF-8 binary frame");
                None
            }
        },
        Ok(WsMessage::Close(_)) => Some(Ok(Inbound::Close)),
        Ok(_) => None,
        Err(e) => Some(Err(e.into())),
    }
}

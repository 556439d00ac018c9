use std::time::Duration;

use tokio_tungstenite::tungstenite;

/// Failures reported by a [`Connector`](crate::Connector) or a live link.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("connection timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Io(String),

    #[error("transport closed")]
    Closed,
}

impl From<tungstenite::Error> for TransportError {
    fn from(e: tungstenite::Error) -> Self {
        match e {
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                TransportError::Closed
            }
            other => TransportError::Io(other.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("a connection attempt is already in progress")]
    ConnectInProgress,

    #[error("connection attempt cancelled by disconnect")]
    Cancelled,
}

//! Reconnecting real-time client for the duck network.
//!
//! Keeps one long-lived WebSocket connection open, rebuilds it with
//! exponential backoff after unexpected closures, routes inbound messages to
//! subscribers by their `type` tag (or to wildcard subscribers), and offers a
//! fire-and-forget send API.
//!
//! ```rust,no_run
//! use quacker_realtime::{RealtimeChannelClient, RealtimeConfig};
//!
//! # async fn run() -> Result<(), quacker_realtime::RealtimeError> {
//! let client = RealtimeChannelClient::new(RealtimeConfig::default());
//! let alerts = client.subscribe("mole_alert", |msg| {
//!     println!("mole at {}", msg.data());
//! });
//! client.connect().await?;
//! client.send_quack(11.0, "superposition");
//! alerts.unsubscribe();
//! client.disconnect();
//! # Ok(())
//! # }
//! ```

mod backoff;
mod client;
mod connection;
mod error;
mod handler;
mod message;
mod registry;
mod transport;
mod types;

#[cfg(test)]
mod testing;

pub use backoff::Backoff;
pub use client::RealtimeChannelClient;
pub use error::{RealtimeError, TransportError};
pub use message::{
    Message, MessageKind, MoleSightingPayload, QuackPayload, ReleaseQuackenPayload,
    QUACKEN_AUTHORIZATION,
};
pub use registry::{SubscriberRegistry, Subscription, SubscriptionId, Topic, WILDCARD};
pub use transport::{
    Connector, FrameSink, FrameStream, Inbound, Outbound, TransportLink, WsConnector,
};
pub use types::{ConnectionState, RealtimeConfig};

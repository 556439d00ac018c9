//! Duck network message envelope and the typed payloads this client sends.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Authorization marker carried by `release_quacken` requests.
pub const QUACKEN_AUTHORIZATION: &str = "emergency_protocol";

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ---------------------------------------------------------------------------
// Message kinds
// ---------------------------------------------------------------------------

/// The `type` tag of a duck network message.
///
/// Unknown tags are preserved in [`MessageKind::Other`] so they still route
/// to subscribers registered under the same literal string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    Quack,
    MoleAlert,
    Entanglement,
    PondUpdate,
    Emergency,
    Ping,
    MoleSighting,
    ReleaseQuacken,
    Other(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Quack => "quack",
            MessageKind::MoleAlert => "mole_alert",
            MessageKind::Entanglement => "entanglement",
            MessageKind::PondUpdate => "pond_update",
            MessageKind::Emergency => "emergency",
            MessageKind::Ping => "ping",
            MessageKind::MoleSighting => "mole_sighting",
            MessageKind::ReleaseQuacken => "release_quacken",
            MessageKind::Other(tag) => tag,
        }
    }
}

impl From<&str> for MessageKind {
    fn from(tag: &str) -> Self {
        match tag {
            "quack" => MessageKind::Quack,
            "mole_alert" => MessageKind::MoleAlert,
            "entanglement" => MessageKind::Entanglement,
            "pond_update" => MessageKind::PondUpdate,
            "emergency" => MessageKind::Emergency,
            "ping" => MessageKind::Ping,
            "mole_sighting" => MessageKind::MoleSighting,
            "release_quacken" => MessageKind::ReleaseQuacken,
            other => MessageKind::Other(other.to_string()),
        }
    }
}

impl From<String> for MessageKind {
    fn from(tag: String) -> Self {
        match MessageKind::from(tag.as_str()) {
            MessageKind::Other(_) => MessageKind::Other(tag),
            known => known,
        }
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// An immutable duck network message.
///
/// Wire format: `{"type": "...", "data": ..., "timestamp": <epoch ms>}`.
/// `data` is omitted when null; a missing `timestamp` on an inbound record
/// is filled with the receipt time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    kind: MessageKind,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    data: serde_json::Value,
    #[serde(default = "now_millis")]
    timestamp: i64,
}

impl Message {
    /// Build a message stamped with the current time.
    pub fn new(kind: impl Into<MessageKind>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
            timestamp: now_millis(),
        }
    }

    /// Build a message whose `data` is the serialized `payload`.
    pub fn with_payload<T: Serialize>(
        kind: impl Into<MessageKind>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(kind, serde_json::to_value(payload)?))
    }

    /// Keepalive message; carries a timestamp only.
    pub fn ping() -> Self {
        Self::new(MessageKind::Ping, serde_json::Value::Null)
    }

    pub fn quack(intensity: f64, dimension: &str) -> Result<Self, serde_json::Error> {
        let payload = QuackPayload {
            intensity,
            dimension: dimension.to_string(),
            timestamp: now_millis(),
        };
        Self::with_payload(MessageKind::Quack, &payload)
    }

    pub fn mole_sighting(x: f64, y: f64) -> Result<Self, serde_json::Error> {
        let payload = MoleSightingPayload {
            x,
            y,
            timestamp: now_millis(),
        };
        Self::with_payload(MessageKind::MoleSighting, &payload)
    }

    pub fn release_quacken() -> Result<Self, serde_json::Error> {
        let payload = ReleaseQuackenPayload {
            authorization: QUACKEN_AUTHORIZATION.to_string(),
            timestamp: now_millis(),
        };
        Self::with_payload(MessageKind::ReleaseQuacken, &payload)
    }

    /// Parse one inbound text frame.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    /// Creation time in epoch milliseconds.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Decode `data` into a typed payload.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

// ---------------------------------------------------------------------------
// Outbound payloads
// ---------------------------------------------------------------------------

/// Payload of a `quack`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuackPayload {
    pub intensity: f64,
    pub dimension: String,
    pub timestamp: i64,
}

/// Payload of a `mole_sighting`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoleSightingPayload {
    pub x: f64,
    pub y: f64,
    pub timestamp: i64,
}

/// Payload of a `release_quacken` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseQuackenPayload {
    pub authorization: String,
    pub timestamp: i64,
}

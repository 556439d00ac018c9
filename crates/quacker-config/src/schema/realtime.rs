use serde::{Deserialize, Serialize};

/// Connection settings for the duck network WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeSection {
    /// WebSocket URL of the duck network.
    pub url: String,
    /// Keepalive ping interval in seconds (valid range: 1-3600).
    pub heartbeat_interval_secs: u32,
    /// Delay before the first reconnection attempt, doubled per attempt.
    pub reconnect_base_delay_ms: u32,
    /// Reconnection attempts before giving up (0 disables reconnecting).
    pub max_reconnect_attempts: u32,
    pub connect_timeout_secs: u32,
}

impl Default for RealtimeSection {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/ws".into(),
            heartbeat_interval_secs: 30,
            reconnect_base_delay_ms: 1000,
            max_reconnect_attempts: 5,
            connect_timeout_secs: 15,
        }
    }
}

//! Client configuration and connection state.

use std::time::Duration;

use crate::backoff::Backoff;

/// Configuration for connecting to the duck network.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// WebSocket endpoint.
    pub url: String,
    /// Keepalive ping interval in seconds (default: 30).
    pub heartbeat_interval_secs: u64,
    /// Delay before the first reconnection attempt, doubled per attempt.
    pub reconnect_base_delay_ms: u64,
    /// Reconnection attempts after an unexpected closure before giving up.
    pub max_reconnect_attempts: u32,
    /// Upper bound on a single open attempt.
    pub connect_timeout_secs: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/ws".to_string(),
            heartbeat_interval_secs: 30,
            reconnect_base_delay_ms: 1000,
            max_reconnect_attempts: 5,
            connect_timeout_secs: 15,
        }
    }
}

impl RealtimeConfig {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub(crate) fn heartbeat_interval(&self) -> Duration {
        // A zero period would make `tokio::time::interval_at` panic.
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    pub(crate) fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub(crate) fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.reconnect_base_delay_ms),
            self.max_reconnect_attempts,
        )
    }
}

/// Lifecycle of the single logical connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

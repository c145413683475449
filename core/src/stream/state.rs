use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Connectivity of a stream client
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// Observable snapshot of a stream client
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamStatus {
    pub state: ConnectionState,
    /// Retries consumed since the last successful connect
    pub attempt: u32,
    /// Delay of the pending retry, if one is scheduled
    pub next_retry: Option<Duration>,
    /// Budget spent; no further automatic attempts
    pub exhausted: bool,
    pub messages_received: u64,
    pub decode_failures: u64,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl Default for StreamStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempt: 0,
            next_retry: None,
            exhausted: false,
            messages_received: 0,
            decode_failures: 0,
            last_message_at: None,
        }
    }
}

impl StreamStatus {
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Disconnected with a retry pending
    pub fn is_retrying(&self) -> bool {
        self.state == ConnectionState::Disconnected && self.next_retry.is_some()
    }
}

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Copy, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Closed
    }
}

/// Broadcast by the connection manager as the link comes and goes.
#[derive(Serialize, Deserialize, Copy, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connecting,
    Connected,
    Disconnected,
    ReconnectScheduled { delay_ms: u64 },
}

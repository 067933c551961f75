//! Serial link lifecycle.

use std::fmt;

/// Connection state of the serial device.
///
/// ```text
/// Disconnected ──open──> Connecting ──ok──> Connected
///      ^                     │                  │
///      └──────── error ──────┴───── error ──────┘
/// ```
///
/// There is no automatic edge back to `Connecting`: a new connection attempt
/// only happens through an explicit restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(text)
    }
}

/// What the serial reader publishes to the presentation context.
///
/// `ever_connected` latches once the port opened successfully, so an
/// observer that only samples the latest value still learns that a session
/// existed even if `Connected` was overwritten before it looked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub ever_connected: bool,
}

impl ConnectionStatus {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            state,
            ever_connected: state.is_connected(),
        }
    }

    /// Moves to `state`, keeping the `ever_connected` latch.
    pub fn with_state(self, state: ConnectionState) -> Self {
        Self {
            state,
            ever_connected: self.ever_connected || state.is_connected(),
        }
    }

    /// True when a session existed and has since been lost.
    pub fn is_lost(self) -> bool {
        self.ever_connected && self.state == ConnectionState::Disconnected
    }
}

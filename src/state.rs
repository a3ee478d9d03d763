//! Connection state tracking for MQTT adapters.
//!
//! Every backend reports its lifecycle through the same three-state machine:
//!
//! ```text
//! Disconnected ──(connect)──> Connecting ──(CONNACK)──> Connected
//!       ▲                          │                        │
//!       └──────(connect failed)────┴──(disconnect | loss)───┘
//! ```
//!
//! The state is owned by the adapter's event dispatcher and doubles as the
//! de-duplication guard for callback delivery: a connect or disconnect
//! callback fires only when the state actually transitions.

use std::fmt;

/// Current state of an adapter's broker connection.
///
/// Unlike the vendor clients, which blur "not yet connected" and
/// "connection in progress", the handshake window is modeled explicitly so
/// a failed connect can report the disconnect callback exactly once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No broker connection exists. Initial state, and the state after any
    /// disconnect, whether requested or suffered.
    #[default]
    Disconnected,

    /// A connect call is in flight; the transport is up or being set up but
    /// the broker has not yet accepted the session.
    Connecting,

    /// The broker accepted the session. Subscribes and publishes are
    /// expected to succeed in this state.
    Connected,
}

impl ConnectionState {
    /// Short static identifier, for logs and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
        }
    }

    /// True only while the broker session is established.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

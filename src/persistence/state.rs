//! Database connection state machine.
//!
//! # State Transitions
//! ```text
//! Disconnected → Connecting: connector invoked
//! Connecting   → Connected:  first round-trip succeeded
//! Connecting   → Failed:     unreachable, rejected or timed out
//! ```
//!
//! `Failed` is terminal. There is no retry loop at this layer; the driver
//! supervises the pool once connected.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Failed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            3 => ConnectionState::Failed,
            _ => ConnectionState::Disconnected,
        }
    }

    fn predecessor(self) -> Option<ConnectionState> {
        match self {
            ConnectionState::Disconnected => None,
            ConnectionState::Connecting => Some(ConnectionState::Disconnected),
            ConnectionState::Connected | ConnectionState::Failed => Some(ConnectionState::Connecting),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        }
    }
}

/// Shared, lock-free holder of the current [`ConnectionState`].
#[derive(Debug)]
pub struct ConnectionMonitor {
    state: AtomicU8,
}

impl ConnectionMonitor {
    /// Create a monitor in `Disconnected`.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
        }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Move to `next` if the current state is its only legal predecessor.
    ///
    /// Returns false (and leaves the state alone) for any other transition.
    pub fn transition(&self, next: ConnectionState) -> bool {
        let Some(from) = next.predecessor() else {
            return false;
        };

        let moved = self
            .state
            .compare_exchange(from as u8, next as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if moved {
            tracing::debug!(from = from.as_str(), to = next.as_str(), "Connection state changed");
        }
        moved
    }
}

impl Default for ConnectionMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let monitor = ConnectionMonitor::new();
        assert_eq!(monitor.state(), ConnectionState::Disconnected);

        assert!(monitor.transition(ConnectionState::Connecting));
        assert!(monitor.transition(ConnectionState::Connected));
        assert!(monitor.is_connected());
    }

    #[test]
    fn test_failed_is_terminal() {
        let monitor = ConnectionMonitor::new();
        assert!(monitor.transition(ConnectionState::Connecting));
        assert!(monitor.transition(ConnectionState::Failed));

        assert!(!monitor.transition(ConnectionState::Connecting));
        assert!(!monitor.transition(ConnectionState::Connected));
        assert!(!monitor.transition(ConnectionState::Disconnected));
        assert_eq!(monitor.state(), ConnectionState::Failed);
    }

    #[test]
    fn test_cannot_skip_connecting() {
        let monitor = ConnectionMonitor::new();
        assert!(!monitor.transition(ConnectionState::Connected));
        assert!(!monitor.transition(ConnectionState::Failed));
        assert_eq!(monitor.state(), ConnectionState::Disconnected);
    }
}

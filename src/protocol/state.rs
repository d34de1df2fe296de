//! Connection state machine states.
//!
//! # Transitions
//!
//! ```text
//!   Idle / Closed / Failed ──start()──► Connecting ──open──► Connected
//!                                        ▲     │                │
//!                                  timer │     │ error          │ error
//!                                        │     ▼                │
//!                                     Reconnecting ◄────────────┘
//!                                           │ budget spent
//!                                           ▼
//!                                         Failed
//!
//!   any ──stop()──► Closed
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;

// ============================================================================
// ConnectionState
// ============================================================================

/// Current state of a connection manager.
///
/// Exactly one value is current at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ConnectionState {
    /// Never started.
    #[default]
    Idle,
    /// A transport has been opened and has not reported yet.
    Connecting,
    /// The transport reported open and is streaming.
    Connected,
    /// Waiting for the retry timer after a transport error.
    Reconnecting,
    /// Retry budget exhausted. Needs an explicit `start`.
    Failed,
    /// Stopped by the owner.
    Closed,
}

impl ConnectionState {
    /// Returns `true` if `start` is accepted from this state.
    #[inline]
    #[must_use]
    pub const fn can_start(self) -> bool {
        matches!(self, Self::Idle | Self::Closed | Self::Failed)
    }

    /// Returns `true` while a transport is open or a retry is pending.
    #[inline]
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected | Self::Reconnecting)
    }

    /// Returns `true` if the stream is delivering data.
    #[inline]
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns the state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Reconnecting => "Reconnecting",
            Self::Failed => "Failed",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(ConnectionState::default(), ConnectionState::Idle);
    }

    #[test]
    fn test_can_start() {
        assert!(ConnectionState::Idle.can_start());
        assert!(ConnectionState::Closed.can_start());
        assert!(ConnectionState::Failed.can_start());
        assert!(!ConnectionState::Connecting.can_start());
        assert!(!ConnectionState::Connected.can_start());
        assert!(!ConnectionState::Reconnecting.can_start());
    }

    #[test]
    fn test_active_states_cannot_start() {
        for state in [
            ConnectionState::Idle,
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Reconnecting,
            ConnectionState::Failed,
            ConnectionState::Closed,
        ] {
            assert_ne!(state.is_active(), state.can_start(), "{state}");
        }
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&ConnectionState::Reconnecting).unwrap();
        assert_eq!(json, "\"Reconnecting\"");
    }
}

//! Stream protocol types.
//!
//! This module defines what the connection manager reports to its
//! subscriber and the states it moves through.
//!
//! # Notification Overview
//!
//! | Notification | Meaning |
//! |--------------|---------|
//! | `Status` | Human-readable connectivity update |
//! | `Data` | One event payload from the stream |
//! | `TerminalError` | Retry budget exhausted, no further recovery |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `notification` | Notification type and status texts |
//! | `state` | Connection state machine states |

// ============================================================================
// Submodules
// ============================================================================

/// Notification type and status texts.
pub mod notification;

/// Connection states.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use notification::{
    Notification, STATUS_CONNECTED, STATUS_RETRIES_EXHAUSTED, format_delay,
};
pub use state::ConnectionState;

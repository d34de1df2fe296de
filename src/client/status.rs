//! Connection status board.
//!
//! [`StatusBoard`] is a ready-made subscriber for applications that render
//! connectivity: a status line, the last received message and whether the
//! message pop-up is showing.
//!
//! | Notification | Status line | Message |
//! |--------------|-------------|---------|
//! | (initial) | `Connecting...` | none |
//! | `Status(text)` | `text` | unchanged |
//! | `Data(payload)` | `Connected (Message Received)` | `payload`, shown |
//! | `TerminalError(reason)` | `Error: reason` | unchanged |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::protocol::Notification;
use crate::stream::NotificationHandler;

// ============================================================================
// Constants
// ============================================================================

/// Status line before anything was received.
pub const STATUS_INITIAL: &str = "Connecting...";

/// Status line after a data payload.
pub const STATUS_MESSAGE_RECEIVED: &str = "Connected (Message Received)";

// ============================================================================
// StatusView
// ============================================================================

/// Snapshot of a [`StatusBoard`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    /// Connectivity status line.
    pub connection_status: String,
    /// Last data payload.
    pub message: Option<String>,
    /// Whether the message pop-up is showing.
    pub visible: bool,
}

impl Default for StatusView {
    fn default() -> Self {
        Self {
            connection_status: STATUS_INITIAL.to_string(),
            message: None,
            visible: false,
        }
    }
}

impl StatusView {
    /// Applies one notification.
    pub fn apply(&mut self, notification: &Notification) {
        match notification {
            Notification::Status(text) => {
                self.connection_status.clone_from(text);
            }
            Notification::Data(payload) => {
                self.message = Some(payload.clone());
                self.visible = true;
                self.connection_status = STATUS_MESSAGE_RECEIVED.to_string();
            }
            Notification::TerminalError(reason) => {
                self.connection_status = format!("Error: {reason}");
            }
        }
    }
}

// ============================================================================
// StatusBoard
// ============================================================================

/// Shared, subscriber-fed connectivity view.
///
/// Clones share the same view.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    view: Arc<Mutex<StatusView>>,
}

impl StatusBoard {
    /// Creates a board in its initial state.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a subscriber handler that feeds this board.
    #[must_use]
    pub fn handler(&self) -> NotificationHandler {
        let board = self.clone();
        Box::new(move |notification| board.apply(&notification))
    }

    /// Applies one notification.
    pub fn apply(&self, notification: &Notification) {
        self.view.lock().apply(notification);
    }

    /// Hides the message pop-up. The message itself is kept.
    pub fn dismiss(&self) {
        self.view.lock().visible = false;
    }

    /// Returns the status line.
    #[must_use]
    pub fn connection_status(&self) -> String {
        self.view.lock().connection_status.clone()
    }

    /// Returns the last data payload.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.view.lock().message.clone()
    }

    /// Returns `true` while the message pop-up is showing.
    #[inline]
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.view.lock().visible
    }

    /// Returns a copy of the whole view.
    #[must_use]
    pub fn snapshot(&self) -> StatusView {
        self.view.lock().clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

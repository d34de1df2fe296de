//! Notifications delivered to the subscriber.
//!
//! # Format
//!
//! Notifications serialize in the shape push front-ends consume:
//!
//! ```json
//! { "type": "status", "data": "Connected" }
//! { "type": "data",   "data": "hello" }
//! { "type": "error",  "data": "Retry budget exhausted after 10 attempts: ..." }
//! ```
//!
//! # Status Texts
//!
//! | Situation | Text |
//! |-----------|------|
//! | Transport opened | `Connected` |
//! | Retry scheduled | `Reconnecting in 1s… (attempt 1/10)` |
//! | Budget exhausted | `Connection failed. Max retries reached.` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Status text emitted when a transport opens.
pub const STATUS_CONNECTED: &str = "Connected";

/// Status text emitted when the retry budget is exhausted.
pub const STATUS_RETRIES_EXHAUSTED: &str = "Connection failed. Max retries reached.";

// ============================================================================
// Notification
// ============================================================================

/// A notification produced by the connection manager.
///
/// Each occurrence is delivered to the subscriber at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Notification {
    /// Human-readable connectivity status.
    Status(String),
    /// One event payload from the stream.
    Data(String),
    /// Terminal failure; no automatic recovery follows.
    #[serde(rename = "error")]
    TerminalError(String),
}

// ============================================================================
// Constructors
// ============================================================================

impl Notification {
    /// Creates a status notification.
    #[inline]
    #[must_use]
    pub fn status(text: impl Into<String>) -> Self {
        Self::Status(text.into())
    }

    /// Creates a data notification.
    #[inline]
    #[must_use]
    pub fn data(payload: impl Into<String>) -> Self {
        Self::Data(payload.into())
    }

    /// Creates a terminal error notification.
    #[inline]
    #[must_use]
    pub fn terminal_error(reason: impl Into<String>) -> Self {
        Self::TerminalError(reason.into())
    }

    /// `Status("Connected")`.
    #[inline]
    #[must_use]
    pub fn connected() -> Self {
        Self::status(STATUS_CONNECTED)
    }

    /// Status announcing a scheduled retry.
    ///
    /// `attempt` is the internal zero-based counter before the retry
    /// increments it; the text shows `attempt + 1`.
    #[must_use]
    pub fn reconnecting(delay: Duration, attempt: u32, max_attempts: u32) -> Self {
        Self::Status(format!(
            "Reconnecting in {}… (attempt {}/{})",
            format_delay(delay),
            attempt.saturating_add(1),
            max_attempts
        ))
    }

    /// `Status("Connection failed. Max retries reached.")`.
    #[inline]
    #[must_use]
    pub fn retries_exhausted() -> Self {
        Self::status(STATUS_RETRIES_EXHAUSTED)
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl Notification {
    /// Returns the wire tag (`status`, `data` or `error`).
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Data(_) => "data",
            Self::TerminalError(_) => "error",
        }
    }

    /// Returns the carried text.
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Status(text) | Self::Data(text) | Self::TerminalError(text) => text,
        }
    }

    /// Returns `true` for [`Notification::TerminalError`].
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TerminalError(_))
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind(), self.text())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Renders a delay as seconds in its shortest decimal form (`1s`, `0.5s`).
#[must_use]
pub fn format_delay(delay: Duration) -> String {
    format!("{}s", delay.as_secs_f64())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_text() {
        assert_eq!(Notification::connected(), Notification::status("Connected"));
    }

    #[test]
    fn test_reconnecting_text() {
        let n = Notification::reconnecting(Duration::from_millis(1000), 0, 10);
        assert_eq!(n.text(), "Reconnecting in 1s… (attempt 1/10)");

        let n = Notification::reconnecting(Duration::from_millis(512_000), 9, 10);
        assert_eq!(n.text(), "Reconnecting in 512s… (attempt 10/10)");
    }

    #[test]
    fn test_format_delay_fractional() {
        assert_eq!(format_delay(Duration::from_millis(500)), "0.5s");
        assert_eq!(format_delay(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_delay(Duration::from_secs(2)), "2s");
    }

    #[test]
    fn test_serialize_shape() {
        let json = serde_json::to_string(&Notification::data("hello")).unwrap();
        assert_eq!(json, r#"{"type":"data","data":"hello"}"#);

        let json = serde_json::to_string(&Notification::terminal_error("gone")).unwrap();
        assert_eq!(json, r#"{"type":"error","data":"gone"}"#);
    }

    #[test]
    fn test_deserialize_status() {
        let n: Notification =
            serde_json::from_str(r#"{"type":"status","data":"Connected"}"#).unwrap();
        assert_eq!(n, Notification::connected());
    }

    #[test]
    fn test_display_and_kind() {
        let n = Notification::retries_exhausted();
        assert_eq!(n.kind(), "status");
        assert_eq!(n.to_string(), "[status] Connection failed. Max retries reached.");
        assert!(!n.is_terminal());
        assert!(Notification::terminal_error("x").is_terminal());
    }
}

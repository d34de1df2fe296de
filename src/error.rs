//! Error types for pushstream.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use pushstream::{Result, StreamClient};
//!
//! fn example(client: &StreamClient) -> Result<()> {
//!     let subscription = client.subscribe(|notification| println!("{notification}"))?;
//!     subscription.cancel();
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidUrl`] |
//! | State | [`Error::AlreadyStarted`], [`Error::NotStarted`] |
//! | Connection | [`Error::Transport`], [`Error::RetryBudgetExhausted`] |
//! | External | [`Error::Json`], [`Error::Url`], [`Error::Runtime`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio::runtime::TryCurrentError;

use crate::protocol::ConnectionState;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when stream options fail validation.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Stream URL is not usable.
    ///
    /// Returned when the URL parses but has an unsupported scheme.
    #[error("Invalid stream URL {url}: {message}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    // ========================================================================
    // State Errors
    // ========================================================================
    /// `start` called while the manager is already active.
    ///
    /// The existing connection is left untouched.
    #[error("Stream already started (state: {state})")]
    AlreadyStarted {
        /// State the manager was in when `start` was rejected.
        state: ConnectionState,
    },

    /// `restart` called on a manager that was never started.
    #[error("Stream was never started")]
    NotStarted,

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Transport reported a connection error.
    ///
    /// Every transport error is transient until the retry budget runs out.
    #[error("Connection error: {info}")]
    Transport {
        /// Error description supplied by the transport.
        info: String,
    },

    /// Retry budget exhausted.
    ///
    /// Terminal: the manager stays `Failed` until started again.
    #[error("Retry budget exhausted after {attempts} attempts: {last_error}")]
    RetryBudgetExhausted {
        /// Number of retries that were spent.
        attempts: u32,
        /// Error reported by the last failing connection.
        last_error: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// No Tokio runtime to spawn the event loop on.
    #[error("Runtime error: {0}")]
    Runtime(#[from] TryCurrentError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid URL error.
    #[inline]
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates an already started error.
    #[inline]
    pub fn already_started(state: ConnectionState) -> Self {
        Self::AlreadyStarted { state }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(info: impl Into<String>) -> Self {
        Self::Transport { info: info.into() }
    }

    /// Creates a retry budget exhausted error.
    #[inline]
    pub fn retry_budget_exhausted(attempts: u32, last_error: impl Into<String>) -> Self {
        Self::RetryBudgetExhausted {
            attempts,
            last_error: last_error.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a configuration error.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::InvalidUrl { .. } | Self::Json(_) | Self::Url(_)
        )
    }

    /// Returns `true` if the operation was rejected because of the current state.
    #[inline]
    #[must_use]
    pub fn is_state_error(&self) -> bool {
        matches!(self, Self::AlreadyStarted { .. } | Self::NotStarted)
    }

    /// Returns `true` if no automatic recovery follows this error.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RetryBudgetExhausted { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

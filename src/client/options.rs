//! Stream client configuration.
//!
//! All values are fixed when the client is built.
//!
//! | Field | JSON key | Default |
//! |-------|----------|---------|
//! | `url` | `url` | required |
//! | `base_delay_ms` | `baseDelayMs` | 1000 |
//! | `max_attempts` | `maxAttempts` | 10 |
//!
//! # Example
//!
//! ```ignore
//! use pushstream::StreamOptions;
//!
//! let options = StreamOptions::new("http://localhost:8081/api/sse")
//!     .with_base_delay_ms(500)
//!     .with_max_attempts(5);
//! options.validate()?;
//!
//! let options = StreamOptions::from_json(r#"{"url":"http://localhost:8081/api/sse"}"#)?;
//! assert_eq!(options.max_attempts, 10);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::stream::{BackoffPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, parse_stream_url};

// ============================================================================
// StreamOptions
// ============================================================================

/// Stream client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StreamOptions {
    /// Push endpoint URL.
    pub url: String,

    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,

    /// Number of retries before the stream fails.
    pub max_attempts: u32,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            base_delay_ms: DEFAULT_BASE_DELAY.as_millis() as u64,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl StreamOptions {
    /// Creates options for `url` with default retry settings.
    #[inline]
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Parses options from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the document is malformed
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl StreamOptions {
    /// Sets the push endpoint URL.
    #[inline]
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the first retry delay in milliseconds.
    #[inline]
    #[must_use]
    pub fn with_base_delay_ms(mut self, millis: u64) -> Self {
        self.base_delay_ms = millis;
        self
    }

    /// Sets the first retry delay.
    #[inline]
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the retry budget.
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl StreamOptions {
    /// Returns the first retry delay.
    #[inline]
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Returns the backoff policy these options describe.
    #[inline]
    #[must_use]
    pub fn policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.base_delay(), self.max_attempts)
    }

    /// Validates the options and returns the parsed URL.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the URL is empty or a retry setting is zero
    /// - [`Error::Url`] or [`Error::InvalidUrl`] if the URL is unusable
    pub fn validate(&self) -> Result<Url> {
        if self.url.trim().is_empty() {
            return Err(Error::config("Stream URL is required"));
        }
        if self.max_attempts == 0 {
            return Err(Error::config("max_attempts must be > 0"));
        }
        if self.base_delay_ms == 0 {
            return Err(Error::config("base_delay_ms must be > 0"));
        }
        parse_stream_url(&self.url)
    }
}

// ============================================================================
// Tests
// ============================================================================

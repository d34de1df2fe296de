//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`StreamClient`] instances.
//!
//! # Example
//!
//! ```ignore
//! use pushstream::{LoopbackTransport, StreamClient};
//!
//! let (transport, _acceptor) = LoopbackTransport::pair();
//! let client = StreamClient::builder()
//!     .url("http://localhost:8081/api/sse")
//!     .max_attempts(5)
//!     .transport(transport)
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::Transport;

use super::core::StreamClient;
use super::options::StreamOptions;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`StreamClient`] instance.
///
/// Use [`StreamClient::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct ClientBuilder {
    /// Stream options.
    options: StreamOptions,
    /// Transport collaborator.
    transport: Option<Arc<dyn Transport>>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("options", &self.options)
            .field("has_transport", &self.transport.is_some())
            .finish()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new builder with default options and no transport.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the push endpoint URL.
    ///
    /// # Arguments
    ///
    /// * `url` - http(s) URL of the stream (e.g., "http://localhost:8081/api/sse")
    #[inline]
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.options.url = url.into();
        self
    }

    /// Sets the delay before the first retry.
    #[inline]
    #[must_use]
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.options = self.options.with_base_delay(delay);
        self
    }

    /// Sets the delay before the first retry, in milliseconds.
    #[inline]
    #[must_use]
    pub fn base_delay_ms(mut self, millis: u64) -> Self {
        self.options.base_delay_ms = millis;
        self
    }

    /// Sets the retry budget.
    #[inline]
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.options.max_attempts = attempts;
        self
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: StreamOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the transport collaborator.
    #[inline]
    #[must_use]
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Sets a transport collaborator shared with other clients.
    #[inline]
    #[must_use]
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the transport is missing or an option is invalid
    /// - [`Error::Url`] or [`Error::InvalidUrl`] if the URL is unusable
    pub fn build(self) -> Result<StreamClient> {
        let url = self.options.validate()?;
        let transport = self.transport.ok_or_else(|| {
            Error::config(
                "Transport is required. Use .transport() to set it.\n\
                 Example: StreamClient::builder().transport(LoopbackTransport::pair().0)",
            )
        })?;

        Ok(StreamClient::new(self.options, url, transport))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::LoopbackTransport;

    #[test]
    fn test_new_creates_default_builder() {
        let builder = ClientBuilder::new();
        assert_eq!(builder.options, StreamOptions::default());
        assert!(builder.transport.is_none());
    }

    #[test]
    fn test_setters() {
        let builder = ClientBuilder::new()
            .url("http://localhost:8081/api/sse")
            .base_delay(Duration::from_secs(2))
            .max_attempts(4);

        assert_eq!(builder.options.url, "http://localhost:8081/api/sse");
        assert_eq!(builder.options.base_delay_ms, 2000);
        assert_eq!(builder.options.max_attempts, 4);
    }

    #[test]
    fn test_build_fails_without_transport() {
        let result = ClientBuilder::new().url("http://localhost").build();
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Transport"));
    }

    #[test]
    fn test_build_fails_without_url() {
        let (transport, _acceptor) = LoopbackTransport::pair();
        let err = ClientBuilder::new().transport(transport).build().unwrap_err();
        assert!(err.to_string().contains("URL"));
    }

    #[test]
    fn test_build_ok() {
        let (transport, _acceptor) = LoopbackTransport::pair();
        let client = ClientBuilder::new()
            .url("http://localhost:8081/api/sse")
            .base_delay_ms(500)
            .transport(transport)
            .build()
            .unwrap();

        assert_eq!(client.url().path(), "/api/sse");
        assert_eq!(client.policy().base_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_builder_is_clone() {
        let builder = ClientBuilder::new().url("http://localhost");
        let cloned = builder.clone();
        assert_eq!(builder.options, cloned.options);
    }
}

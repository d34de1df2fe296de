//! Stream client and subscriber registration.
//!
//! The [`StreamClient`] holds validated options and a transport. Each
//! subscription gets its own [`ConnectionManager`], so subscriptions never
//! share attempt counters, timers or transports.
//!
//! # Example
//!
//! ```ignore
//! use pushstream::{LoopbackTransport, StreamClient};
//!
//! # async fn example() -> pushstream::Result<()> {
//! let (transport, _acceptor) = LoopbackTransport::pair();
//! let client = StreamClient::builder()
//!     .url("http://localhost:8081/api/sse")
//!     .transport(transport)
//!     .build()?;
//!
//! let (subscription, mut notifications) = client.subscribe_stream()?;
//! while let Some(notification) = notifications.recv().await {
//!     println!("{notification}");
//! }
//! subscription.cancel();
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::info;
use url::Url;

use crate::error::Result;
use crate::protocol::Notification;
use crate::stream::{
    BackoffPolicy, ConnectionManager, NotificationHandler, Notifications, Subscription,
};
use crate::transport::Transport;

use super::builder::ClientBuilder;
use super::options::StreamOptions;
use super::status::StatusBoard;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the client.
struct ClientInner {
    /// Validated options.
    options: StreamOptions,
    /// Parsed stream URL.
    url: Url,
    /// Transport shared by every subscription.
    transport: Arc<dyn Transport>,
}

// ============================================================================
// StreamClient
// ============================================================================

/// Entry point for subscribing to a push stream.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct StreamClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for StreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamClient")
            .field("url", &self.inner.url.as_str())
            .field("base_delay_ms", &self.inner.options.base_delay_ms)
            .field("max_attempts", &self.inner.options.max_attempts)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// StreamClient - Constructor
// ============================================================================

impl StreamClient {
    /// Creates a configuration builder for the client.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client from validated parts.
    pub(crate) fn new(options: StreamOptions, url: Url, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                options,
                url,
                transport,
            }),
        }
    }
}

// ============================================================================
// StreamClient - Accessors
// ============================================================================

impl StreamClient {
    /// Returns the options the client was built with.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &StreamOptions {
        &self.inner.options
    }

    /// Returns the stream URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.inner.url
    }

    /// Returns the backoff policy.
    #[inline]
    #[must_use]
    pub fn policy(&self) -> BackoffPolicy {
        self.inner.options.policy()
    }
}

// ============================================================================
// StreamClient - Subscribe
// ============================================================================

impl StreamClient {
    /// Subscribes `handler` and starts the stream.
    ///
    /// The handler is always called from the same delivery task.
    ///
    /// # Errors
    ///
    /// - [`Error::Runtime`](crate::Error::Runtime) if called outside a Tokio runtime
    pub fn subscribe<F>(&self, handler: F) -> Result<Subscription>
    where
        F: FnMut(Notification) + Send + 'static,
    {
        self.subscribe_with(Box::new(handler))
    }

    /// Subscribes and returns the notifications as a stream.
    ///
    /// # Errors
    ///
    /// - [`Error::Runtime`](crate::Error::Runtime) if called outside a Tokio runtime
    pub fn subscribe_stream(&self) -> Result<(Subscription, Notifications)> {
        let (handler, notifications) = Notifications::channel();
        let subscription = self.subscribe_with(handler)?;
        Ok((subscription, notifications))
    }

    /// Subscribes a fresh [`StatusBoard`].
    ///
    /// # Errors
    ///
    /// - [`Error::Runtime`](crate::Error::Runtime) if called outside a Tokio runtime
    pub fn subscribe_status(&self) -> Result<(Subscription, StatusBoard)> {
        let board = StatusBoard::new();
        let subscription = self.subscribe_with(board.handler())?;
        Ok((subscription, board))
    }

    fn subscribe_with(&self, handler: NotificationHandler) -> Result<Subscription> {
        let manager = ConnectionManager::new(
            self.policy(),
            Arc::clone(&self.inner.transport),
            handler,
        )?;
        manager.start(self.inner.url.as_str())?;

        let subscription = Subscription::new(manager);
        info!(subscription = %subscription.id(), url = %self.inner.url, "Subscribed");
        Ok(subscription)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::ConnectionState;
    use crate::transport::LoopbackTransport;

    fn client() -> (StreamClient, crate::transport::LoopbackAcceptor) {
        let (transport, acceptor) = LoopbackTransport::pair();
        let client = StreamClient::builder()
            .url("http://localhost:8081/api/sse")
            .transport(transport)
            .build()
            .unwrap();
        (client, acceptor)
    }

    #[tokio::test]
    async fn test_subscribe_starts_stream() {
        let (client, mut acceptor) = client();
        let subscription = client.subscribe(|_| {}).unwrap();

        assert_eq!(subscription.state(), ConnectionState::Connecting);
        let conn = acceptor.next().await.unwrap();
        assert_eq!(conn.url().as_str(), "http://localhost:8081/api/sse");
    }

    #[tokio::test]
    async fn test_subscriptions_are_independent() {
        let (client, mut acceptor) = client();
        let (first, mut first_rx) = client.subscribe_stream().unwrap();
        let (second, _second_rx) = client.subscribe_stream().unwrap();

        let a = acceptor.next().await.unwrap();
        let b = acceptor.next().await.unwrap();
        assert_ne!(first.id(), second.id());

        a.accept();
        assert_eq!(first_rx.recv().await, Some(Notification::connected()));
        assert_eq!(first.state(), ConnectionState::Connected);
        assert_eq!(second.state(), ConnectionState::Connecting);

        second.cancel();
        assert!(b.is_closed());
        assert!(!a.is_closed());
    }

    #[tokio::test]
    async fn test_subscribe_status_board() {
        let (client, mut acceptor) = client();
        let (_subscription, board) = client.subscribe_status().unwrap();
        assert_eq!(board.connection_status(), "Connecting...");

        let conn = acceptor.next().await.unwrap();
        conn.accept();
        conn.push("hello");

        for _ in 0..100 {
            if board.message().is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(board.message().as_deref(), Some("hello"));
        assert_eq!(board.connection_status(), "Connected (Message Received)");
        assert!(board.is_visible());
    }
}

//! Subscriptions and notification streams.
//!
//! A [`Subscription`] ties one subscriber to one [`ConnectionManager`]. It is
//! created when the stream starts and terminated by [`Subscription::cancel`]
//! or by dropping it.
//!
//! [`Notifications`] is the pull-based alternative to a callback handler: the
//! dispatcher forwards into a channel and the subscriber reads it as a
//! [`Stream`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::Result;
use crate::identifiers::SubscriptionId;
use crate::protocol::{ConnectionState, Notification};

use super::dispatcher::NotificationHandler;
use super::manager::ConnectionManager;

// ============================================================================
// Subscription
// ============================================================================

/// Handle to a running stream subscription.
///
/// Dropping the subscription cancels it.
pub struct Subscription {
    id: SubscriptionId,
    manager: ConnectionManager,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("manager", &self.manager)
            .finish()
    }
}

impl Subscription {
    /// Wraps a started manager.
    pub(crate) fn new(manager: ConnectionManager) -> Self {
        let id = SubscriptionId::new();
        debug!(subscription = %id, "Subscription created");
        Self { id, manager }
    }

    /// Returns the subscription ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    /// Returns the failures counted since the last successful open.
    #[inline]
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.manager.attempt()
    }

    /// Returns the underlying manager.
    #[inline]
    #[must_use]
    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// Stops the stream. No notification is delivered after this returns.
    ///
    /// Blocking and reentrancy rules are those of
    /// [`ConnectionManager::stop`]: a handler must not wait on a thread
    /// that is cancelling.
    pub fn cancel(&self) {
        debug!(subscription = %self.id, "Subscription cancelled");
        self.manager.stop();
    }

    /// Starts the stream again after it failed or was cancelled.
    ///
    /// # Errors
    ///
    /// - [`Error::AlreadyStarted`](crate::Error::AlreadyStarted) if the stream is still active
    pub fn restart(&self) -> Result<()> {
        debug!(subscription = %self.id, "Subscription restarting");
        self.manager.restart()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.manager.stop();
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// Stream of [`Notification`]s for a channel-backed subscription.
///
/// Ends once the subscription and its manager are dropped.
#[derive(Debug)]
pub struct Notifications {
    rx: mpsc::UnboundedReceiver<Notification>,
}

impl Notifications {
    /// Creates a handler that forwards into a new notification stream.
    pub(crate) fn channel() -> (NotificationHandler, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler: NotificationHandler = Box::new(move |notification| {
            let _ = tx.send(notification);
        });
        (handler, Self { rx })
    }

    /// Receives the next notification.
    pub async fn recv(&mut self) -> Option<Notification> {
        self.rx.recv().await
    }

    /// Returns an already delivered notification without waiting.
    pub fn try_recv(&mut self) -> Option<Notification> {
        self.rx.try_recv().ok()
    }
}

impl Stream for Notifications {
    type Item = Notification;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

// ============================================================================
// Tests
// ============================================================================

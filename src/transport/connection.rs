//! Transport collaborator contract.
//!
//! A [`Transport`] opens one streaming HTTP connection per call and reports
//! what happens on it through the [`TransportEvents`] sink it was given:
//!
//! | Callback | Meaning |
//! |----------|---------|
//! | [`TransportEvents::opened`] | Response headers accepted, stream live |
//! | [`TransportEvents::message`] | One decoded event payload |
//! | [`TransportEvents::error`] | Connection failed or dropped |
//!
//! Frame decoding happens inside the transport. The core assumes one
//! `message` call per logical event, already decoded to text.
//!
//! Callbacks may be invoked from any thread or task, including synchronously
//! from inside [`Transport::open`]. They never run manager logic on the
//! caller's stack: each report is queued to the manager's event loop.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio::sync::mpsc;
use tracing::trace;
use url::Url;

use crate::identifiers::ConnectionId;

// ============================================================================
// Traits
// ============================================================================

/// Opens streaming connections on behalf of a connection manager.
pub trait Transport: Send + Sync + 'static {
    /// Opens a connection to `url`.
    ///
    /// Must not block. Progress is reported through `events`; a failure to
    /// connect is reported as [`TransportEvents::error`], not returned.
    fn open(&self, url: &Url, events: TransportEvents) -> Box<dyn TransportHandle>;
}

/// Handle to one open transport connection.
pub trait TransportHandle: Send {
    /// Closes the connection. Calling it more than once has no effect.
    fn close(&mut self);
}

// ============================================================================
// TransportEvent
// ============================================================================

/// A callback reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection opened.
    Open,
    /// One decoded event payload.
    Message(String),
    /// The connection failed. Carries the transport's description.
    Error(String),
}

/// A transport event tagged with the connection it came from.
#[derive(Debug)]
pub(crate) struct TransportReport {
    pub(crate) connection: ConnectionId,
    pub(crate) event: TransportEvent,
}

// ============================================================================
// TransportEvents
// ============================================================================

/// Callback sink handed to [`Transport::open`].
///
/// Cheap to clone. Reports sent after the manager moved on to another
/// connection, or after it stopped, are discarded by the manager.
#[derive(Clone)]
pub struct TransportEvents {
    /// Connection these events belong to.
    connection: ConnectionId,
    /// Manager event loop.
    tx: mpsc::UnboundedSender<TransportReport>,
}

impl fmt::Debug for TransportEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportEvents")
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}

impl TransportEvents {
    /// Creates a sink for `connection`.
    pub(crate) fn new(
        connection: ConnectionId,
        tx: mpsc::UnboundedSender<TransportReport>,
    ) -> Self {
        Self { connection, tx }
    }

    /// Returns the connection this sink reports for.
    #[inline]
    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        self.connection
    }

    /// Reports that the connection opened.
    pub fn opened(&self) {
        self.report(TransportEvent::Open);
    }

    /// Reports one decoded event payload.
    pub fn message(&self, payload: impl Into<String>) {
        self.report(TransportEvent::Message(payload.into()));
    }

    /// Reports a connection error.
    pub fn error(&self, info: impl Into<String>) {
        self.report(TransportEvent::Error(info.into()));
    }

    /// Returns `true` once the owning manager is gone.
    #[inline]
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.tx.is_closed()
    }

    /// Queues an event to the manager.
    fn report(&self, event: TransportEvent) {
        let report = TransportReport {
            connection: self.connection,
            event,
        };
        if self.tx.send(report).is_err() {
            trace!(connection = %self.connection, "Transport report after manager shutdown");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_are_tagged() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = ConnectionId::default().next();
        let events = TransportEvents::new(id, tx);

        events.opened();
        events.message("hello");
        events.error("reset");

        let report = rx.try_recv().unwrap();
        assert_eq!(report.connection, id);
        assert_eq!(report.event, TransportEvent::Open);
        assert_eq!(
            rx.try_recv().unwrap().event,
            TransportEvent::Message("hello".into())
        );
        assert_eq!(
            rx.try_recv().unwrap().event,
            TransportEvent::Error("reset".into())
        );
    }

    #[test]
    fn test_detached_after_receiver_drop() {
        let (tx, rx) = mpsc::unbounded_channel();
        let events = TransportEvents::new(ConnectionId::default(), tx);
        assert!(!events.is_detached());

        drop(rx);
        assert!(events.is_detached());

        // Must not panic
        events.message("late");
    }
}

//! In-process loopback transport.
//!
//! [`LoopbackTransport`] implements [`Transport`] without any I/O. Every
//! `open` hands a [`LoopbackConnection`] to the paired [`LoopbackAcceptor`],
//! which plays the server: it accepts, pushes payloads, or fails the
//! connection, and can observe whether the client closed it.
//!
//! # Example
//!
//! ```ignore
//! let (transport, mut acceptor) = LoopbackTransport::pair();
//! let client = StreamClient::builder()
//!     .url("http://localhost:8081/api/sse")
//!     .transport(transport)
//!     .build()?;
//!
//! let _subscription = client.subscribe(|n| println!("{n}"))?;
//!
//! let conn = acceptor.next().await.unwrap();
//! conn.accept();
//! conn.push("hello");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::task::{Context, Poll};

use futures_util::Stream;
use tokio::sync::mpsc;
use tracing::debug;
use url::Url;

use crate::identifiers::ConnectionId;

use super::connection::{Transport, TransportEvents, TransportHandle};

// ============================================================================
// Shared Counters
// ============================================================================

/// Counters shared by the transport, its handles and the acceptor.
#[derive(Debug, Default)]
struct LoopbackCounters {
    /// Connections opened and not yet closed.
    live: AtomicUsize,
    /// Highest value `live` ever reached.
    peak: AtomicUsize,
    /// Total `open` calls.
    opened: AtomicUsize,
}

impl LoopbackCounters {
    fn on_open(&self) {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(live, Ordering::SeqCst);
    }

    fn on_close(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// LoopbackTransport
// ============================================================================

/// Transport that hands each opened connection to a [`LoopbackAcceptor`].
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    /// Delivers opened connections to the acceptor.
    incoming: mpsc::UnboundedSender<LoopbackConnection>,
    /// Shared counters.
    counters: Arc<LoopbackCounters>,
}

impl LoopbackTransport {
    /// Creates a transport and the acceptor that receives its connections.
    #[must_use]
    pub fn pair() -> (Self, LoopbackAcceptor) {
        let (incoming, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(LoopbackCounters::default());

        let transport = Self {
            incoming,
            counters: Arc::clone(&counters),
        };
        let acceptor = LoopbackAcceptor { rx, counters };

        (transport, acceptor)
    }
}

impl Transport for LoopbackTransport {
    fn open(&self, url: &Url, events: TransportEvents) -> Box<dyn TransportHandle> {
        let closed = Arc::new(AtomicBool::new(false));
        self.counters.on_open();

        let connection = LoopbackConnection {
            id: events.connection_id(),
            url: url.clone(),
            events: events.clone(),
            closed: Arc::clone(&closed),
        };

        if self.incoming.send(connection).is_err() {
            debug!(connection = %events.connection_id(), "Loopback acceptor dropped");
            events.error("connection refused: loopback acceptor dropped");
        }

        Box::new(LoopbackHandle {
            closed,
            counters: Arc::clone(&self.counters),
        })
    }
}

// ============================================================================
// LoopbackHandle
// ============================================================================

/// Client-side handle of a loopback connection.
struct LoopbackHandle {
    closed: Arc<AtomicBool>,
    counters: Arc<LoopbackCounters>,
}

impl TransportHandle for LoopbackHandle {
    fn close(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.counters.on_close();
        }
    }
}

impl Drop for LoopbackHandle {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// LoopbackConnection
// ============================================================================

/// Server side of one loopback connection.
///
/// Calls made after the client closed the connection are still reported;
/// the manager discards them as stale.
#[derive(Debug, Clone)]
pub struct LoopbackConnection {
    id: ConnectionId,
    url: Url,
    events: TransportEvents,
    closed: Arc<AtomicBool>,
}

impl LoopbackConnection {
    /// Returns the connection id assigned by the manager.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the URL the client opened.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Accepts the connection (reports open).
    pub fn accept(&self) {
        self.events.opened();
    }

    /// Pushes one event payload.
    pub fn push(&self, payload: impl Into<String>) {
        self.events.message(payload);
    }

    /// Fails the connection with `info`.
    pub fn fail(&self, info: impl Into<String>) {
        self.events.error(info);
    }

    /// Returns `true` once the client closed this connection.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

// ============================================================================
// LoopbackAcceptor
// ============================================================================

/// Receives the connections opened through a [`LoopbackTransport`].
#[derive(Debug)]
pub struct LoopbackAcceptor {
    rx: mpsc::UnboundedReceiver<LoopbackConnection>,
    counters: Arc<LoopbackCounters>,
}

impl LoopbackAcceptor {
    /// Waits for the next opened connection.
    ///
    /// Returns `None` once every transport clone is dropped.
    pub async fn next(&mut self) -> Option<LoopbackConnection> {
        self.rx.recv().await
    }

    /// Returns an already opened connection without waiting.
    pub fn try_next(&mut self) -> Option<LoopbackConnection> {
        self.rx.try_recv().ok()
    }

    /// Number of connections currently open.
    #[inline]
    #[must_use]
    pub fn live(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open connections seen.
    #[inline]
    #[must_use]
    pub fn peak(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    /// Total number of `open` calls.
    #[inline]
    #[must_use]
    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }
}

impl Stream for LoopbackAcceptor {
    type Item = LoopbackConnection;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

// ============================================================================
// Tests
// ============================================================================

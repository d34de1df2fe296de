//! Notification delivery to the subscriber.
//!
//! The dispatcher owns the subscriber's handler and calls it from a single
//! Tokio task, whatever thread or task produced the notification. That task
//! is the one hand-off point between the connection manager and the
//! subscriber.
//!
//! # Ordering
//!
//! Notifications go through one unbounded FIFO channel, so the subscriber
//! sees them in the order the manager emitted them. Nothing is coalesced.
//!
//! # Suppression After Stop
//!
//! Every notification is tagged with the generation current when it was
//! emitted. [`Dispatcher::advance_generation`] makes all queued
//! notifications stale; [`Dispatcher::wait_idle`] then waits for a delivery
//! already inside the handler to return. Delivery checks the tag while
//! holding the same lock, so once both calls return nothing older reaches
//! the handler.
//!
//! `wait_idle` never blocks on a thread that is itself running a handler,
//! of this dispatcher or any other. Handlers may stop their own stream or
//! each other's. In that case a handler call already in progress on another
//! thread may still finish after `wait_idle` returns.

// ============================================================================
// Imports
// ============================================================================

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::Result;
use crate::protocol::Notification;

// ============================================================================
// Types
// ============================================================================

/// Subscriber callback.
///
/// Called once per delivered notification, always from the dispatcher task.
pub type NotificationHandler = Box<dyn FnMut(Notification) + Send + 'static>;

/// A notification tagged with its generation.
struct Envelope {
    generation: u64,
    notification: Notification,
}

/// State shared between the dispatcher handle and its delivery task.
#[derive(Default)]
struct DeliveryGate {
    /// Generation accepted for delivery.
    generation: AtomicU64,
    /// Held for the duration of each handler call.
    delivering: Mutex<()>,
}

thread_local! {
    /// Set while this thread runs a handler of any dispatcher.
    static IN_HANDLER: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as running a handler until dropped.
struct HandlerScope {
    previous: bool,
}

impl HandlerScope {
    fn enter() -> Self {
        Self {
            previous: IN_HANDLER.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for HandlerScope {
    fn drop(&mut self) {
        let previous = self.previous;
        IN_HANDLER.with(|flag| flag.set(previous));
    }
}

/// Returns `true` when called from inside a subscriber handler.
#[must_use]
pub(crate) fn in_handler() -> bool {
    IN_HANDLER.with(Cell::get)
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Delivers notifications to exactly one subscriber.
pub struct Dispatcher {
    /// Queue feeding the delivery task.
    tx: mpsc::UnboundedSender<Envelope>,
    /// Shared generation gate.
    gate: Arc<DeliveryGate>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Spawns the delivery task for `handler` on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Runtime`](crate::Error::Runtime) if called outside a Tokio runtime
    pub fn spawn(handler: NotificationHandler) -> Result<Self> {
        let runtime = Handle::try_current()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let gate = Arc::new(DeliveryGate::default());

        runtime.spawn(Self::run_delivery_loop(rx, Arc::clone(&gate), handler));

        Ok(Self { tx, gate })
    }

    /// Queues a notification under the current generation.
    pub fn emit(&self, notification: Notification) {
        let envelope = Envelope {
            generation: self.gate.generation.load(Ordering::SeqCst),
            notification,
        };
        if self.tx.send(envelope).is_err() {
            debug!("Delivery task gone, notification dropped");
        }
    }

    /// Makes every notification queued so far stale.
    pub fn advance_generation(&self) {
        self.gate.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Blocks until no handler call is in progress.
    ///
    /// Returns immediately when called from inside any subscriber handler,
    /// so handlers that stop streams never wait on each other.
    pub fn wait_idle(&self) {
        if in_handler() {
            trace!("Skipping idle wait inside handler");
            return;
        }
        drop(self.gate.delivering.lock());
    }

    /// Returns the current generation.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.gate.generation.load(Ordering::SeqCst)
    }

    /// Delivery task: one handler call at a time, in queue order.
    async fn run_delivery_loop(
        mut rx: mpsc::UnboundedReceiver<Envelope>,
        gate: Arc<DeliveryGate>,
        mut handler: NotificationHandler,
    ) {
        while let Some(envelope) = rx.recv().await {
            let _delivering = gate.delivering.lock();

            let current = gate.generation.load(Ordering::SeqCst);
            if envelope.generation != current {
                trace!(
                    generation = envelope.generation,
                    current,
                    kind = envelope.notification.kind(),
                    "Dropped stale notification"
                );
                continue;
            }

            trace!(kind = envelope.notification.kind(), "Delivering notification");
            let _scope = HandlerScope::enter();
            handler(envelope.notification);
        }

        debug!("Delivery loop terminated");
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Connection manager and its event loop.
//!
//! The manager owns the connection state machine: the attempt counter, the
//! current transport handle and the pending retry timer. It opens transports,
//! reacts to their callbacks, consults the [`BackoffPolicy`] on errors and
//! emits [`Notification`]s through the [`Dispatcher`].
//!
//! # Serialization
//!
//! All state lives behind one lock. `start` and `stop` take it directly.
//! Transport callbacks and timer firings are queued to an event loop task
//! that takes the lock per report, so a transport reporting from inside
//! `open` cannot deadlock the manager.
//!
//! # Stale Reports
//!
//! Each opened transport gets a fresh [`ConnectionId`] and each timer a
//! fresh [`RetryId`]. Reports carrying any other id are dropped, so a late
//! callback from a closed connection or a timer that fired while being
//! cancelled has no effect.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::mem;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::{ConnectionId, RetryId};
use crate::protocol::{ConnectionState, Notification};
use crate::transport::{
    Transport, TransportEvent, TransportEvents, TransportHandle, TransportReport,
};

use super::backoff::BackoffPolicy;
use super::dispatcher::{Dispatcher, NotificationHandler};

// ============================================================================
// Types
// ============================================================================

/// The transport currently owned by the manager.
struct ActiveConnection {
    id: ConnectionId,
    handle: Box<dyn TransportHandle>,
}

/// The scheduled reconnect.
struct PendingRetry {
    id: RetryId,
    task: JoinHandle<()>,
}

/// Mutable state, guarded by the manager lock.
#[derive(Default)]
struct ManagerState {
    state: ConnectionState,
    url: Option<Url>,
    /// Failures since the last successful open.
    attempt: u32,
    connection: Option<ActiveConnection>,
    retry: Option<PendingRetry>,
    last_connection: ConnectionId,
    last_retry: RetryId,
}

/// Shared core of a [`ConnectionManager`].
struct ManagerInner {
    state: Mutex<ManagerState>,
    policy: BackoffPolicy,
    transport: Arc<dyn Transport>,
    dispatcher: Dispatcher,
    runtime: Handle,
    /// Transport callbacks, consumed by the event loop.
    reports_tx: mpsc::UnboundedSender<TransportReport>,
    /// Timer firings, consumed by the event loop.
    retries_tx: mpsc::UnboundedSender<RetryId>,
}

// ============================================================================
// ConnectionManager
// ============================================================================

/// Owns one stream connection and its reconnection state machine.
///
/// Cloning yields another handle to the same manager. The connection is
/// torn down when the last handle is dropped.
///
/// A handler that needs to reach its own manager must hold a
/// [`WeakManager`] from [`downgrade`](Self::downgrade). A strong clone
/// captured by the handler keeps the manager alive forever, because the
/// manager owns the handler.
///
/// # Example
///
/// ```ignore
/// let (transport, _acceptor) = LoopbackTransport::pair();
/// let manager = ConnectionManager::new(
///     BackoffPolicy::default(),
///     Arc::new(transport),
///     Box::new(|n| println!("{n}")),
/// )?;
///
/// manager.start("http://localhost:8081/api/sse")?;
/// // ...
/// manager.stop();
/// ```
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ConnectionManager")
            .field("state", &state.state)
            .field("attempt", &state.attempt)
            .field("url", &state.url.as_ref().map(Url::as_str))
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ConnectionManager - Constructor
// ============================================================================

impl ConnectionManager {
    /// Creates an idle manager delivering to `handler`.
    ///
    /// Spawns the event loop and the delivery task on the current runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the policy allows no retries or has a zero delay
    /// - [`Error::Runtime`] if called outside a Tokio runtime
    pub fn new(
        policy: BackoffPolicy,
        transport: Arc<dyn Transport>,
        handler: NotificationHandler,
    ) -> Result<Self> {
        policy.validate()?;
        let runtime = Handle::try_current()?;
        let dispatcher = Dispatcher::spawn(handler)?;
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        let (retries_tx, retries_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(ManagerInner {
            state: Mutex::new(ManagerState::default()),
            policy,
            transport,
            dispatcher,
            runtime: runtime.clone(),
            reports_tx,
            retries_tx,
        });

        runtime.spawn(Self::run_event_loop(
            Arc::downgrade(&inner),
            reports_rx,
            retries_rx,
        ));

        Ok(Self { inner })
    }
}

// ============================================================================
// ConnectionManager - Lifecycle
// ============================================================================

impl ConnectionManager {
    /// Opens the stream at `url`.
    ///
    /// Accepted from `Idle`, `Closed` and `Failed`; resets the attempt
    /// counter and moves to `Connecting`.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] or [`Error::InvalidUrl`] if `url` is not an http(s) URL
    /// - [`Error::AlreadyStarted`] if the stream is already active
    pub fn start(&self, url: impl AsRef<str>) -> Result<()> {
        let url = parse_stream_url(url.as_ref())?;
        self.inner.start(url)
    }

    /// Opens the stream again at the last URL passed to [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// - [`Error::NotStarted`] if `start` never succeeded
    /// - [`Error::AlreadyStarted`] if the stream is already active
    pub fn restart(&self) -> Result<()> {
        let url = self
            .inner
            .state
            .lock()
            .url
            .clone()
            .ok_or(Error::NotStarted)?;
        self.inner.start(url)
    }

    /// Stops the stream.
    ///
    /// Cancels the pending retry, closes the transport, discards the attempt
    /// counter and moves to `Closed`. Once this returns, the subscriber
    /// receives nothing more from this run, including notifications already
    /// queued. Safe to call from any state, repeatedly, and from inside any
    /// subscriber's handler.
    ///
    /// Called from outside a handler, this may block until a handler call
    /// already in progress returns. A handler must therefore never wait on
    /// a thread that is calling `stop`. Called from inside a handler it
    /// never blocks; a call of this stream's handler already running on
    /// another thread may then still finish after `stop` returns.
    pub fn stop(&self) {
        self.inner.stop();
    }
}

// ============================================================================
// ConnectionManager - Accessors
// ============================================================================

impl ConnectionManager {
    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.state.lock().state
    }

    /// Returns the failures counted since the last successful open.
    #[inline]
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.inner.state.lock().attempt
    }

    /// Returns the URL of the current or last run.
    #[must_use]
    pub fn url(&self) -> Option<Url> {
        self.inner.state.lock().url.clone()
    }

    /// Returns the backoff policy.
    #[inline]
    #[must_use]
    pub fn policy(&self) -> BackoffPolicy {
        self.inner.policy
    }

    /// Returns `true` while a retry timer is pending.
    #[inline]
    #[must_use]
    pub fn has_pending_retry(&self) -> bool {
        self.inner.state.lock().retry.is_some()
    }

    /// Returns `true` while a transport is open.
    #[inline]
    #[must_use]
    pub fn has_transport(&self) -> bool {
        self.inner.state.lock().connection.is_some()
    }

    /// Creates a handle that does not keep the manager alive.
    #[inline]
    #[must_use]
    pub fn downgrade(&self) -> WeakManager {
        WeakManager {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

// ============================================================================
// WeakManager
// ============================================================================

/// Non-owning handle to a [`ConnectionManager`].
///
/// Meant for subscriber handlers that stop or inspect their own stream.
#[derive(Clone, Default)]
pub struct WeakManager {
    inner: Weak<ManagerInner>,
}

impl fmt::Debug for WeakManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakManager")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl WeakManager {
    /// Returns the manager if any strong handle still exists.
    #[must_use]
    pub fn upgrade(&self) -> Option<ConnectionManager> {
        self.inner.upgrade().map(|inner| ConnectionManager { inner })
    }

    /// Stops the manager if it is still alive.
    pub fn stop(&self) {
        if let Some(manager) = self.upgrade() {
            manager.stop();
        }
    }
}

// ============================================================================
// ConnectionManager - Event Loop
// ============================================================================

impl ConnectionManager {
    /// Applies queued transport reports and timer firings, one at a time.
    ///
    /// Ends when the manager is dropped.
    async fn run_event_loop(
        inner: Weak<ManagerInner>,
        mut reports_rx: mpsc::UnboundedReceiver<TransportReport>,
        mut retries_rx: mpsc::UnboundedReceiver<RetryId>,
    ) {
        loop {
            tokio::select! {
                report = reports_rx.recv() => {
                    let Some(report) = report else { break };
                    let Some(inner) = inner.upgrade() else { break };
                    inner.handle_report(report);
                }

                retry = retries_rx.recv() => {
                    let Some(retry) = retry else { break };
                    let Some(inner) = inner.upgrade() else { break };
                    inner.handle_retry(retry);
                }
            }
        }

        debug!("Manager event loop terminated");
    }
}

// ============================================================================
// ManagerInner - Transitions
// ============================================================================

impl ManagerInner {
    fn start(&self, url: Url) -> Result<()> {
        let mut state = self.state.lock();
        if !state.state.can_start() {
            warn!(state = %state.state, "Start rejected, stream already active");
            return Err(Error::already_started(state.state));
        }

        info!(url = %url, from = %state.state, "Stream starting");
        state.attempt = 0;
        state.url = Some(url);
        self.connect(&mut state);
        Ok(())
    }

    fn stop(&self) {
        {
            let mut state = self.state.lock();
            if let Some(retry) = state.retry.take() {
                retry.task.abort();
                debug!(retry = %retry.id, "Pending retry cancelled");
            }
            Self::close_connection(&mut state);
            state.attempt = 0;

            let previous = mem::replace(&mut state.state, ConnectionState::Closed);
            self.dispatcher.advance_generation();

            if previous != ConnectionState::Closed {
                info!(from = %previous, "Stream stopped");
            }
        }

        self.dispatcher.wait_idle();
    }

    fn handle_report(&self, report: TransportReport) {
        let mut state = self.state.lock();

        let current = state.connection.as_ref().map(|c| c.id);
        if current != Some(report.connection) {
            trace!(
                connection = %report.connection,
                state = %state.state,
                "Dropped report from stale connection"
            );
            return;
        }

        match report.event {
            TransportEvent::Open => self.on_open(&mut state),
            TransportEvent::Message(payload) => self.on_message(&state, payload),
            TransportEvent::Error(info) => self.on_error(&mut state, info),
        }
    }

    fn handle_retry(&self, retry: RetryId) {
        let mut state = self.state.lock();

        if state.retry.as_ref().map(|r| r.id) != Some(retry) {
            trace!(retry = %retry, "Dropped stale retry");
            return;
        }
        state.retry = None;

        state.attempt = state.attempt.saturating_add(1);
        info!(
            attempt = state.attempt,
            max = self.policy.max_attempts(),
            "Stream retrying"
        );
        self.connect(&mut state);
    }

    fn on_open(&self, state: &mut ManagerState) {
        if state.state != ConnectionState::Connecting {
            debug!(state = %state.state, "Ignored duplicate open");
            return;
        }

        state.attempt = 0;
        state.state = ConnectionState::Connected;
        info!(url = ?state.url.as_ref().map(Url::as_str), "Stream connected");
        self.dispatcher.emit(Notification::connected());
    }

    fn on_message(&self, state: &ManagerState, payload: String) {
        if state.state != ConnectionState::Connected {
            debug!(state = %state.state, "Ignored message before open");
            return;
        }

        trace!(len = payload.len(), "Stream message");
        self.dispatcher.emit(Notification::Data(payload));
    }

    fn on_error(&self, state: &mut ManagerState, info: String) {
        Self::close_connection(state);

        if self.policy.allows_retry(state.attempt) {
            self.schedule_retry(state, info);
        } else {
            self.fail(state, info);
        }
    }
}

// ============================================================================
// ManagerInner - Helpers
// ============================================================================

impl ManagerInner {
    /// Opens a transport against the stored URL and moves to `Connecting`.
    fn connect(&self, state: &mut ManagerState) {
        let Some(url) = state.url.clone() else {
            return;
        };
        Self::close_connection(state);

        let id = state.last_connection.next();
        state.last_connection = id;
        state.state = ConnectionState::Connecting;

        debug!(connection = %id, url = %url, attempt = state.attempt, "Opening transport");
        let events = TransportEvents::new(id, self.reports_tx.clone());
        let handle = self.transport.open(&url, events);
        state.connection = Some(ActiveConnection { id, handle });
    }

    /// Moves to `Reconnecting` and arms the retry timer.
    fn schedule_retry(&self, state: &mut ManagerState, info: String) {
        let max = self.policy.max_attempts();
        let delay = self.policy.delay(state.attempt);
        state.state = ConnectionState::Reconnecting;

        let err = Error::transport(info);
        warn!(
            error = %err,
            attempt = state.attempt.saturating_add(1),
            max,
            delay_ms = saturating_millis(delay),
            "Stream reconnecting after backoff"
        );
        self.dispatcher
            .emit(Notification::reconnecting(delay, state.attempt, max));

        let id = state.last_retry.next();
        state.last_retry = id;

        let retries_tx = self.retries_tx.clone();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = retries_tx.send(id);
        });
        state.retry = Some(PendingRetry { id, task });
    }

    /// Moves to `Failed` and emits the terminal notifications.
    fn fail(&self, state: &mut ManagerState, info: String) {
        state.state = ConnectionState::Failed;

        let err = Error::retry_budget_exhausted(state.attempt, info);
        error!(error = %err, "Stream failed");

        self.dispatcher.emit(Notification::retries_exhausted());
        self.dispatcher
            .emit(Notification::terminal_error(err.to_string()));
    }

    /// Closes the current transport, if any.
    fn close_connection(state: &mut ManagerState) {
        if let Some(mut connection) = state.connection.take() {
            connection.handle.close();
            debug!(connection = %connection.id, "Transport closed");
        }
    }
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(retry) = state.retry.take() {
            retry.task.abort();
        }
        Self::close_connection(state);
    }
}

/// Whole milliseconds of `delay`, saturating at `u64::MAX`.
fn saturating_millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// URL Parsing
// ============================================================================

/// Parses a stream URL, accepting only `http` and `https`.
///
/// # Errors
///
/// - [`Error::Url`] if `raw` does not parse
/// - [`Error::InvalidUrl`] for other schemes
pub fn parse_stream_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::invalid_url(
            raw,
            format!("unsupported scheme '{scheme}'"),
        )),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::{LoopbackAcceptor, LoopbackTransport};

    const URL: &str = "http://localhost:8081/api/sse";

    fn manager() -> (
        ConnectionManager,
        LoopbackAcceptor,
        mpsc::UnboundedReceiver<Notification>,
    ) {
        let (transport, acceptor) = LoopbackTransport::pair();
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = ConnectionManager::new(
            BackoffPolicy::default(),
            Arc::new(transport),
            Box::new(move |n| {
                let _ = tx.send(n);
            }),
        )
        .unwrap();
        (manager, acceptor, rx)
    }

    #[test]
    fn test_parse_stream_url() {
        assert!(parse_stream_url(URL).is_ok());
        assert!(parse_stream_url("https://example.com/events").is_ok());
        assert!(matches!(
            parse_stream_url("ws://example.com"),
            Err(Error::InvalidUrl { .. })
        ));
        assert!(matches!(parse_stream_url("nope"), Err(Error::Url(_))));
    }

    #[tokio::test]
    async fn test_start_moves_to_connecting() {
        let (manager, mut acceptor, _rx) = manager();
        assert_eq!(manager.state(), ConnectionState::Idle);

        manager.start(URL).unwrap();
        assert_eq!(manager.state(), ConnectionState::Connecting);
        assert!(manager.has_transport());

        let conn = acceptor.next().await.unwrap();
        assert_eq!(conn.url().as_str(), URL);
    }

    #[tokio::test]
    async fn test_start_while_active_is_rejected() {
        let (manager, acceptor, _rx) = manager();
        manager.start(URL).unwrap();

        let err = manager.start(URL).unwrap_err();
        assert!(matches!(
            err,
            Error::AlreadyStarted {
                state: ConnectionState::Connecting
            }
        ));
        assert_eq!(manager.state(), ConnectionState::Connecting);
        assert_eq!(acceptor.opened(), 1);
    }

    #[tokio::test]
    async fn test_restart_requires_prior_start() {
        let (manager, _acceptor, _rx) = manager();
        assert!(matches!(manager.restart(), Err(Error::NotStarted)));
    }

    #[tokio::test]
    async fn test_invalid_url_leaves_state_untouched() {
        let (manager, acceptor, _rx) = manager();
        assert!(manager.start("ftp://example.com").is_err());
        assert_eq!(manager.state(), ConnectionState::Idle);
        assert_eq!(acceptor.opened(), 0);
    }

    #[tokio::test]
    async fn test_open_emits_connected() {
        let (manager, mut acceptor, mut rx) = manager();
        manager.start(URL).unwrap();

        acceptor.next().await.unwrap().accept();

        assert_eq!(rx.recv().await.unwrap(), Notification::connected());
        assert_eq!(manager.state(), ConnectionState::Connected);
        assert_eq!(manager.attempt(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_schedules_retry() {
        let (manager, mut acceptor, mut rx) = manager();
        manager.start(URL).unwrap();

        let conn = acceptor.next().await.unwrap();
        conn.accept();
        assert_eq!(rx.recv().await.unwrap(), Notification::connected());

        conn.fail("connection reset");
        assert_eq!(
            rx.recv().await.unwrap(),
            Notification::status("Reconnecting in 1s… (attempt 1/10)")
        );
        assert_eq!(manager.state(), ConnectionState::Reconnecting);
        assert!(manager.has_pending_retry());
        assert!(!manager.has_transport());
        assert!(conn.is_closed());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (manager, _acceptor, _rx) = manager();
        manager.stop();
        manager.stop();
        assert_eq!(manager.state(), ConnectionState::Closed);

        manager.start(URL).unwrap();
        assert_eq!(manager.state(), ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_policy() {
        for policy in [
            BackoffPolicy::new(Duration::from_secs(1), 0),
            BackoffPolicy::new(Duration::ZERO, 10),
        ] {
            let (transport, _acceptor) = LoopbackTransport::pair();
            let err = ConnectionManager::new(policy, Arc::new(transport), Box::new(|_| {}))
                .unwrap_err();
            assert!(err.is_config_error());
        }
    }

    #[test]
    fn test_saturating_millis() {
        assert_eq!(saturating_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_saturated_delay_schedules_retry() {
        let (transport, mut acceptor) = LoopbackTransport::pair();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let manager = ConnectionManager::new(
            BackoffPolicy::new(Duration::MAX, 1),
            Arc::new(transport),
            Box::new(move |n| {
                let _ = tx.send(n);
            }),
        )
        .unwrap();
        manager.start(URL).unwrap();

        acceptor.next().await.unwrap().fail("down");
        let status = rx.recv().await.unwrap();
        assert!(status.text().starts_with("Reconnecting in "));
        assert_eq!(manager.state(), ConnectionState::Reconnecting);
        assert!(manager.has_pending_retry());
    }

    #[tokio::test]
    async fn test_weak_manager_does_not_keep_manager_alive() {
        let (manager, mut acceptor, _rx) = manager();
        manager.start(URL).unwrap();
        let conn = acceptor.next().await.unwrap();

        let weak = manager.downgrade();
        assert_eq!(
            weak.upgrade().map(|m| m.state()),
            Some(ConnectionState::Connecting)
        );

        drop(manager);
        assert!(weak.upgrade().is_none());
        assert!(conn.is_closed());
        weak.stop();
    }

    #[tokio::test]
    async fn test_handler_holding_weak_manager_allows_teardown() {
        let (transport, mut acceptor) = LoopbackTransport::pair();
        let slot: Arc<std::sync::OnceLock<WeakManager>> = Arc::new(std::sync::OnceLock::new());

        let own = Arc::clone(&slot);
        let manager = ConnectionManager::new(
            BackoffPolicy::default(),
            Arc::new(transport),
            Box::new(move |n| {
                if n.is_terminal() {
                    if let Some(weak) = own.get() {
                        weak.stop();
                    }
                }
            }),
        )
        .unwrap();
        let _ = slot.set(manager.downgrade());

        manager.start(URL).unwrap();
        let conn = acceptor.next().await.unwrap();
        conn.accept();

        drop(manager);
        assert!(conn.is_closed());
        assert_eq!(acceptor.live(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_closes_transport() {
        let (manager, mut acceptor, _rx) = manager();
        manager.start(URL).unwrap();
        let conn = acceptor.next().await.unwrap();

        drop(manager);
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(conn.is_closed());
        assert_eq!(acceptor.live(), 0);
    }
}

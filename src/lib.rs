//! pushstream - Resilient server-push event stream client.
//!
//! This library keeps a long-lived, unidirectional server-push stream open
//! over HTTP and survives transient network failures without the subscriber
//! losing track of what is going on.
//!
//! # Architecture
//!
//! The client is split into a state machine and its collaborators:
//!
//! - **Transport (collaborator)**: Opens the HTTP stream, decodes frames,
//!   reports open/message/error
//! - **Connection manager**: Owns the state machine, the attempt counter,
//!   the transport handle and the retry timer
//! - **Dispatcher**: Delivers notifications to the one subscriber from a
//!   single task
//!
//! Key design principles:
//!
//! - Each subscription owns one manager; nothing is process-wide
//! - Every transport error is retried with doubling delay until the budget
//!   runs out, then the stream fails terminally
//! - `stop` always wins: nothing is opened or delivered after it returns
//!
//! # Quick Start
//!
//! ```ignore
//! use pushstream::{LoopbackTransport, Notification, Result, StreamClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let (transport, _acceptor) = LoopbackTransport::pair();
//!
//!     let client = StreamClient::builder()
//!         .url("http://localhost:8081/api/sse")
//!         .base_delay_ms(1000)
//!         .max_attempts(10)
//!         .transport(transport)
//!         .build()?;
//!
//!     let subscription = client.subscribe(|notification| match notification {
//!         Notification::Status(text) => println!("status: {text}"),
//!         Notification::Data(payload) => println!("message: {payload}"),
//!         Notification::TerminalError(reason) => eprintln!("failed: {reason}"),
//!     })?;
//!
//!     // ...
//!     subscription.cancel();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client factory, configuration, status board |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Notifications and connection states |
//! | [`stream`] | Backoff, connection manager, dispatcher |
//! | [`transport`] | Transport collaborator contract |

// ============================================================================
// Modules
// ============================================================================

/// Client factory and configuration.
///
/// Use [`StreamClient::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for stream entities.
pub mod identifiers;

/// Notification and state types.
pub mod protocol;

/// Connection state machine and delivery.
///
/// - [`ConnectionManager`] - Reconnecting state machine
/// - [`BackoffPolicy`] - Retry delays
/// - [`Subscription`] - Subscriber handle
pub mod stream;

/// Transport collaborator contract.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{ClientBuilder, StatusBoard, StatusView, StreamClient, StreamOptions};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ConnectionId, RetryId, SubscriptionId};

// Protocol types
pub use protocol::{ConnectionState, Notification};

// Stream types
pub use stream::{
    BackoffPolicy, ConnectionManager, Dispatcher, NotificationHandler, Notifications,
    Subscription, WeakManager,
};

// Transport types
pub use transport::{
    LoopbackAcceptor, LoopbackConnection, LoopbackTransport, Transport, TransportEvent,
    TransportEvents, TransportHandle,
};

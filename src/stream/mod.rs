//! Resilient stream core.
//!
//! This module contains the connection state machine and everything it
//! needs to turn transport callbacks into subscriber notifications:
//!
//! - [`BackoffPolicy`] - Retry delay from the attempt count
//! - [`ConnectionManager`] - State machine, transport and retry ownership
//! - [`Dispatcher`] - Single-context delivery to the subscriber
//! - [`Subscription`] - Subscriber-side handle
//!
//! # Data Flow
//!
//! ```text
//! Transport ──callbacks──► ConnectionManager ──emit──► Dispatcher ──► handler
//!     ▲                        │    ▲
//!     └──────── open ──────────┘    └── retry timer (BackoffPolicy)
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Exponential backoff policy.
pub mod backoff;

/// Notification delivery.
pub mod dispatcher;

/// Connection state machine.
pub mod manager;

/// Subscription handles.
pub mod subscription;

// ============================================================================
// Re-exports
// ============================================================================

pub use backoff::{BackoffPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
pub use dispatcher::{Dispatcher, NotificationHandler};
pub use manager::{ConnectionManager, WeakManager, parse_stream_url};
pub use subscription::{Notifications, Subscription};

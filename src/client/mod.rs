//! Stream client module.
//!
//! This module provides the main entry point for subscribing to a push
//! stream.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`StreamClient`] | Factory for subscriptions |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`StreamOptions`] | URL and retry settings |
//! | [`StatusBoard`] | Ready-made connectivity view subscriber |
//!
//! # Example
//!
//! ```ignore
//! use pushstream::{LoopbackTransport, Result, StreamClient};
//!
//! # async fn example() -> Result<()> {
//! let (transport, _acceptor) = LoopbackTransport::pair();
//! let client = StreamClient::builder()
//!     .url("http://localhost:8081/api/sse")
//!     .transport(transport)
//!     .build()?;
//!
//! let (subscription, board) = client.subscribe_status()?;
//! println!("{}", board.connection_status());
//! subscription.cancel();
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Core client implementation.
pub mod core;

/// Stream URL and retry options.
pub mod options;

/// Connectivity status board.
pub mod status;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::StreamClient;
pub use options::StreamOptions;
pub use status::{STATUS_INITIAL, STATUS_MESSAGE_RECEIVED, StatusBoard, StatusView};

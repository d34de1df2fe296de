//! Transport collaborator layer.
//!
//! The transport performs the network I/O and frame decoding for the push
//! stream. The core never touches sockets: it talks to a [`Transport`]
//! through callbacks and a close handle.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐   open(url, events)    ┌──────────────────┐
//! │  ConnectionManager  │───────────────────────►│    Transport     │
//! │                     │                        │                  │
//! │   event loop task   │◄───────────────────────│  opened/message/ │
//! │                     │   TransportEvents      │  error callbacks │
//! └─────────────────────┘                        └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Transport traits and the callback sink |
//! | `loopback` | In-process transport driven by an acceptor |

// ============================================================================
// Submodules
// ============================================================================

/// Transport traits and callback sink.
pub mod connection;

/// In-process loopback transport.
pub mod loopback;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Transport, TransportEvent, TransportEvents, TransportHandle};
pub use loopback::{LoopbackAcceptor, LoopbackConnection, LoopbackTransport};

pub(crate) use connection::TransportReport;

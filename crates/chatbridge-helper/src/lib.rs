//! # chatbridge Helper Bridge
//!
//! Core of the bridge between HTTP callers and the privileged helper process
//! that owns the messaging application's private interfaces. Commands are
//! dispatched as asynchronous messages; responses arrive later as independent
//! messages and are matched back to their command by transaction id.
//!
//! # Architecture
//!
//! ```text
//! caller ──► HelperClient ──► Dispatcher ──► Transport ──► helper process
//!                                │  register                    │
//!                                ▼                              │
//!                       TransactionRegistry ◄── InboundRouter ◄─┘
//!                                │  resolve/reject/timeout
//!                                ▼
//!                        caller resumed (exactly once)
//! ```
//!
//! The registry is the only shared mutable state: a table of pending
//! transactions, each holding a single-use completion slot. Whichever of
//! resolve, reject, timeout sweep or cancel removes the entry first wins;
//! all later attempts are inert.

pub mod actions;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod inbound;
pub mod registry;
pub mod transport;

pub use actions::HelperClient;
pub use config::{ConfigError, HelperConfig};
pub use dispatch::{Dispatcher, TransactionRequest};
pub use error::{HelperError, TransportError};
pub use inbound::InboundRouter;
pub use registry::{
    sweep_task, RegistryStatsSnapshot, TransactionKind, TransactionOutcome, TransactionRegistry,
};
pub use transport::channel::ChannelTransport;
pub use transport::socket::{SocketAcceptor, SocketTransport};
pub use transport::Transport;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

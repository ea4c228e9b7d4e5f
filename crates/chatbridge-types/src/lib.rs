//! # chatbridge Types Crate
//!
//! Wire and domain types shared between the helper bridge core and the HTTP
//! server: transaction identifiers and the message envelopes exchanged with
//! the privileged helper process.
//!
//! The helper defines the action vocabulary; these types only pin down the
//! message *shape*, not the set of valid actions or argument layouts.

pub mod id;
pub mod message;

pub use id::TransactionId;
pub use message::{ActionMessage, HelperErrorData, HelperMessage, MessageStatus};

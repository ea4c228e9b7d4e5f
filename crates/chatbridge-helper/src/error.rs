//! Error types for the helper bridge.
//!
//! Caller-visible failures travel through the awaited transaction outcome,
//! never as panics out of the inbound delivery path. Unknown transaction ids
//! are not errors at all: they are logged and counted by the registry.

use chatbridge_types::HelperErrorData;
use std::time::Duration;

/// Transport-level failures (send path).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No helper process is currently attached
    #[error("helper not connected")]
    NotConnected,
    /// Write to the helper failed mid-send
    #[error("send failed: {0}")]
    SendFailed(String),
    /// The transport's channel is closed
    #[error("channel closed")]
    ChannelClosed,
    /// Outbound message could not be encoded
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Caller-visible failures of a privileged operation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HelperError {
    /// The send could not be attempted; nothing was registered
    #[error("helper transport unavailable")]
    TransportUnavailable,
    /// The transaction aged past its deadline with no matching response
    #[error("transaction timed out after {elapsed:?}")]
    Timeout {
        /// How long the caller waited
        elapsed: Duration,
    },
    /// The helper answered with an error discriminator
    #[error("helper reported error: {}", .0.message)]
    Helper(HelperErrorData),
    /// The caller abandoned the transaction before a response arrived
    #[error("transaction cancelled")]
    Cancelled,
    /// The completion slot was dropped without a terminal delivery
    #[error("completion channel closed")]
    ChannelClosed,
}

impl HelperError {
    /// Wrap a helper-reported error message.
    pub fn helper(message: impl Into<String>) -> Self {
        Self::Helper(HelperErrorData {
            message: message.into(),
            detail: None,
        })
    }
}

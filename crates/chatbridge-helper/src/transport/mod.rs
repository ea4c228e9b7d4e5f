//! Transport boundary to the privileged helper process.
//!
//! The core depends on the transport only through [`Transport`]: a readiness
//! check and a single-message send. Inbound delivery is expressed as channel
//! ownership: the concrete adapter feeds decoded [`HelperMessage`]s into an
//! mpsc channel whose receiver the [`InboundRouter`](crate::InboundRouter)
//! consumes.

pub mod channel;
pub mod socket;

use crate::error::TransportError;
use async_trait::async_trait;
use chatbridge_types::ActionMessage;

/// Asynchronous, message-oriented channel to the helper process.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Whether a helper is currently attached and sends can be attempted.
    fn is_connected(&self) -> bool;

    /// Send a single message to the helper. No retries at this layer.
    async fn send(&self, message: &ActionMessage) -> Result<(), TransportError>;
}

//! Inbound routing - the single consumer of helper messages.
//!
//! Correlated messages become registry resolutions; uncorrelated ones are
//! unsolicited helper events and go out on a broadcast channel, entirely
//! outside the correlation core. Routing never blocks the delivery loop
//! beyond the registry call itself and never panics into the transport path.

use crate::error::HelperError;
use crate::registry::TransactionRegistry;
use chatbridge_types::{HelperMessage, MessageStatus};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

/// Routes inbound helper messages to the registry or the event channel.
pub struct InboundRouter {
    registry: Arc<TransactionRegistry>,
    inbound_rx: mpsc::Receiver<HelperMessage>,
    events_tx: broadcast::Sender<HelperMessage>,
}

impl InboundRouter {
    /// Create a router; returns it plus a subscription to the unsolicited
    /// event stream. Further subscriptions come from
    /// [`subscribe`](Self::subscribe).
    pub fn new(
        registry: Arc<TransactionRegistry>,
        inbound_rx: mpsc::Receiver<HelperMessage>,
        event_buffer: usize,
    ) -> (Self, broadcast::Receiver<HelperMessage>) {
        let (events_tx, events_rx) = broadcast::channel(event_buffer);
        (
            Self {
                registry,
                inbound_rx,
                events_tx,
            },
            events_rx,
        )
    }

    /// Subscribe to unsolicited helper events.
    pub fn subscribe(&self) -> broadcast::Receiver<HelperMessage> {
        self.events_tx.subscribe()
    }

    /// Run the routing loop. Spawn as a background task; exits when the
    /// transport side drops the inbound channel.
    pub async fn run(mut self) {
        while let Some(message) = self.inbound_rx.recv().await {
            self.route(message);
        }
        warn!("Inbound channel closed, stopping router");
    }

    fn route(&self, message: HelperMessage) {
        match message.transaction_id {
            Some(id) => {
                // resolve/reject log and count unknown ids themselves.
                match message.status {
                    MessageStatus::Ok => {
                        let payload = message.payload.unwrap_or(Value::Null);
                        self.registry.resolve(id, payload);
                    }
                    MessageStatus::Error => {
                        self.registry
                            .reject(id, HelperError::Helper(message.error_data()));
                    }
                }
            }
            None => {
                debug!("Forwarding unsolicited helper event");
                // No subscribers is fine; the event is simply dropped.
                let _ = self.events_tx.send(message);
            }
        }
    }
}

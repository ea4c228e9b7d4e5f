//! In-memory channel transport for tests and embedded wiring.

use crate::error::TransportError;
use crate::transport::Transport;
use async_trait::async_trait;
use chatbridge_types::ActionMessage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Transport backed by an mpsc channel; the "helper" is whoever consumes the
/// receiver half. Connectivity is a toggle so tests can exercise the
/// transport-unavailable path.
pub struct ChannelTransport {
    outbound_tx: mpsc::Sender<ActionMessage>,
    connected: AtomicBool,
}

impl ChannelTransport {
    /// Create a channel transport; returns the transport and the receiver a
    /// fake helper should consume.
    pub fn new(buffer: usize) -> (Arc<Self>, mpsc::Receiver<ActionMessage>) {
        let (tx, rx) = mpsc::channel(buffer);
        (
            Arc::new(Self {
                outbound_tx: tx,
                connected: AtomicBool::new(true),
            }),
            rx,
        )
    }

    /// Toggle connectivity as seen by the dispatcher.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send(&self, message: &ActionMessage) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.outbound_tx
            .send(message.clone())
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[tokio::test]
    async fn test_send_delivers_to_receiver() {
        let (transport, mut rx) = ChannelTransport::new(8);
        let msg = ActionMessage::fire_and_forget("ping", Map::new());

        transport.send(&msg).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().action, "ping");
    }

    #[tokio::test]
    async fn test_disconnected_send_fails() {
        let (transport, _rx) = ChannelTransport::new(8);
        transport.set_connected(false);
        assert!(!transport.is_connected());

        let msg = ActionMessage::fire_and_forget("ping", Map::new());
        assert!(matches!(
            transport.send(&msg).await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_closed_receiver_surfaces_channel_closed() {
        let (transport, rx) = ChannelTransport::new(8);
        drop(rx);

        let msg = ActionMessage::fire_and_forget("ping", Map::new());
        assert!(matches!(
            transport.send(&msg).await,
            Err(TransportError::ChannelClosed)
        ));
    }
}

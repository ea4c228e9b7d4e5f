//! Action Dispatcher - the uniform send path every domain action uses.
//!
//! Turns "action name + arguments" into a message on the transport and,
//! when a transaction is requested, a registered waiter in the registry.
//! Exactly one message is sent per call; no retries at this layer.

use crate::error::HelperError;
use crate::registry::{TransactionKind, TransactionOutcome, TransactionRegistry};
use crate::transport::Transport;
use chatbridge_types::ActionMessage;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Whether (and what kind of) correlated response the caller expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionRequest {
    /// Fire-and-forget: no response will ever be observed
    None,
    /// Correlated, helper returns a typed JSON payload
    Generic,
    /// Correlated, helper acknowledges with no typed payload
    Ack,
}

/// Margin added to the awaited receiver beyond the transaction timeout.
/// The sweep is authoritative; this only guards against a stalled sweep.
const BACKSTOP_MARGIN: Duration = Duration::from_secs(2);

/// Dispatches commands to the helper and bridges their responses back.
pub struct Dispatcher {
    registry: Arc<TransactionRegistry>,
    transport: Arc<dyn Transport>,
    default_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<TransactionRegistry>,
        transport: Arc<dyn Transport>,
        default_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            transport,
            default_timeout,
        }
    }

    /// Send a command to the helper, optionally awaiting a correlated result.
    ///
    /// Fails fast with [`HelperError::TransportUnavailable`] when no helper
    /// is attached: nothing is registered, nothing to clean up. On a send
    /// failure after registration, the registration is cancelled so no
    /// orphaned entry remains.
    pub async fn dispatch(
        &self,
        action: &str,
        args: Map<String, Value>,
        request: TransactionRequest,
        timeout: Option<Duration>,
    ) -> Result<Value, HelperError> {
        if !self.transport.is_connected() {
            return Err(HelperError::TransportUnavailable);
        }

        let kind = match request {
            TransactionRequest::None => {
                let message = ActionMessage::fire_and_forget(action, args);
                self.transport.send(&message).await.map_err(|e| {
                    warn!(action = action, error = %e, "Fire-and-forget send failed");
                    HelperError::TransportUnavailable
                })?;
                debug!(action = action, "Sent fire-and-forget command");
                return Ok(Value::Null);
            }
            TransactionRequest::Generic => TransactionKind::Generic,
            TransactionRequest::Ack => TransactionKind::Ack,
        };

        let timeout = timeout.unwrap_or(self.default_timeout);
        let (id, rx) = self.registry.register(action, kind, Some(timeout));

        let message = ActionMessage::correlated(action, args, id);
        if let Err(e) = self.transport.send(&message).await {
            warn!(
                transaction_id = %id,
                action = action,
                error = %e,
                "Send failed, cancelling transaction"
            );
            self.registry.cancel(id);
            return Err(HelperError::TransportUnavailable);
        }

        debug!(
            transaction_id = %id,
            action = action,
            "Sent correlated command"
        );

        match tokio::time::timeout(timeout + BACKSTOP_MARGIN, rx).await {
            Ok(Ok(TransactionOutcome::Resolved(payload))) => match kind {
                TransactionKind::Generic => Ok(payload),
                TransactionKind::Ack => Ok(Value::Null),
            },
            Ok(Ok(TransactionOutcome::Rejected(error))) => Err(error),
            Ok(Ok(TransactionOutcome::TimedOut)) => Err(HelperError::Timeout { elapsed: timeout }),
            Ok(Err(_)) => {
                // Slot dropped without a terminal delivery: internal fault.
                Err(HelperError::ChannelClosed)
            }
            Err(_) => {
                // Sweep never fired; clean up ourselves.
                self.registry.cancel(id);
                Err(HelperError::Timeout {
                    elapsed: timeout + BACKSTOP_MARGIN,
                })
            }
        }
    }

    /// Number of transactions currently awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.registry.pending_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::channel::ChannelTransport;
    use serde_json::json;

    fn setup(
        default_timeout: Duration,
    ) -> (
        Dispatcher,
        Arc<TransactionRegistry>,
        Arc<ChannelTransport>,
        tokio::sync::mpsc::Receiver<ActionMessage>,
    ) {
        let registry = Arc::new(TransactionRegistry::new(default_timeout));
        let (transport, outbound_rx) = ChannelTransport::new(16);
        let dispatcher = Dispatcher::new(
            Arc::clone(&registry),
            transport.clone() as Arc<dyn Transport>,
            default_timeout,
        );
        (dispatcher, registry, transport, outbound_rx)
    }

    #[tokio::test]
    async fn test_fire_and_forget_registers_nothing() {
        let (dispatcher, registry, _transport, mut outbound_rx) =
            setup(Duration::from_secs(5));

        let result = dispatcher
            .dispatch("send-typing", Map::new(), TransactionRequest::None, None)
            .await
            .unwrap();

        assert_eq!(result, Value::Null);
        assert_eq!(registry.pending_count(), 0);

        let sent = outbound_rx.recv().await.unwrap();
        assert_eq!(sent.action, "send-typing");
        assert!(sent.transaction_id.is_none());
    }

    #[tokio::test]
    async fn test_transport_unavailable_short_circuits() {
        let (dispatcher, registry, transport, _outbound_rx) = setup(Duration::from_secs(5));
        transport.set_connected(false);

        let start = std::time::Instant::now();
        let result = dispatcher
            .dispatch("answer-call", Map::new(), TransactionRequest::Generic, None)
            .await;

        assert!(matches!(result, Err(HelperError::TransportUnavailable)));
        assert_eq!(registry.pending_count(), 0);
        // Synchronous failure, no timeout wait incurred.
        assert!(start.elapsed() < Duration::from_millis(100));
        assert_eq!(registry.snapshot().registered, 0);
    }

    #[tokio::test]
    async fn test_send_failure_cancels_registration() {
        let (dispatcher, registry, _transport, outbound_rx) = setup(Duration::from_secs(5));
        // Transport still claims connected but the channel is gone.
        drop(outbound_rx);

        let result = dispatcher
            .dispatch("answer-call", Map::new(), TransactionRequest::Generic, None)
            .await;

        assert!(matches!(result, Err(HelperError::TransportUnavailable)));
        assert_eq!(registry.pending_count(), 0);
        assert_eq!(registry.snapshot().cancelled, 1);
    }

    #[tokio::test]
    async fn test_correlated_dispatch_resolves() {
        let (dispatcher, registry, _transport, mut outbound_rx) =
            setup(Duration::from_secs(5));

        let reg = Arc::clone(&registry);
        let responder = tokio::spawn(async move {
            let sent = outbound_rx.recv().await.unwrap();
            let id = sent.transaction_id.unwrap();
            reg.resolve(id, json!({"link": "facetime.example/abc"}));
        });

        let mut args = Map::new();
        args.insert("callUuid".into(), json!("uuid-1"));
        let result = dispatcher
            .dispatch(
                "create-call-link",
                args,
                TransactionRequest::Generic,
                None,
            )
            .await
            .unwrap();

        assert_eq!(result["link"], "facetime.example/abc");
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_ack_kind_discards_payload() {
        let (dispatcher, registry, _transport, mut outbound_rx) =
            setup(Duration::from_secs(5));

        let reg = Arc::clone(&registry);
        tokio::spawn(async move {
            let sent = outbound_rx.recv().await.unwrap();
            reg.resolve(sent.transaction_id.unwrap(), json!({"ignored": true}));
        });

        let result = dispatcher
            .dispatch("mark-chat-read", Map::new(), TransactionRequest::Ack, None)
            .await
            .unwrap();
        assert_eq!(result, Value::Null);
    }

    #[tokio::test]
    async fn test_helper_rejection_propagates() {
        let (dispatcher, registry, _transport, mut outbound_rx) =
            setup(Duration::from_secs(5));

        let reg = Arc::clone(&registry);
        tokio::spawn(async move {
            let sent = outbound_rx.recv().await.unwrap();
            reg.reject(
                sent.transaction_id.unwrap(),
                HelperError::helper("call already ended"),
            );
        });

        let result = dispatcher
            .dispatch("answer-call", Map::new(), TransactionRequest::Generic, None)
            .await;

        match result {
            Err(HelperError::Helper(data)) => assert_eq!(data.message, "call already ended"),
            other => panic!("expected helper error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unanswered_dispatch_times_out_via_sweep() {
        let (dispatcher, registry, _transport, mut outbound_rx) =
            setup(Duration::from_millis(50));

        let reg = Arc::clone(&registry);
        tokio::spawn(async move {
            // Swallow the outbound message, never answer; sweep periodically.
            let _ = outbound_rx.recv().await;
            loop {
                tokio::time::sleep(Duration::from_millis(20)).await;
                reg.remove_expired();
            }
        });

        let start = std::time::Instant::now();
        let result = dispatcher
            .dispatch("admit-participant", Map::new(), TransactionRequest::Generic, None)
            .await;

        assert!(matches!(result, Err(HelperError::Timeout { .. })));
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(registry.pending_count(), 0);
    }
}

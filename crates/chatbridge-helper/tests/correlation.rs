//! End-to-end correlation flow over the in-memory channel transport:
//! dispatcher -> transport -> fake helper -> inbound router -> registry.

use chatbridge_helper::transport::channel::ChannelTransport;
use chatbridge_helper::transport::Transport;
use chatbridge_helper::{
    Dispatcher, HelperClient, HelperError, InboundRouter, TransactionRegistry,
};
use chatbridge_types::{ActionMessage, HelperMessage, MessageStatus};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct Harness {
    client: HelperClient,
    registry: Arc<TransactionRegistry>,
    transport: Arc<ChannelTransport>,
    outbound_rx: mpsc::Receiver<ActionMessage>,
    inbound_tx: mpsc::Sender<HelperMessage>,
}

fn harness(default_timeout: Duration) -> Harness {
    let registry = Arc::new(TransactionRegistry::new(default_timeout));
    let (transport, outbound_rx) = ChannelTransport::new(32);
    let (inbound_tx, inbound_rx) = mpsc::channel(32);

    let (router, _events) = InboundRouter::new(Arc::clone(&registry), inbound_rx, 16);
    tokio::spawn(router.run());

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&registry),
        Arc::clone(&transport) as Arc<dyn Transport>,
        default_timeout,
    ));

    Harness {
        client: HelperClient::new(dispatcher),
        registry,
        transport,
        outbound_rx,
        inbound_tx,
    }
}

fn ok_response(command: &ActionMessage, payload: serde_json::Value) -> HelperMessage {
    HelperMessage {
        transaction_id: command.transaction_id,
        status: MessageStatus::Ok,
        payload: Some(payload),
        error: None,
    }
}

#[tokio::test]
async fn helper_answers_and_caller_is_resumed_once() {
    let mut h = harness(Duration::from_secs(5));

    let inbound_tx = h.inbound_tx.clone();
    let helper = tokio::spawn(async move {
        let command = h.outbound_rx.recv().await.unwrap();
        assert_eq!(command.action, "send-message");
        inbound_tx
            .send(ok_response(&command, json!({"guid": "msg-1"})))
            .await
            .unwrap();
        // Duplicate delivery of the same response must be inert.
        inbound_tx
            .send(ok_response(&command, json!({"guid": "msg-1-dup"})))
            .await
            .unwrap();
    });

    let payload = h
        .client
        .send_message("iMessage;-;+1555", "hello", "temp-1")
        .await
        .unwrap();
    assert_eq!(payload["guid"], "msg-1");

    helper.await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.registry.pending_count(), 0);
    assert_eq!(h.registry.snapshot().unknown, 1);
}

#[tokio::test]
async fn out_of_order_responses_match_their_own_callers() {
    let mut h = harness(Duration::from_secs(5));

    let inbound_tx = h.inbound_tx.clone();
    let helper = tokio::spawn(async move {
        let first = h.outbound_rx.recv().await.unwrap();
        let second = h.outbound_rx.recv().await.unwrap();
        // Reply to the second command first.
        inbound_tx
            .send(ok_response(&second, json!({"order": "second"})))
            .await
            .unwrap();
        inbound_tx
            .send(ok_response(&first, json!({"order": "first"})))
            .await
            .unwrap();
    });

    let (first, second) = tokio::join!(
        h.client.answer_call("call-1"),
        h.client.admit_participant("conv-1", "handle-1"),
    );
    assert_eq!(first.unwrap()["order"], "first");
    assert_eq!(second.unwrap()["order"], "second");
    helper.await.unwrap();
}

#[tokio::test]
async fn helper_error_reaches_the_caller_as_rejection() {
    let mut h = harness(Duration::from_secs(5));

    let inbound_tx = h.inbound_tx.clone();
    tokio::spawn(async move {
        let command = h.outbound_rx.recv().await.unwrap();
        inbound_tx
            .send(HelperMessage {
                transaction_id: command.transaction_id,
                status: MessageStatus::Error,
                payload: None,
                error: Some("participant not waiting".into()),
            })
            .await
            .unwrap();
    });

    let result = h.client.admit_participant("conv-1", "handle-9").await;
    match result {
        Err(HelperError::Helper(data)) => assert_eq!(data.message, "participant not waiting"),
        other => panic!("expected helper rejection, got {other:?}"),
    }
    assert_eq!(h.registry.pending_count(), 0);
}

#[tokio::test]
async fn silent_helper_times_out_within_margin() {
    let h = harness(Duration::from_millis(100));
    tokio::spawn(chatbridge_helper::sweep_task(
        Arc::clone(&h.registry),
        Duration::from_millis(20),
    ));

    let start = std::time::Instant::now();
    let result = h.client.create_call_link().await;

    assert!(matches!(result, Err(HelperError::Timeout { .. })));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(1000));
    assert_eq!(h.registry.pending_count(), 0);
}

#[tokio::test]
async fn disconnected_transport_fails_fast_without_registering() {
    let h = harness(Duration::from_secs(5));
    h.transport.set_connected(false);

    let result = h.client.answer_call("call-1").await;
    assert!(matches!(result, Err(HelperError::TransportUnavailable)));
    assert_eq!(h.registry.snapshot().registered, 0);
}

#[tokio::test]
async fn fire_and_forget_leaves_no_trace_in_the_registry() {
    let mut h = harness(Duration::from_secs(5));

    h.client.send_typing("iMessage;-;+1555").await.unwrap();
    h.client.stop_typing("iMessage;-;+1555").await.unwrap();

    assert_eq!(h.outbound_rx.recv().await.unwrap().action, "send-typing");
    assert_eq!(h.outbound_rx.recv().await.unwrap().action, "stop-typing");
    assert_eq!(h.registry.snapshot().registered, 0);
    assert_eq!(h.registry.pending_count(), 0);
}

#[tokio::test]
async fn unsolicited_events_reach_subscribers_not_the_registry() {
    let registry = Arc::new(TransactionRegistry::new(Duration::from_secs(5)));
    let (inbound_tx, inbound_rx) = mpsc::channel(8);
    let (router, mut events) = InboundRouter::new(Arc::clone(&registry), inbound_rx, 8);
    tokio::spawn(router.run());

    inbound_tx
        .send(HelperMessage {
            transaction_id: None,
            status: MessageStatus::Ok,
            payload: Some(json!({"event": "incoming-call", "caller": "+1555"})),
            error: None,
        })
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.payload.unwrap()["caller"], "+1555");
    assert_eq!(registry.snapshot().unknown, 0);
}

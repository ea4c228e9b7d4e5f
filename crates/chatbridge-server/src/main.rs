//! chatbridge server binary.
//!
//! Wires the helper socket, transaction registry, sweep task, inbound router
//! and the HTTP server, then serves until interrupted.

use anyhow::{Context, Result};
use chatbridge_helper::transport::Transport;
use chatbridge_helper::{
    sweep_task, Dispatcher, HelperClient, InboundRouter, SocketAcceptor, SocketTransport,
    TransactionRegistry,
};
use chatbridge_server::{build_router, AppState, BridgeConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = BridgeConfig::load(config_path.as_deref()).context("loading configuration")?;

    info!("===========================================");
    info!("  chatbridge v{}", chatbridge_helper::VERSION);
    info!("===========================================");

    // Shared correlation core.
    let registry = Arc::new(TransactionRegistry::new(config.helper.default_timeout));
    tokio::spawn(sweep_task(
        Arc::clone(&registry),
        config.helper.sweep_interval,
    ));

    // Helper socket transport.
    let transport = SocketTransport::new();
    let (inbound_tx, inbound_rx) = mpsc::channel(config.helper.inbound_buffer);
    let acceptor = SocketAcceptor::bind(
        &config.helper.socket_path,
        Arc::clone(&transport),
        inbound_tx,
    )
    .context("binding helper socket")?;
    tokio::spawn(acceptor.run());

    // Inbound routing plus a subscriber that logs unsolicited helper events.
    let (inbound_router, events) =
        InboundRouter::new(Arc::clone(&registry), inbound_rx, config.helper.event_buffer);
    tokio::spawn(inbound_router.run());
    tokio::spawn(log_helper_events(events));

    // Dispatch surface.
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&registry),
        Arc::clone(&transport) as Arc<dyn Transport>,
        config.helper.default_timeout,
    ));
    let state = AppState {
        client: Arc::new(HelperClient::new(dispatcher)),
        registry,
        transport: transport as Arc<dyn Transport>,
    };

    let router = build_router(state, config.cors_enabled);
    let addr = config.bind_addr();
    info!(addr = %addr, socket = %config.helper.socket_path.display(), "Starting chatbridge server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("chatbridge server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for shutdown signal");
    } else {
        info!("Received shutdown signal");
    }
}

async fn log_helper_events(mut events: broadcast::Receiver<chatbridge_types::HelperMessage>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                info!(payload = ?event.payload, "Helper event");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped = skipped, "Helper event subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

//! Unix domain socket transport.
//!
//! The bridge owns the socket; the helper process dials in. Frames are
//! newline-delimited JSON in both directions. One helper connection is live
//! at a time; a new connection supersedes the previous one even if the old
//! stream never closed, since a restarted helper cannot wait behind its own
//! dead socket.

use crate::error::TransportError;
use crate::transport::Transport;
use async_trait::async_trait;
use chatbridge_types::{ActionMessage, HelperMessage};
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixListener;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

/// Send half of the helper socket.
pub struct SocketTransport {
    /// Write half of the live helper connection, if any
    writer: Mutex<Option<OwnedWriteHalf>>,
    /// Fast readiness flag for the dispatcher's precondition check
    connected: AtomicBool,
}

impl SocketTransport {
    /// Create a transport with no helper attached yet.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            writer: Mutex::new(None),
            connected: AtomicBool::new(false),
        })
    }

    async fn attach(&self, write_half: OwnedWriteHalf) {
        let mut guard = self.writer.lock().await;
        *guard = Some(write_half);
        self.connected.store(true, Ordering::SeqCst);
    }

    async fn detach(&self) {
        let mut guard = self.writer.lock().await;
        *guard = None;
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for SocketTransport {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send(&self, message: &ActionMessage) -> Result<(), TransportError> {
        let mut frame =
            serde_json::to_vec(message).map_err(|e| TransportError::Encode(e.to_string()))?;
        frame.push(b'\n');

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::NotConnected)?;

        if let Err(e) = writer.write_all(&frame).await {
            // Connection is dead; drop the write half so is_connected flips.
            *guard = None;
            self.connected.store(false, Ordering::SeqCst);
            return Err(TransportError::SendFailed(e.to_string()));
        }
        Ok(())
    }
}

/// Accept loop for the helper socket.
///
/// Owns the listener and the inbound channel's send half; decoded messages
/// flow to whoever consumes the matching receiver (the inbound router).
pub struct SocketAcceptor {
    listener: UnixListener,
    transport: Arc<SocketTransport>,
    inbound_tx: mpsc::Sender<HelperMessage>,
}

impl SocketAcceptor {
    /// Bind the helper socket, removing a stale socket file from a previous
    /// run.
    pub fn bind(
        path: &Path,
        transport: Arc<SocketTransport>,
        inbound_tx: mpsc::Sender<HelperMessage>,
    ) -> io::Result<Self> {
        let _ = std::fs::remove_file(path);
        let listener = UnixListener::bind(path)?;
        info!(path = %path.display(), "Helper socket bound");
        Ok(Self {
            listener,
            transport,
            inbound_tx,
        })
    }

    /// Run the accept loop. Spawn as a background task.
    pub async fn run(self) {
        let mut current: Option<OwnedReadHalf> = None;
        loop {
            match current.take() {
                None => match self.listener.accept().await {
                    Ok((stream, _addr)) => {
                        info!("Helper connected");
                        let (read_half, write_half) = stream.into_split();
                        self.transport.attach(write_half).await;
                        current = Some(read_half);
                    }
                    Err(e) => {
                        error!(error = %e, "Helper socket accept failed");
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    }
                },
                Some(read_half) => {
                    // Keep accepting while a connection is live: a reconnect
                    // must not queue behind a stale stream that never closed.
                    tokio::select! {
                        channel_open = self.read_loop(read_half) => {
                            self.transport.detach().await;
                            info!("Helper disconnected");
                            if !channel_open {
                                // Nobody is consuming inbound messages anymore.
                                break;
                            }
                        }
                        accepted = self.listener.accept() => match accepted {
                            Ok((stream, _addr)) => {
                                info!("Helper reconnected, dropping stale connection");
                                let (read_half, write_half) = stream.into_split();
                                self.transport.attach(write_half).await;
                                current = Some(read_half);
                            }
                            Err(e) => {
                                // The select already consumed the old stream.
                                error!(error = %e, "Helper socket accept failed");
                                self.transport.detach().await;
                                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                            }
                        },
                    }
                }
            }
        }
    }

    /// Read frames until EOF or error. Returns false if the inbound channel
    /// closed, meaning the acceptor should shut down.
    async fn read_loop(&self, read_half: OwnedReadHalf) -> bool {
        let mut lines = BufReader::new(read_half).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<HelperMessage>(&line) {
                        Ok(message) => {
                            debug!(
                                correlated = message.is_response(),
                                "Received helper message"
                            );
                            if self.inbound_tx.send(message).await.is_err() {
                                warn!("Inbound channel closed, stopping helper socket");
                                return false;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "Discarding undecodable helper frame");
                        }
                    }
                }
                Ok(None) => return true,
                Err(e) => {
                    warn!(error = %e, "Helper socket read error");
                    return true;
                }
            }
        }
    }
}

//! Connection registry and per-connection session loop
//!
//! Every accepted session gets a [`ConnId`] and an outbound channel. The
//! registry is the only bridge between a captured connection identity and the
//! live socket: a deferred work item looks its connection up here at execution
//! time, so a session that closed in the meantime surfaces as
//! [`BridgeError::ConnectionGone`] instead of a dangling reference.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use ocd_core::{BridgeError, BridgeResult, ConnId};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::codec::FrameCodec;
use crate::dispatch::{MessageDispatcher, Outcome};
use crate::server::ServerState;

/// Buffered outbound messages per connection.
const OUTBOUND_DEPTH: usize = 32;

type Outbound = mpsc::Sender<Message>;

/// Shared map of live sessions.
#[derive(Clone, Default, Debug)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<ConnId, Outbound>>>,
    next_id: Arc<AtomicU64>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session and hand out its identity.
    pub fn register(&self, outbound: Outbound) -> ConnId {
        let id = ConnId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.write().insert(id, outbound);
        id
    }

    /// Drop a session. Safe to call for an id that is already gone.
    pub fn deregister(&self, id: ConnId) {
        self.inner.write().remove(&id);
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Drop every session. Used on server stop; in-flight session loops
    /// notice when their outbound channel closes.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Queue a message for a session's writer.
    ///
    /// A missing or closed entry means the connection closed since the id was
    /// captured; that is a recoverable condition, never a panic.
    pub async fn send(&self, id: ConnId, message: Message) -> BridgeResult<()> {
        let outbound = self
            .inner
            .read()
            .get(&id)
            .cloned()
            .ok_or(BridgeError::ConnectionGone(id))?;
        outbound
            .send(message)
            .await
            .map_err(|_| BridgeError::ConnectionGone(id))
    }
}

/// Session loop for one upgraded connection.
///
/// Frame handling is sequential per connection: no two decodes interleave on
/// the same socket. Outbound pushes from deferred work arrive through the
/// registry channel and are written by this loop, so the socket has a single
/// writer.
pub(crate) async fn run_session(socket: WebSocket, state: ServerState) {
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel(OUTBOUND_DEPTH);
    let conn_id = state.registry.register(outbound_tx);
    info!(%conn_id, "handshake done, new connection opened");

    let dispatcher = MessageDispatcher::new(state.queue.clone());
    let mut shutdown = state.shutdown.clone();

    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                    // transport keepalive, answered below the codec
                }
                Some(Ok(raw)) => {
                    if !handle_frame(&dispatcher, conn_id, raw, &mut sink).await {
                        break;
                    }
                }
                Some(Err(e)) => {
                    warn!(%conn_id, error = %e, "failed to receive frame");
                    break;
                }
                None => break,
            },
            pushed = outbound_rx.recv() => match pushed {
                Some(message) => {
                    if let Err(e) = sink.send(message).await {
                        warn!(%conn_id, error = %e, "async send failed on socket");
                        break;
                    }
                }
                // registry entry dropped, e.g. by server stop
                None => break,
            },
            _ = shutdown.changed() => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }

    state.registry.deregister(conn_id);
    info!(%conn_id, "connection closed");
}

/// Dispatch one inbound frame. Returns false when the session must end.
async fn handle_frame(
    dispatcher: &MessageDispatcher,
    conn_id: ConnId,
    raw: Message,
    sink: &mut (impl SinkExt<Message> + Unpin),
) -> bool {
    match dispatcher.handle(conn_id, raw) {
        Ok(Outcome::Echo(frame)) => {
            debug!(%conn_id, len = frame.len(), "echoing frame");
            match FrameCodec::encode(&frame) {
                // send failures are reported but the connection stays open
                // for the transport layer to close if needed
                Ok(reply) => {
                    if sink.send(reply).await.is_err() {
                        warn!(%conn_id, "failed to send echo frame");
                    }
                }
                Err(e) => warn!(%conn_id, error = %e, "failed to encode echo frame"),
            }
            true
        }
        Ok(Outcome::AsyncScheduled) => true,
        Ok(Outcome::Closed) => false,
        Err(e) if e.is_recoverable() => {
            // request-local failure (queue full, stale reference); the
            // session continues
            warn!(%conn_id, error = %e, "frame handling failed");
            true
        }
        Err(e) => {
            warn!(%conn_id, error = %e, "frame handling failed, closing session");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_to_unknown_id_is_connection_gone() {
        let registry = ConnectionRegistry::new();
        let err = registry
            .send(ConnId(7), Message::Text("x".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::ConnectionGone(ConnId(7))));
    }

    #[tokio::test]
    async fn send_to_closed_channel_is_connection_gone() {
        let registry = ConnectionRegistry::new();
        let (tx, rx) = mpsc::channel(1);
        let id = registry.register(tx);
        drop(rx);
        let err = registry
            .send(id, Message::Text("x".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::ConnectionGone(_)));
    }

    #[tokio::test]
    async fn register_deregister_bookkeeping() {
        let registry = ConnectionRegistry::new();
        assert!(registry.is_empty());

        let (tx_a, _rx_a) = mpsc::channel(1);
        let (tx_b, _rx_b) = mpsc::channel(1);
        let a = registry.register(tx_a);
        let b = registry.register(tx_b);
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);

        registry.deregister(a);
        assert_eq!(registry.len(), 1);
        // double deregister is harmless
        registry.deregister(a);
        assert_eq!(registry.len(), 1);

        registry.clear();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn send_delivers_to_registered_session() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = mpsc::channel(4);
        let id = registry.register(tx);

        registry.send(id, Message::Text("hi".into())).await.unwrap();
        match rx.recv().await {
            Some(Message::Text(t)) => assert_eq!(t.as_str(), "hi"),
            other => panic!("expected text message, got {other:?}"),
        }
    }
}

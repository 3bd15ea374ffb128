//! Connection-accepting server
//!
//! Owns the lifecycle of a single listening endpoint that accepts
//! framed-message connections on `GET /ws`. Start binds the endpoint,
//! registers the route handlers and spawns the deferred-work consumer; stop
//! releases everything. Exactly one server runs at a time, enforced by the
//! lifecycle manager's handle slot rather than internal locking.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use ocd_core::{BridgeError, BridgeResult, ConnId, Frame, ServerConfig};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::conn::{self, ConnectionRegistry};
use crate::work::{self, DeferredWorkQueue, WorkContext};

/// How long stop waits for the serve loop to wind down before cutting
/// lingering sessions loose.
const STOP_GRACE: Duration = Duration::from_millis(500);

/// State shared with the route handlers.
#[derive(Clone)]
pub(crate) struct ServerState {
    pub registry: ConnectionRegistry,
    pub queue: DeferredWorkQueue,
    pub shutdown: watch::Receiver<bool>,
}

pub struct ConnectionServer;

impl ConnectionServer {
    /// Bind the listening endpoint and return a handle to the running server.
    ///
    /// Fails with [`BridgeError::Bind`] when the port is unavailable; nothing
    /// is spawned in that case.
    pub async fn start(config: &ServerConfig) -> BridgeResult<ServerHandle> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.port))
            .await
            .map_err(BridgeError::Bind)?;
        let local_addr = listener.local_addr()?;

        let registry = ConnectionRegistry::new();
        let (queue, work_rx) = DeferredWorkQueue::bounded(config.work_queue_depth);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let state = ServerState {
            registry: registry.clone(),
            queue: queue.clone(),
            shutdown: shutdown_rx.clone(),
        };
        let app = router(state);

        let mut serve_shutdown = shutdown_rx.clone();
        let serve_task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = serve_shutdown.changed().await;
            });
            if let Err(e) = serve.await {
                error!(error = %e, "connection server exited with error");
            }
        });

        let consumer_task =
            work::spawn_consumer(work_rx, WorkContext::new(registry.clone()), shutdown_rx);

        info!(addr = %local_addr, "connection server started");
        Ok(ServerHandle {
            local_addr,
            registry,
            queue,
            shutdown: shutdown_tx,
            serve_task: Some(serve_task),
            consumer_task: Some(consumer_task),
        })
    }
}

/// Opaque identity of a running server instance.
///
/// Held exclusively by the lifecycle manager; everything else receives it by
/// reference per call. A live handle implies the endpoint is accepting
/// connections.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    registry: ConnectionRegistry,
    queue: DeferredWorkQueue,
    shutdown: watch::Sender<bool>,
    serve_task: Option<JoinHandle<()>>,
    consumer_task: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Address the endpoint is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Number of currently open sessions.
    pub fn open_connections(&self) -> usize {
        self.registry.len()
    }

    /// The server's deferred work queue.
    pub fn queue(&self) -> &DeferredWorkQueue {
        &self.queue
    }

    /// Async send primitive: push a frame to a connection from outside its
    /// request-handling context.
    pub async fn send_async(&self, conn: ConnId, frame: Frame) -> BridgeResult<()> {
        WorkContext::new(self.registry.clone())
            .send_async(conn, frame)
            .await
    }

    /// Release the endpoint and all per-connection resources.
    ///
    /// Best effort: in-flight work items may still execute against sessions
    /// that are concurrently torn down; their sends fail harmlessly. Calling
    /// stop again is a no-op.
    pub async fn stop(&mut self) -> BridgeResult<()> {
        let Some(mut serve_task) = self.serve_task.take() else {
            return Ok(());
        };

        let _ = self.shutdown.send(true);

        if tokio::time::timeout(STOP_GRACE, &mut serve_task)
            .await
            .is_err()
        {
            // sessions that never got the close are cut loose here
            serve_task.abort();
            let _ = serve_task.await;
        }

        self.registry.clear();

        if let Some(mut consumer_task) = self.consumer_task.take() {
            if tokio::time::timeout(STOP_GRACE, &mut consumer_task)
                .await
                .is_err()
            {
                consumer_task.abort();
                let _ = consumer_task.await;
            }
        }

        info!(addr = %self.local_addr, "connection server stopped");
        Ok(())
    }

    /// True until `stop` has run.
    pub fn is_running(&self) -> bool {
        self.serve_task.is_some()
    }
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /ws` - protocol upgrade. The handshake is acknowledged here and the
/// connection stays open for subsequent frames.
async fn ws_upgrade(State(state): State<ServerState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| conn::run_session(socket, state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::WorkItem;

    fn ephemeral_config() -> ServerConfig {
        ServerConfig {
            port: 0,
            work_queue_depth: 4,
        }
    }

    #[tokio::test]
    async fn start_and_stop() {
        let mut handle = ConnectionServer::start(&ephemeral_config()).await.unwrap();
        assert!(handle.is_running());
        assert_ne!(handle.local_addr().port(), 0);
        assert_eq!(handle.open_connections(), 0);

        handle.stop().await.unwrap();
        assert!(!handle.is_running());
    }

    #[tokio::test]
    async fn stop_twice_is_a_no_op() {
        let mut handle = ConnectionServer::start(&ephemeral_config()).await.unwrap();
        handle.stop().await.unwrap();
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let first = ConnectionServer::start(&ephemeral_config()).await.unwrap();
        let taken = ServerConfig {
            port: first.local_addr().port(),
            work_queue_depth: 4,
        };
        let err = ConnectionServer::start(&taken).await.unwrap_err();
        assert!(matches!(err, BridgeError::Bind(_)));

        let mut first = first;
        first.stop().await.unwrap();
    }

    #[tokio::test]
    async fn port_is_released_after_stop() {
        let mut handle = ConnectionServer::start(&ephemeral_config()).await.unwrap();
        let port = handle.local_addr().port();
        handle.stop().await.unwrap();

        let fixed = ServerConfig {
            port,
            work_queue_depth: 4,
        };
        let mut again = ConnectionServer::start(&fixed).await.unwrap();
        assert_eq!(again.local_addr().port(), port);
        again.stop().await.unwrap();
    }

    #[tokio::test]
    async fn queue_rejects_after_stop() {
        let mut handle = ConnectionServer::start(&ephemeral_config()).await.unwrap();
        let queue = handle.queue().clone();
        handle.stop().await.unwrap();

        let err = queue
            .enqueue(WorkItem::new(ConnId(0), |_ctx| async {}))
            .unwrap_err();
        assert!(matches!(err, BridgeError::QueueRejected));
    }

    #[tokio::test]
    async fn send_async_without_session_is_connection_gone() {
        let mut handle = ConnectionServer::start(&ephemeral_config()).await.unwrap();
        let err = handle
            .send_async(ConnId(1234), Frame::text("Async data"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::ConnectionGone(_)));
        handle.stop().await.unwrap();
    }
}

//! Test harness for bridge integration tests
//!
//! Runs the real lifecycle manager against a fixed port and drives it with
//! interface events, the way the platform radio layer would.

use std::time::Duration;

use ocd_bridge::ServerLifecycleManager;
use ocd_core::{interface_event_channel, InterfaceEvent, ServerConfig};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Manages one bridge instance for the duration of a test.
pub struct BridgeTestHarness {
    events_tx: mpsc::Sender<InterfaceEvent>,
    manager_task: JoinHandle<()>,
    port: u16,
}

impl BridgeTestHarness {
    /// Spawn the lifecycle manager on a fixed port and wait until its
    /// unconditional init start has the endpoint accepting connections.
    pub async fn start(port: u16) -> Self {
        let config = ServerConfig {
            port,
            work_queue_depth: 16,
        };
        let (events_tx, events_rx) = interface_event_channel(16);
        let manager_task = tokio::spawn(ServerLifecycleManager::new(config).run(events_rx));

        let harness = Self {
            events_tx,
            manager_task,
            port,
        };
        harness.wait_until_reachable().await;
        harness
    }

    pub fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}/ws", self.port)
    }

    /// Open a framed-message connection to the bridge.
    pub async fn connect(&self) -> WsClient {
        let (client, _response) = connect_async(self.ws_url())
            .await
            .expect("websocket upgrade failed");
        client
    }

    /// Deliver an interface event the way the radio layer would.
    pub async fn send_event(&self, event: InterfaceEvent) {
        self.events_tx
            .send(event)
            .await
            .expect("event source closed unexpectedly");
    }

    /// True once the endpoint accepts an upgrade.
    pub async fn reachable(&self) -> bool {
        connect_async(self.ws_url()).await.is_ok()
    }

    async fn wait_until_reachable(&self) {
        for _ in 0..50 {
            if self.reachable().await {
                return;
            }
            sleep(Duration::from_millis(100)).await;
        }
        panic!("bridge on port {} never became reachable", self.port);
    }

    /// Wait until connection attempts fail, i.e. the server stopped.
    pub async fn wait_until_unreachable(&self) {
        for _ in 0..50 {
            if !self.reachable().await {
                return;
            }
            sleep(Duration::from_millis(100)).await;
        }
        panic!("bridge on port {} never stopped", self.port);
    }

    /// Close the event source and wait for the manager to wind down.
    pub async fn shutdown(self) {
        drop(self.events_tx);
        let _ = self.manager_task.await;
    }
}

//! Server lifecycle driven by interface events
//!
//! The manager owns the single server-handle slot and is its only mutator.
//! Events arrive serially from the interface layer, so the Stopped/Running
//! state machine needs no locking: InterfaceUp starts the server when the
//! slot is empty, InterfaceDown stops it when the slot is populated, and
//! every other event/state pair is a no-op.

use std::net::SocketAddr;

use ocd_core::{event, InterfaceEvent, InterfaceEvents, ServerConfig};
use tracing::{debug, error, info};

use crate::server::{ConnectionServer, ServerHandle};

pub struct ServerLifecycleManager {
    config: ServerConfig,
    /// The one live-server reference, cardinality 0 or 1 process-wide.
    slot: Option<ServerHandle>,
}

impl ServerLifecycleManager {
    pub fn new(config: ServerConfig) -> Self {
        Self { config, slot: None }
    }

    /// Consume the interface event stream until the source closes.
    ///
    /// Performs one unconditional start attempt first: the interface may
    /// already have been up before this handler registration completed, in
    /// which case no InterfaceUp event will ever arrive.
    pub async fn run(mut self, mut events: InterfaceEvents) {
        self.try_start().await;

        while let Some(event) = events.recv().await {
            self.on_event(event).await;
        }

        debug!("interface event source closed");
        self.try_stop().await;
    }

    /// Apply one interface event to the state machine.
    pub async fn on_event(&mut self, event: InterfaceEvent) {
        match event {
            InterfaceEvent::InterfaceUp => self.try_start().await,
            InterfaceEvent::InterfaceDown => self.try_stop().await,
            InterfaceEvent::StationJoined { mac, aid } => {
                info!(mac = %event::format_mac(&mac), aid, "station joined");
            }
            InterfaceEvent::StationLeft { mac, aid } => {
                info!(mac = %event::format_mac(&mac), aid, "station left");
            }
        }
    }

    /// Start the server if the slot is empty.
    ///
    /// A start failure leaves the slot empty and is logged, not retried; the
    /// next InterfaceUp transition gets another attempt.
    async fn try_start(&mut self) {
        if self.slot.is_some() {
            return;
        }
        info!("starting connection server");
        match ConnectionServer::start(&self.config).await {
            Ok(handle) => self.slot = Some(handle),
            Err(e) => error!(error = %e, "failed to start connection server"),
        }
    }

    /// Stop the server if the slot is populated.
    ///
    /// On stop failure the slot keeps the handle: a stuck handle is
    /// preferable to a dangling stop that silently drops state.
    async fn try_stop(&mut self) {
        let Some(handle) = self.slot.as_mut() else {
            return;
        };
        info!("stopping connection server");
        match handle.stop().await {
            Ok(()) => self.slot = None,
            Err(e) => error!(error = %e, "failed to stop connection server"),
        }
    }

    /// True while a server instance is live.
    pub fn is_running(&self) -> bool {
        self.slot.is_some()
    }

    /// Address of the running server, if any.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.slot.as_ref().map(|h| h.local_addr())
    }
}

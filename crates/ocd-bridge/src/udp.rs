//! Secondary datagram listener
//!
//! Independent long-lived task next to the framed-message server. Framing on
//! this channel is deliberately trivial: datagrams are logged and echoed back
//! to the sender. A bind failure is reported and ends the task without
//! taking the process down.

use std::net::{Ipv4Addr, SocketAddr};

use ocd_core::{BridgeError, BridgeResult, DatagramConfig};
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

/// Largest datagram the listener accepts.
const MAX_DATAGRAM: usize = 1500;

#[derive(Debug)]
pub struct DatagramListener {
    socket: UdpSocket,
}

impl DatagramListener {
    /// Bind the datagram endpoint.
    pub async fn bind(config: &DatagramConfig) -> BridgeResult<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, config.port))
            .await
            .map_err(BridgeError::Bind)?;
        info!(addr = %socket.local_addr()?, "datagram listener ready");
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> BridgeResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive loop. Runs until the surrounding task is dropped.
    pub async fn run(self) {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((len, peer)) => {
                    debug!(%peer, len, "datagram received");
                    if let Err(e) = self.socket.send_to(&buf[..len], peer).await {
                        warn!(%peer, error = %e, "datagram echo failed");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "datagram receive failed");
                }
            }
        }
    }
}

/// Spawn the listener as its own task, logging instead of failing the caller.
pub fn spawn(config: DatagramConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match DatagramListener::bind(&config).await {
            Ok(listener) => listener.run().await,
            Err(e) => error!(port = config.port, error = %e, "datagram listener not started"),
        }
    })
}

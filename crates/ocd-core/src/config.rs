//! Bridge configuration
//!
//! Loaded from a TOML file by the daemon; every field has a default so the
//! bridge runs with no config at all.

use serde::Deserialize;

/// Top-level configuration for the bridge daemon.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeConfig {
    pub server: ServerConfig,
    pub udp: DatagramConfig,
    pub advertise: AdvertiseConfig,
}

/// Connection-accepting endpoint settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Fixed local port for the framed-message endpoint.
    pub port: u16,
    /// Depth of the deferred work queue owned by the server.
    pub work_queue_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            work_queue_depth: 16,
        }
    }
}

/// Secondary datagram listener settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DatagramConfig {
    pub port: u16,
}

impl Default for DatagramConfig {
    fn default() -> Self {
        Self { port: 3333 }
    }
}

/// Name-resolution advertisement settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AdvertiseConfig {
    /// Hostname published so clients can discover the endpoint without a
    /// numeric address.
    pub hostname: String,
    /// Human-readable instance label.
    pub instance: String,
}

impl Default for AdvertiseConfig {
    fn default() -> Self {
        Self {
            hostname: "ocd-device".to_string(),
            instance: "Open Car Diagnostics".to_string(),
        }
    }
}

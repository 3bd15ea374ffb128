//! Name-resolution advertisement boundary
//!
//! Clients discover the bridge by a fixed hostname and a human-readable
//! instance label rather than a numeric address. The platform responder that
//! actually answers queries lives outside this crate; the bridge only hands
//! it the records to publish.

use ocd_core::AdvertiseConfig;
use tracing::info;

/// The records published for discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub hostname: String,
    pub instance: String,
}

impl Advertisement {
    pub fn from_config(config: &AdvertiseConfig) -> Self {
        Self {
            hostname: config.hostname.clone(),
            instance: config.instance.clone(),
        }
    }

    /// Hand the records to the platform responder.
    pub fn publish(&self) {
        info!(
            hostname = %self.hostname,
            instance = %self.instance,
            "name-resolution advertisement published"
        );
    }
}

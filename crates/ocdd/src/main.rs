//! ocdd - Open Car Diagnostics bridge daemon
//!
//! Long-running embedded service: framed-message endpoint on `/ws` whose
//! lifetime follows the access-point interface, a secondary datagram
//! listener, and a name-resolution advertisement so clients can find the
//! bridge without a numeric address.
//!
//! Usage:
//!   ocdd [config.toml]
//!
//! Without a config file every setting falls back to its default.

use anyhow::Context;
use ocd_bridge::{udp, Advertisement, ServerLifecycleManager};
use ocd_core::{interface_event_channel, BridgeConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ocdd=info,ocd_bridge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("starting ocdd (Open Car Diagnostics bridge daemon)");

    let config = load_config()?;

    // Secondary datagram listener, independent of the interface lifecycle.
    let _udp_task = udp::spawn(config.udp.clone());

    Advertisement::from_config(&config.advertise).publish();

    // The sender half stays alive for the process lifetime; the platform
    // radio integration feeds interface transitions through it.
    // TODO: wire netlink interface notifications into events_tx once the
    // target platform integration lands.
    let (_events_tx, events_rx) = interface_event_channel(16);

    ServerLifecycleManager::new(config.server.clone())
        .run(events_rx)
        .await;

    Ok(())
}

/// Optional positional argument: path to a TOML config file.
fn load_config() -> anyhow::Result<BridgeConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!(%path, "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {path}"))?;
            toml::from_str(&content).with_context(|| format!("invalid config file {path}"))
        }
        None => {
            tracing::info!("no config file provided, using defaults");
            Ok(BridgeConfig::default())
        }
    }
}

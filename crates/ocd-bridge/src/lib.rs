//! ocd-bridge - Network-service lifecycle and framed-message dispatch
//!
//! This crate is the core of the Open Car Diagnostics bridge: a connection
//! server whose lifetime follows radio/interface state transitions, a frame
//! codec and dispatcher for the `/ws` framed-message channel, and a deferred
//! work queue that decouples inbound handling from asynchronous outbound
//! pushes.
//!
//! # Usage
//!
//! ```ignore
//! use ocd_bridge::ServerLifecycleManager;
//! use ocd_core::{interface_event_channel, BridgeConfig};
//!
//! let config = BridgeConfig::default();
//! let (events_tx, events_rx) = interface_event_channel(16);
//! ServerLifecycleManager::new(config.server).run(events_rx).await;
//! ```

pub mod advertise;
pub mod codec;
pub mod conn;
pub mod dispatch;
pub mod lifecycle;
pub mod server;
pub mod udp;
pub mod work;

pub use advertise::Advertisement;
pub use codec::FrameCodec;
pub use conn::ConnectionRegistry;
pub use dispatch::{MessageDispatcher, Outcome, ASYNC_REPLY, TRIGGER_TOKEN};
pub use lifecycle::ServerLifecycleManager;
pub use server::{ConnectionServer, ServerHandle};
pub use udp::DatagramListener;
pub use work::{DeferredWorkQueue, WorkContext, WorkItem};

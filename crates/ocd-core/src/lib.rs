//! ocd-core - Core types for the Open Car Diagnostics bridge
//!
//! This crate provides the shared vocabulary of the bridge daemon: the error
//! taxonomy, interface events, the frame model exchanged with connected
//! clients, and the bridge configuration.

pub mod config;
pub mod conn;
pub mod error;
pub mod event;
pub mod frame;

pub use config::{AdvertiseConfig, BridgeConfig, DatagramConfig, ServerConfig};
pub use conn::ConnId;
pub use error::{BridgeError, BridgeResult};
pub use event::{interface_event_channel, InterfaceEvent, InterfaceEvents, Mac};
pub use frame::{Frame, FrameKind};

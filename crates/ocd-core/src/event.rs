//! Interface events delivered by the radio/interface layer
//!
//! The event source is an external collaborator: it delivers events serially,
//! at most once per physical transition. The bridge consumes them through a
//! plain mpsc channel so the lifecycle manager sees a single ordered stream.

use tokio::sync::mpsc;

/// MAC address of a station joining or leaving the access point.
pub type Mac = [u8; 6];

/// A single transition reported by the interface layer.
///
/// Transient and consumed exactly once by its registered handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceEvent {
    /// The access-point interface came up and can accept connections.
    InterfaceUp,
    /// The access-point interface went down.
    InterfaceDown,
    /// A station associated with the access point.
    StationJoined { mac: Mac, aid: u16 },
    /// A station disassociated from the access point.
    StationLeft { mac: Mac, aid: u16 },
}

/// Receiving half handed to the lifecycle manager.
pub type InterfaceEvents = mpsc::Receiver<InterfaceEvent>;

/// Create the event channel connecting the interface layer to the bridge.
///
/// The sender side is the attachment point for the platform radio
/// integration; tests drive it directly.
pub fn interface_event_channel(capacity: usize) -> (mpsc::Sender<InterfaceEvent>, InterfaceEvents) {
    mpsc::channel(capacity)
}

/// Render a MAC address the way the interface logs expect it.
pub fn format_mac(mac: &Mac) -> String {
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    )
}

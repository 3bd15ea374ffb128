//! Common error types for the bridge

use thiserror::Error;

use crate::conn::ConnId;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors that can occur in the bridge subsystem
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Failed to bind the listening endpoint (port in use, resource exhaustion)
    #[error("Failed to bind listening endpoint: {0}")]
    Bind(#[source] std::io::Error),

    /// Decode/send failure on an established connection
    #[error("Transport error: {0}")]
    Transport(String),

    /// A captured connection reference is stale; the session has since closed
    #[error("Connection gone: {0}")]
    ConnectionGone(ConnId),

    /// Deferred work queue is full or no longer accepting items
    #[error("Deferred work queue rejected the item")]
    QueueRejected,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// True for errors that are recovered locally within one request and
    /// never propagate to the lifecycle layer.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BridgeError::Transport(_)
                | BridgeError::ConnectionGone(_)
                | BridgeError::QueueRejected
        )
    }
}

//! Error types for protection sink operations.
//!
//! The balancer itself has no error taxonomy - every membership operation
//! either succeeds or is a no-op. Errors only arise at the sink boundary,
//! where an adapter bridges to a real connection layer.

use palisade_primitives::PeerId;

/// Error type for protection sink operations.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The connection layer no longer has a connection for this peer.
    #[error("peer not connected: {id}")]
    NotConnected {
        /// The peer the sink was asked to act on.
        id: PeerId,
    },

    /// The underlying connection manager rejected the operation.
    #[error("connection manager error: {message}")]
    ConnectionManager {
        /// Description of the failure.
        message: String,
    },
}

/// Result type for protection sink operations.
pub type SinkResult<T> = core::result::Result<T, SinkError>;

//! ---
//! ess_section: "05-networking-external-interfaces"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Transport session and link adapters."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
use std::time::Duration;

use thiserror::Error;

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Failures reported by a [`RegisterLink`](crate::RegisterLink).
#[derive(Debug, Error)]
pub enum LinkError {
    /// Socket level failure. The link is unusable afterwards.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    /// The device answered with a Modbus exception. The link stays up.
    #[error("device exception: {0}")]
    Exception(String),
    /// Malformed or unexpected response. The link is unusable afterwards.
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl LinkError {
    /// Whether the session must tear the link down after this failure.
    pub fn drops_link(&self) -> bool {
        !matches!(self, LinkError::Exception(_))
    }
}

/// Errors surfaced by [`TransportSession`](crate::TransportSession) writes.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No live connection.
    #[error("transport is not connected")]
    NotConnected,
    /// The write was not acknowledged in time.
    #[error("write to register {address} timed out after {timeout:?}")]
    Timeout {
        /// Start address of the write.
        address: u16,
        /// Configured bound.
        timeout: Duration,
    },
    /// The link rejected or failed the write.
    #[error("write to register {address} failed: {source}")]
    Link {
        /// Start address of the write.
        address: u16,
        /// Underlying failure.
        #[source]
        source: LinkError,
    },
}

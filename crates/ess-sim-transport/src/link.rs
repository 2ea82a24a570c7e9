//! ---
//! ess_section: "05-networking-external-interfaces"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Transport session and link adapters."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LinkError;

/// Remote controller address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Endpoint {
    /// Build an endpoint from host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// An established connection able to write holding registers.
#[async_trait]
pub trait RegisterLink: Send {
    /// Write consecutive registers starting at `address` (function 0x10).
    async fn write_multiple_registers(
        &mut self,
        station: u8,
        address: u16,
        words: &[u16],
    ) -> Result<(), LinkError>;

    /// Write one register (function 0x06).
    async fn write_single_register(
        &mut self,
        station: u8,
        address: u16,
        word: u16,
    ) -> Result<(), LinkError>;

    /// Whether the underlying connection is still usable.
    fn is_alive(&self) -> bool;

    /// Release the connection. Never fails.
    async fn close(&mut self);
}

/// Factory for [`RegisterLink`]s.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a link to `target`.
    async fn connect(&self, target: &Endpoint) -> Result<Box<dyn RegisterLink>, LinkError>;
}

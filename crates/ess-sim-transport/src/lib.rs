//! ---
//! ess_section: "05-networking-external-interfaces"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Transport session and link adapters."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
//! Transport layer: one connection to the remote controller and word-level writes.
//!
//! [`TransportSession`] owns the connection state machine. The wire itself sits behind
//! the [`RegisterLink`]/[`Connector`] seam so the session can run against Modbus TCP
//! ([`ModbusTcpConnector`]) or the in-memory bus in [`mock`].

pub mod error;
pub mod link;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod modbus;
pub mod session;

pub use error::{LinkError, Result, TransportError};
pub use link::{Connector, Endpoint, RegisterLink};
pub use modbus::{ModbusTcpConnector, ModbusTcpLink};
pub use session::{SessionOptions, SessionPhase, TransportSession};

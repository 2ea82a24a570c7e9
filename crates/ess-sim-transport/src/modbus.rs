//! ---
//! ess_section: "05-networking-external-interfaces"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Transport session and link adapters."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
//! Modbus TCP link built on `tokio-modbus`.

use std::io;

use async_trait::async_trait;
use tokio::net::lookup_host;
use tokio_modbus::client::{tcp, Context};
use tokio_modbus::prelude::*;
use tracing::debug;

use crate::error::LinkError;
use crate::link::{Connector, Endpoint, RegisterLink};

/// Opens plain Modbus TCP client connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModbusTcpConnector;

#[async_trait]
impl Connector for ModbusTcpConnector {
    async fn connect(&self, target: &Endpoint) -> Result<Box<dyn RegisterLink>, LinkError> {
        let address = lookup_host((target.host.as_str(), target.port))
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("no address for {target}"))
            })?;
        let context = tcp::connect(address).await?;
        debug!(%target, %address, "modbus tcp link established");
        Ok(Box::new(ModbusTcpLink {
            context,
            alive: true,
        }))
    }
}

/// One Modbus TCP client connection.
#[derive(Debug)]
pub struct ModbusTcpLink {
    context: Context,
    alive: bool,
}

impl ModbusTcpLink {
    fn settle(&mut self, outcome: tokio_modbus::Result<()>) -> Result<(), LinkError> {
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(code)) => Err(LinkError::Exception(format!("{code:?}"))),
            Err(tokio_modbus::Error::Transport(error)) => {
                self.alive = false;
                Err(LinkError::Io(error))
            }
            Err(other) => {
                self.alive = false;
                Err(LinkError::Protocol(other.to_string()))
            }
        }
    }
}

#[async_trait]
impl RegisterLink for ModbusTcpLink {
    async fn write_multiple_registers(
        &mut self,
        station: u8,
        address: u16,
        words: &[u16],
    ) -> Result<(), LinkError> {
        self.context.set_slave(Slave(station));
        let outcome = self.context.write_multiple_registers(address, words).await;
        self.settle(outcome)
    }

    async fn write_single_register(
        &mut self,
        station: u8,
        address: u16,
        word: u16,
    ) -> Result<(), LinkError> {
        self.context.set_slave(Slave(station));
        let outcome = self.context.write_single_register(address, word).await;
        self.settle(outcome)
    }

    /// Only turns false after a failed request; a socket closed by the peer still reports
    /// alive until the next write.
    fn is_alive(&self) -> bool {
        self.alive
    }

    async fn close(&mut self) {
        if !self.alive {
            return;
        }
        self.alive = false;
        let outcome = self.context.disconnect().await;
        debug!(?outcome, "modbus tcp link closed");
    }
}

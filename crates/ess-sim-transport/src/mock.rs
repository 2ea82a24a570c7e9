//! ---
//! ess_section: "05-networking-external-interfaces"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Transport session and link adapters."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
//! In-memory register bus used by tests to stand in for a remote controller.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use ess_sim_registers::{words_to_float, RegisterImage};
use parking_lot::Mutex;

use crate::error::LinkError;
use crate::link::{Connector, Endpoint, RegisterLink};

/// How injected write failures behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Device answers with an exception; the link stays up.
    Exception,
    /// Socket error; the link goes down.
    Io,
    /// Write never completes.
    Hang,
}

/// One write as seen by the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    /// Unit id the write was addressed to.
    pub station: u8,
    /// Start address.
    pub address: u16,
    /// Words written.
    pub words: Vec<u16>,
    /// Written with write-multiple-registers.
    pub multiple: bool,
}

#[derive(Debug, Default)]
struct BusState {
    image: RegisterImage,
    writes: Vec<RecordedWrite>,
    targets: Vec<Endpoint>,
    write_calls: usize,
    refuse_connects: bool,
    write_failure: Option<MockFailure>,
    generation: u64,
}

/// Shared handle to the in-memory bus. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<BusState>>,
}

impl MockBus {
    /// Fresh bus accepting connections and writes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector that opens links onto this bus.
    pub fn connector(&self) -> MockConnector {
        MockConnector { bus: self.clone() }
    }

    /// Refuse subsequent connection attempts.
    pub fn refuse_connects(&self, refuse: bool) {
        self.state.lock().refuse_connects = refuse;
    }

    /// Fail every subsequent write, or clear with `None`.
    pub fn fail_writes(&self, failure: Option<MockFailure>) {
        self.state.lock().write_failure = failure;
    }

    /// Silently invalidate every open link, as if the peer reset the connection.
    pub fn drop_connections(&self) {
        self.state.lock().generation += 1;
    }

    /// Copy of the current register contents.
    pub fn image(&self) -> RegisterImage {
        self.state.lock().image.clone()
    }

    /// Writes accepted so far, in arrival order.
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.state.lock().writes.clone()
    }

    /// Write calls received, including failed ones.
    pub fn write_calls(&self) -> usize {
        self.state.lock().write_calls
    }

    /// Endpoints of every connection attempt, including refused ones.
    pub fn connect_targets(&self) -> Vec<Endpoint> {
        self.state.lock().targets.clone()
    }

    /// Number of connection attempts.
    pub fn connect_attempts(&self) -> usize {
        self.state.lock().targets.len()
    }

    /// Single register contents.
    pub fn word(&self, address: u16) -> Option<u16> {
        self.state.lock().image.get(&address).copied()
    }

    /// Float stored at `address` and `address + 1`.
    pub fn float(&self, address: u16) -> Option<f32> {
        let state = self.state.lock();
        let low = *state.image.get(&address)?;
        let high = *state.image.get(&(address + 1))?;
        Some(words_to_float([low, high]))
    }

    /// Forget recorded writes and the register image.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.image.clear();
        state.writes.clear();
        state.write_calls = 0;
    }
}

/// Opens [`MockLink`]s onto a [`MockBus`].
#[derive(Debug, Clone)]
pub struct MockConnector {
    bus: MockBus,
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, target: &Endpoint) -> Result<Box<dyn RegisterLink>, LinkError> {
        let mut state = self.bus.state.lock();
        state.targets.push(target.clone());
        if state.refuse_connects {
            return Err(LinkError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("{target} refused"),
            )));
        }
        Ok(Box::new(MockLink {
            bus: self.bus.clone(),
            generation: state.generation,
            closed: false,
        }))
    }
}

/// Link onto a [`MockBus`].
#[derive(Debug)]
pub struct MockLink {
    bus: MockBus,
    generation: u64,
    closed: bool,
}

impl MockLink {
    async fn write(
        &mut self,
        station: u8,
        address: u16,
        words: &[u16],
        multiple: bool,
    ) -> Result<(), LinkError> {
        let failure = {
            let mut state = self.bus.state.lock();
            state.write_calls += 1;
            if self.closed || state.generation != self.generation {
                return Err(LinkError::Io(io::ErrorKind::BrokenPipe.into()));
            }
            match state.write_failure {
                None => {
                    for (index, word) in words.iter().enumerate() {
                        state.image.insert(address + index as u16, *word);
                    }
                    state.writes.push(RecordedWrite {
                        station,
                        address,
                        words: words.to_vec(),
                        multiple,
                    });
                    return Ok(());
                }
                Some(failure) => failure,
            }
        };
        match failure {
            MockFailure::Exception => Err(LinkError::Exception("IllegalDataAddress".into())),
            MockFailure::Io => {
                self.closed = true;
                Err(LinkError::Io(io::ErrorKind::ConnectionReset.into()))
            }
            MockFailure::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl RegisterLink for MockLink {
    async fn write_multiple_registers(
        &mut self,
        station: u8,
        address: u16,
        words: &[u16],
    ) -> Result<(), LinkError> {
        self.write(station, address, words, true).await
    }

    async fn write_single_register(
        &mut self,
        station: u8,
        address: u16,
        word: u16,
    ) -> Result<(), LinkError> {
        self.write(station, address, &[word], false).await
    }

    fn is_alive(&self) -> bool {
        !self.closed && self.bus.state.lock().generation == self.generation
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

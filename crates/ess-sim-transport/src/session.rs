//! ---
//! ess_section: "05-networking-external-interfaces"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Transport session and link adapters."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
//! Connection state machine and word-level writes.
//!
//! ```text
//! Disconnected --connect--> Connecting --ok--> Connected
//!       ^                        |                 |
//!       +--------- failure ------+--- i/o error ---+
//! ```
//!
//! The single link sits behind a `tokio::sync::Mutex`; connect, disconnect and every
//! write serialize on it.

use std::sync::Arc;
use std::time::Duration;

use ess_sim_registers::{float_to_words, RegisterValue, RegisterWrite};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::link::{Connector, Endpoint, RegisterLink};

/// Observable connection phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No link.
    #[strum(serialize = "disconnected")]
    Disconnected,
    /// Connection attempt in flight.
    #[strum(serialize = "connecting")]
    Connecting,
    /// Link established.
    #[strum(serialize = "connected")]
    Connected,
}

/// Time bounds applied by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Bound on establishing a link.
    pub connect_timeout: Duration,
    /// Bound on each register write; expiry drops the link.
    pub write_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(3000),
            write_timeout: Duration::from_millis(2000),
        }
    }
}

enum Payload<'a> {
    Multiple(&'a [u16]),
    Single(u16),
}

struct SessionState {
    phase: SessionPhase,
    link: Option<Box<dyn RegisterLink>>,
    target: Option<Endpoint>,
}

impl SessionState {
    fn is_live(&self) -> bool {
        self.phase == SessionPhase::Connected
            && self.link.as_ref().is_some_and(|link| link.is_alive())
    }

    async fn release(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close().await;
        }
        self.phase = SessionPhase::Disconnected;
    }
}

/// One connection to the remote controller.
pub struct TransportSession {
    connector: Arc<dyn Connector>,
    options: SessionOptions,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for TransportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSession")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl TransportSession {
    /// Session that opens links through `connector`.
    pub fn new(connector: Arc<dyn Connector>, options: SessionOptions) -> Self {
        Self {
            connector,
            options,
            state: Mutex::new(SessionState {
                phase: SessionPhase::Disconnected,
                link: None,
                target: None,
            }),
        }
    }

    /// Configured time bounds.
    pub fn options(&self) -> SessionOptions {
        self.options
    }

    /// Connect to `host:port`, tearing down any existing link first.
    ///
    /// Returns whether the session ended up connected. Failures are logged, never raised.
    pub async fn connect(&self, host: &str, port: u16) -> bool {
        let target = Endpoint::new(host, port);
        let mut state = self.state.lock().await;
        if state.link.is_some() {
            debug!(%target, "closing existing link before reconnecting");
            state.release().await;
        }
        state.phase = SessionPhase::Connecting;
        state.target = Some(target.clone());

        match timeout(self.options.connect_timeout, self.connector.connect(&target)).await {
            Ok(Ok(link)) => {
                state.link = Some(link);
                state.phase = SessionPhase::Connected;
                info!(%target, "transport connected");
                true
            }
            Ok(Err(error)) => {
                state.phase = SessionPhase::Disconnected;
                warn!(%target, %error, "transport connect failed");
                false
            }
            Err(_) => {
                state.phase = SessionPhase::Disconnected;
                warn!(
                    %target,
                    timeout_ms = self.options.connect_timeout.as_millis() as u64,
                    "transport connect timed out"
                );
                false
            }
        }
    }

    /// Connect again to the last target. `false` when there is none.
    pub async fn reconnect(&self) -> bool {
        let target = self.state.lock().await.target.clone();
        match target {
            Some(target) => self.connect(&target.host, target.port).await,
            None => {
                debug!("reconnect requested without a previous target");
                false
            }
        }
    }

    /// Release the link. Safe to call in any phase.
    pub async fn disconnect(&self) {
        let mut state = self.state.lock().await;
        let had_link = state.link.is_some();
        state.release().await;
        if had_link {
            info!("transport disconnected");
        }
    }

    /// Connected and the link is still alive.
    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.is_live()
    }

    /// Current phase. A link that died silently reports `Disconnected`.
    pub async fn phase(&self) -> SessionPhase {
        let state = self.state.lock().await;
        match state.phase {
            SessionPhase::Connected if !state.is_live() => SessionPhase::Disconnected,
            phase => phase,
        }
    }

    /// Last endpoint a connection was attempted against.
    pub async fn target(&self) -> Option<Endpoint> {
        self.state.lock().await.target.clone()
    }

    /// Write a float as two registers, low half first.
    pub async fn write_float(&self, station: u8, address: u16, value: f32) -> Result<()> {
        let words = float_to_words(value);
        self.write(station, address, Payload::Multiple(&words)).await
    }

    /// Write one register.
    pub async fn write_word(&self, station: u8, address: u16, value: u16) -> Result<()> {
        self.write(station, address, Payload::Single(value)).await
    }

    /// Write one encoded field with the operation its encoding calls for.
    pub async fn write_value(&self, station: u8, write: &RegisterWrite) -> Result<()> {
        match write.value {
            RegisterValue::Float(value) => self.write_float(station, write.address, value).await,
            RegisterValue::Word(value) => self.write_word(station, write.address, value).await,
        }
    }

    async fn write(&self, station: u8, address: u16, payload: Payload<'_>) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.is_live() {
            if state.phase == SessionPhase::Connected {
                warn!("transport link dropped by peer");
                state.release().await;
            }
            return Err(TransportError::NotConnected);
        }
        let Some(link) = state.link.as_mut() else {
            return Err(TransportError::NotConnected);
        };

        let pending = match payload {
            Payload::Multiple(words) => link.write_multiple_registers(station, address, words),
            Payload::Single(word) => link.write_single_register(station, address, word),
        };
        let outcome = timeout(self.options.write_timeout, pending).await;
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => {
                if source.drops_link() {
                    warn!(address, error = %source, "register write failed, dropping link");
                    state.release().await;
                } else {
                    debug!(address, error = %source, "register write rejected");
                }
                Err(TransportError::Link { address, source })
            }
            Err(_) => {
                warn!(address, "register write timed out, dropping link");
                state.release().await;
                Err(TransportError::Timeout {
                    address,
                    timeout: self.options.write_timeout,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBus, MockFailure};

    fn session(bus: &MockBus) -> TransportSession {
        TransportSession::new(Arc::new(bus.connector()), SessionOptions::default())
    }

    #[tokio::test]
    async fn writes_fail_when_not_connected() {
        let bus = MockBus::new();
        let session = session(&bus);
        assert!(matches!(
            session.write_word(1, 40020, 1).await,
            Err(TransportError::NotConnected)
        ));
        assert_eq!(bus.write_calls(), 0);
    }

    #[tokio::test]
    async fn connect_then_write_uses_contract_encoding() {
        let bus = MockBus::new();
        let session = session(&bus);
        assert!(session.connect("10.0.0.5", 1502).await);
        assert_eq!(session.phase().await, SessionPhase::Connected);

        session.write_float(3, 40000, 1.0).await.unwrap();
        session.write_word(3, 40020, 4).await.unwrap();

        let writes = bus.writes();
        assert_eq!(writes[0].words, vec![0x0000, 0x3F80]);
        assert!(writes[0].multiple);
        assert_eq!(writes[1].words, vec![4]);
        assert!(!writes[1].multiple);
        assert!(writes.iter().all(|write| write.station == 3));
        assert_eq!(bus.connect_targets(), vec![Endpoint::new("10.0.0.5", 1502)]);
    }

    #[tokio::test]
    async fn refused_connect_returns_false() {
        let bus = MockBus::new();
        bus.refuse_connects(true);
        let session = session(&bus);
        assert!(!session.connect("10.0.0.5", 502).await);
        assert_eq!(session.phase().await, SessionPhase::Disconnected);
        assert!(!session.is_connected().await);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let bus = MockBus::new();
        let session = session(&bus);
        assert!(session.connect("h", 502).await);
        session.disconnect().await;
        assert_eq!(session.phase().await, SessionPhase::Disconnected);
        session.disconnect().await;
        assert_eq!(session.phase().await, SessionPhase::Disconnected);
    }

    #[tokio::test]
    async fn silent_drop_reports_not_connected() {
        let bus = MockBus::new();
        let session = session(&bus);
        assert!(session.connect("h", 502).await);
        bus.drop_connections();
        assert!(!session.is_connected().await);
        assert!(matches!(
            session.write_word(1, 40020, 1).await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn io_failure_drops_the_link() {
        let bus = MockBus::new();
        let session = session(&bus);
        assert!(session.connect("h", 502).await);
        bus.fail_writes(Some(MockFailure::Io));
        let error = session.write_float(1, 40000, 2.0).await.unwrap_err();
        assert!(matches!(error, TransportError::Link { address: 40000, .. }));
        assert!(!session.is_connected().await);
    }

    #[tokio::test]
    async fn exception_keeps_the_link() {
        let bus = MockBus::new();
        let session = session(&bus);
        assert!(session.connect("h", 502).await);
        bus.fail_writes(Some(MockFailure::Exception));
        assert!(session.write_word(1, 40020, 1).await.is_err());
        assert!(session.is_connected().await);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_write_times_out_and_drops_the_link() {
        let bus = MockBus::new();
        let session = session(&bus);
        assert!(session.connect("h", 502).await);
        bus.fail_writes(Some(MockFailure::Hang));
        let error = session.write_word(1, 40020, 1).await.unwrap_err();
        assert!(matches!(error, TransportError::Timeout { address: 40020, .. }));
        assert_eq!(session.phase().await, SessionPhase::Disconnected);
    }

    #[tokio::test]
    async fn reconnect_reuses_last_target() {
        let bus = MockBus::new();
        let session = session(&bus);
        assert!(!session.reconnect().await);
        assert!(session.connect("plc", 5020).await);
        assert!(session.reconnect().await);
        assert_eq!(
            bus.connect_targets(),
            vec![Endpoint::new("plc", 5020), Endpoint::new("plc", 5020)]
        );
        assert!(session.is_connected().await);
    }
}

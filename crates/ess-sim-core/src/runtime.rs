//! ---
//! ess_section: "01-core-functionality"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Simulator runtime core."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
use std::sync::Arc;

use anyhow::Result;
use ess_sim_common::config::{AppConfig, TransportConfig};
use ess_sim_metrics::SimulatorMetrics;
use ess_sim_model::{BmsSetpoints, ClimateSetpoints, PcsSetpoints, TelemetrySet};
use ess_sim_sim::SimulationEngine;
use ess_sim_transport::{
    Connector, ModbusTcpConnector, SessionOptions, SessionPhase, TransportSession,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::coordinator::{RetryPolicy, TransmissionCoordinator};
use crate::hub::TelemetryHub;
use crate::scheduler::Scheduler;
use crate::stats::{RuntimeStats, StatsSnapshot};

/// Observable runtime state, e.g. for a periodic status line.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeStatus {
    pub phase: SessionPhase,
    pub simulating: bool,
    pub sending: bool,
    pub auto_send: bool,
    pub stats: StatsSnapshot,
}

/// Wires hub, engine, session, coordinator and scheduler together.
#[derive(Debug)]
pub struct SimulatorRuntime {
    transport: TransportConfig,
    start_simulating: bool,
    hub: TelemetryHub,
    stats: Arc<RuntimeStats>,
    session: Arc<TransportSession>,
    coordinator: Arc<TransmissionCoordinator>,
    scheduler: Scheduler,
    metrics: Option<SimulatorMetrics>,
}

impl SimulatorRuntime {
    /// Runtime speaking Modbus TCP.
    pub fn from_config(config: &AppConfig, metrics: Option<SimulatorMetrics>) -> Self {
        Self::with_connector(config, Arc::new(ModbusTcpConnector), metrics)
    }

    /// Runtime over an arbitrary link connector.
    pub fn with_connector(
        config: &AppConfig,
        connector: Arc<dyn Connector>,
        metrics: Option<SimulatorMetrics>,
    ) -> Self {
        let hub = TelemetryHub::baseline();
        let stats = Arc::new(RuntimeStats::new());
        let session = Arc::new(TransportSession::new(
            connector,
            SessionOptions {
                connect_timeout: config.transport.connect_timeout,
                write_timeout: config.transport.write_timeout,
            },
        ));
        let coordinator = Arc::new(TransmissionCoordinator::new(
            session.clone(),
            hub.clone(),
            stats.clone(),
            config.transport.station_id,
            RetryPolicy::new(
                config.scheduler.max_attempts,
                config.scheduler.reconnect_delay,
            ),
            metrics.clone(),
        ));
        let scheduler = Scheduler::new(
            hub.clone(),
            SimulationEngine::from_seed(config.simulation.random_seed),
            coordinator.clone(),
            stats.clone(),
            metrics.clone(),
            config.scheduler.simulation_interval,
            config.scheduler.send_interval,
        );
        Self {
            transport: config.transport.clone(),
            start_simulating: config.scheduler.start_simulating,
            hub,
            stats,
            session,
            coordinator,
            scheduler,
            metrics,
        }
    }

    /// Start the configured triggers and, when requested, connect.
    pub async fn start(&self) {
        if self.start_simulating {
            self.scheduler.start_simulation();
        }
        if self.transport.auto_connect {
            self.connect().await;
        }
        info!(
            target_host = %self.transport.host,
            target_port = self.transport.port,
            station = self.transport.station_id,
            simulating = self.scheduler.is_simulating(),
            "simulator runtime started"
        );
    }

    /// Connect to the configured endpoint.
    pub async fn connect(&self) -> bool {
        let host = self.transport.host.clone();
        self.connect_to(&host, self.transport.port).await
    }

    /// Connect to `host:port`; on success enable auto-send and start the send trigger.
    pub async fn connect_to(&self, host: &str, port: u16) -> bool {
        let connected = self.session.connect(host, port).await;
        if let Some(metrics) = &self.metrics {
            metrics.set_connected(connected);
        }
        if connected {
            self.scheduler.set_auto_send(true);
            self.scheduler.start_sending();
        }
        connected
    }

    /// Stop sending, disable auto-send and close the session.
    pub async fn disconnect(&self) {
        self.scheduler.stop_sending();
        self.scheduler.set_auto_send(false);
        self.coordinator.cancel_pending_reconnect();
        self.session.disconnect().await;
        if let Some(metrics) = &self.metrics {
            metrics.set_connected(false);
        }
    }

    /// Re-initialize telemetry to baseline and zero the update counter.
    pub fn reset_data(&self) {
        self.hub.reset();
        self.stats.reset_updates();
        info!("telemetry reset to baseline");
    }

    pub fn reset_send_statistics(&self) {
        self.stats.reset_send_statistics();
    }

    pub fn telemetry(&self) -> TelemetrySet {
        self.hub.snapshot()
    }

    pub fn hub(&self) -> &TelemetryHub {
        &self.hub
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn session(&self) -> &Arc<TransportSession> {
        &self.session
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub async fn status(&self) -> RuntimeStatus {
        RuntimeStatus {
            phase: self.session.phase().await,
            simulating: self.scheduler.is_simulating(),
            sending: self.scheduler.is_sending(),
            auto_send: self.scheduler.auto_send(),
            stats: self.stats.snapshot(),
        }
    }

    pub fn apply_pcs_setpoints(&self, setpoints: &PcsSetpoints) {
        self.hub.apply_pcs_setpoints(setpoints);
        info!(?setpoints, "pcs setpoints applied");
    }

    pub fn apply_bms_setpoints(&self, setpoints: &BmsSetpoints) {
        self.hub.apply_bms_setpoints(setpoints);
        info!(?setpoints, "bms setpoints applied");
    }

    pub fn apply_climate_setpoints(&self, setpoints: &ClimateSetpoints) {
        self.hub.apply_climate_setpoints(setpoints);
        info!(?setpoints, "climate setpoints applied");
    }

    /// Stop both triggers, close the session and wait for tasks to finish.
    pub async fn shutdown(self) -> Result<()> {
        self.scheduler.shutdown().await;
        self.coordinator.cancel_pending_reconnect();
        self.session.disconnect().await;
        if let Some(metrics) = &self.metrics {
            metrics.set_connected(false);
        }
        let stats = self.stats.snapshot();
        if stats.send_failures > 0 {
            warn!(failures = stats.send_failures, "shutting down with failed send cycles");
        }
        info!(
            updates = stats.updates,
            send_successes = stats.send_successes,
            "simulator runtime shutdown complete"
        );
        Ok(())
    }
}

//! ---
//! ess_section: "03-persistence-logging"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Metrics collection and export utilities."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue, StatusCode};
use axum::routing::get;
use axum::{response::IntoResponse, Router};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Shared registry type used across services.
pub type SharedRegistry = Arc<Registry>;

/// Produce a new shared registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Spawn an HTTP server that exposes the registry at `/metrics`.
pub fn spawn_http_server(registry: SharedRegistry, addr: SocketAddr) -> Result<MetricsServer> {
    let app = Router::new().route(
        "/metrics",
        get({
            let registry = registry.clone();
            move || metrics_handler(registry.clone())
        }),
    );

    let std_listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind metrics listener {}", addr))?;
    std_listener
        .set_nonblocking(true)
        .with_context(|| "failed to configure metrics listener as non-blocking")?;
    let bound = std_listener
        .local_addr()
        .with_context(|| "failed to read metrics listener address")?;
    let listener = TcpListener::from_std(std_listener)
        .with_context(|| "failed to convert std listener into tokio listener")?;

    info!(address = %bound, "metrics server starting");

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let service = app.into_make_service();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        axum::serve(listener, service)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .context("metrics server encountered an error")?;
        Ok(())
    });

    Ok(MetricsServer {
        addr: bound,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}

/// Prometheus scrape endpoint.
async fn metrics_handler(registry: SharedRegistry) -> impl IntoResponse {
    let families = registry.gather();
    let encoder = TextEncoder::new();
    match encoder.encode_to_string(&families) {
        Ok(body) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static(prometheus::TEXT_FORMAT),
            )],
            body,
        ),
        Err(err) => {
            error!(error = %err, "failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                )],
                String::from("metrics encoding error"),
            )
        }
    }
}

/// Handle to the running HTTP exporter.
#[derive(Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl MetricsServer {
    /// Bound address; resolves port `0` to the actual port.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Signal shutdown and await task completion.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(err),
            Err(join_err) => Err(anyhow::Error::new(join_err)),
        }
    }
}

/// Outcome label for `ess_sim_send_cycles_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcomeLabel {
    Delivered,
    Exhausted,
}

impl CycleOutcomeLabel {
    fn as_str(self) -> &'static str {
        match self {
            CycleOutcomeLabel::Delivered => "delivered",
            CycleOutcomeLabel::Exhausted => "exhausted",
        }
    }
}

/// Counters recorded by the simulator runtime.
#[derive(Clone, Debug)]
pub struct SimulatorMetrics {
    registry: SharedRegistry,
    simulation_ticks: IntCounter,
    send_cycles: IntCounterVec,
    reconnects: IntCounter,
    transport_connected: IntGauge,
}

impl SimulatorMetrics {
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let simulation_ticks = IntCounter::with_opts(Opts::new(
            "ess_sim_simulation_ticks_total",
            "Simulation ticks applied to the telemetry set",
        ))?;
        registry.register(Box::new(simulation_ticks.clone()))?;

        let send_cycles = IntCounterVec::new(
            Opts::new(
                "ess_sim_send_cycles_total",
                "Send cycles that reached the transport, by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(send_cycles.clone()))?;

        let reconnects = IntCounter::with_opts(Opts::new(
            "ess_sim_reconnects_total",
            "Reconnects scheduled after exhausted send cycles",
        ))?;
        registry.register(Box::new(reconnects.clone()))?;

        let transport_connected = IntGauge::with_opts(Opts::new(
            "ess_sim_transport_connected",
            "Indicator (0/1) whether the transport session is connected",
        ))?;
        registry.register(Box::new(transport_connected.clone()))?;

        Ok(Self {
            registry,
            simulation_ticks,
            send_cycles,
            reconnects,
            transport_connected,
        })
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn inc_tick(&self) {
        self.simulation_ticks.inc();
    }

    pub fn record_cycle(&self, outcome: CycleOutcomeLabel) {
        self.send_cycles.with_label_values(&[outcome.as_str()]).inc();
    }

    pub fn inc_reconnect(&self) {
        self.reconnects.inc();
    }

    pub fn set_connected(&self, connected: bool) {
        self.transport_connected.set(i64::from(connected));
    }

    pub fn ticks(&self) -> u64 {
        self.simulation_ticks.get()
    }

    pub fn cycles(&self, outcome: CycleOutcomeLabel) -> u64 {
        self.send_cycles.with_label_values(&[outcome.as_str()]).get()
    }

    pub fn reconnects(&self) -> u64 {
        self.reconnects.get()
    }

    pub fn connected(&self) -> bool {
        self.transport_connected.get() == 1
    }
}

pub use prometheus;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_register_once_per_registry() {
        let registry = new_registry();
        let metrics = SimulatorMetrics::new(registry.clone()).unwrap();
        assert!(SimulatorMetrics::new(registry).is_err());

        metrics.inc_tick();
        metrics.record_cycle(CycleOutcomeLabel::Exhausted);
        metrics.inc_reconnect();
        metrics.set_connected(true);
        assert_eq!(metrics.ticks(), 1);
        assert_eq!(metrics.cycles(CycleOutcomeLabel::Exhausted), 1);
        assert_eq!(metrics.cycles(CycleOutcomeLabel::Delivered), 0);
        assert_eq!(metrics.reconnects(), 1);
        assert!(metrics.connected());
    }

    #[tokio::test]
    async fn exporter_serves_text_format() {
        let registry = new_registry();
        let metrics = SimulatorMetrics::new(registry.clone()).unwrap();
        metrics.inc_tick();

        let server = spawn_http_server(registry, "127.0.0.1:0".parse().unwrap()).unwrap();
        let response = reqwest::get(format!("http://{}/metrics", server.addr()))
            .await
            .unwrap();
        assert_eq!(
            response.headers()[reqwest::header::CONTENT_TYPE],
            prometheus::TEXT_FORMAT
        );
        let body = response.text().await.unwrap();
        assert!(body.contains("ess_sim_simulation_ticks_total 1"));
        server.shutdown().await.unwrap();
    }
}

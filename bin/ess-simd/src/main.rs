//! ---
//! ess_section: "01-core-functionality"
//! ess_subsection: "binary"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Binary entrypoint for the ESS-SIM daemon."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ess_sim_common::config::AppConfig;
use ess_sim_common::logging::init_tracing;
use ess_sim_core::SimulatorRuntime;
use ess_sim_metrics::{new_registry, spawn_http_server, SimulatorMetrics};
use ess_sim_model::TelemetrySet;
use ess_sim_registers::{
    decode_descriptor, descriptors, snapshot_image, validate_layout, RegisterValue,
};
use ess_sim_sim::SimulationEngine;
use serde::Serialize;
use tokio::signal;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

const STATUS_PERIOD: Duration = Duration::from_secs(10);

#[derive(Debug, Parser)]
#[command(
    author,
    version = concat!("ESS-SIM ", env!("CARGO_PKG_VERSION")),
    about = "ESS device simulator daemon",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Override the remote controller host")]
    host: Option<String>,

    #[arg(long, help = "Override the remote controller port")]
    port: Option<u16>,

    #[arg(long, help = "Override the Modbus station id")]
    station: Option<u8>,

    #[arg(long, help = "Seed the simulation for reproducible runs")]
    seed: Option<u64>,

    #[arg(long, help = "Connect on startup regardless of configuration")]
    connect: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run the simulator until ctrl-c")]
    Run,
    #[command(about = "Print the register map")]
    Map,
    #[command(about = "Run the simulation offline and print the final telemetry as JSON")]
    Simulate {
        #[arg(long, default_value_t = 100, help = "Number of ticks to run")]
        ticks: u64,
    },
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    ticks: u64,
    seed: Option<u64>,
    telemetry: TelemetrySet,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/example.toml"));

    let loaded = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded.config;
    if let Some(host) = cli.host {
        config.transport.host = host;
    }
    if let Some(port) = cli.port {
        config.transport.port = port;
    }
    if let Some(station) = cli.station {
        config.transport.station_id = station;
    }
    if cli.seed.is_some() {
        config.simulation.random_seed = cli.seed;
    }
    if cli.connect {
        config.transport.auto_connect = true;
    }
    config.validate()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            init_tracing("ess-simd", &config.logging)?;
            match &loaded.source {
                Some(path) => info!(config_path = %path.display(), "configuration loaded"),
                None => info!("no configuration file found; using defaults"),
            }
            run_daemon(config).await?
        }
        Commands::Map => {
            validate_layout()?;
            print_register_map();
        }
        Commands::Simulate { ticks } => {
            let report = simulate_offline(ticks, config.simulation.random_seed);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

async fn run_daemon(config: AppConfig) -> Result<()> {
    let metrics_settings = config.metrics.clone();
    let (metrics, metrics_server) = if metrics_settings.enabled {
        let registry = new_registry();
        let metrics = SimulatorMetrics::new(registry.clone())?;
        let server = spawn_http_server(registry, metrics_settings.listen)?;
        info!(address = %server.addr(), "metrics exporter enabled");
        (Some(metrics), Some(server))
    } else {
        info!("metrics exporter disabled by configuration");
        (None, None)
    };

    let runtime = SimulatorRuntime::from_config(&config, metrics);
    runtime.start().await;
    if config.transport.auto_connect && !runtime.session().is_connected().await {
        warn!(
            target_host = %config.transport.host,
            target_port = config.transport.port,
            "initial connection failed; simulating without sending"
        );
    }

    info!("daemon running; waiting for termination signal");
    let mut status_ticker = interval(STATUS_PERIOD);
    status_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    status_ticker.tick().await;
    loop {
        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("ctrl-c received; shutting down");
                break;
            }
            _ = status_ticker.tick() => {
                let status = runtime.status().await;
                info!(
                    phase = %status.phase,
                    simulating = status.simulating,
                    sending = status.sending,
                    updates = status.stats.updates,
                    send_attempts = status.stats.send_attempts,
                    send_successes = status.stats.send_successes,
                    send_failures = status.stats.send_failures,
                    "simulator status"
                );
            }
        }
    }

    runtime.shutdown().await?;
    if let Some(server) = metrics_server {
        server.shutdown().await?;
    }
    Ok(())
}

fn print_register_map() {
    let image = snapshot_image(&TelemetrySet::baseline());
    println!(
        "{:<8} {:<28} {:>7} {:>5} {:<4} {:>12}",
        "device", "field", "address", "width", "type", "baseline"
    );
    for descriptor in descriptors() {
        let baseline = match decode_descriptor(&descriptor, &image) {
            Some(RegisterValue::Float(value)) => format!("{value:.3}"),
            Some(RegisterValue::Word(word)) => word.to_string(),
            None => "-".to_owned(),
        };
        println!(
            "{:<8} {:<28} {:>7} {:>5} {:<4} {:>12}",
            descriptor.subsystem.to_string(),
            descriptor.name,
            descriptor.address,
            descriptor.width,
            descriptor.encoding.to_string(),
            baseline
        );
    }
}

fn simulate_offline(ticks: u64, seed: Option<u64>) -> SimulationReport {
    let mut engine = SimulationEngine::from_seed(seed);
    let mut telemetry = TelemetrySet::baseline();
    for _ in 0..ticks {
        engine.tick_all(&mut telemetry);
    }
    SimulationReport {
        ticks,
        seed,
        telemetry,
    }
}

//! ---
//! ess_section: "01-core-functionality"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Shared configuration and logging bootstrap."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::logging::LogFormat;

/// Shortest accepted period for either scheduler trigger.
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

fn default_host() -> String {
    "192.168.1.100".to_owned()
}

fn default_port() -> u16 {
    502
}

fn default_station_id() -> u8 {
    1
}

fn default_connect_timeout() -> Duration {
    Duration::from_millis(3000)
}

fn default_write_timeout() -> Duration {
    Duration::from_millis(2000)
}

fn default_interval() -> Duration {
    Duration::from_millis(1000)
}

fn default_reconnect_delay() -> Duration {
    Duration::from_millis(1000)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_metrics_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 9899))
}

/// Primary configuration object for the simulator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when no file was found and built-in defaults apply.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "ESS_SIM_CONFIG";

    /// Load configuration from disk, respecting the `ESS_SIM_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    ///
    /// An explicit `ESS_SIM_CONFIG` path must exist. Candidate paths are optional and the
    /// defaults are used when none of them exists.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path.to_path_buf()),
                });
            }
        }

        debug!(
            inspected = %candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "no configuration file found, using defaults"
        );
        Ok(LoadedAppConfig {
            config: Self::default(),
            source: None,
        })
    }

    /// Parse and validate one TOML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.transport.validate()?;
        self.scheduler.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Remote controller endpoint and session bounds.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_station_id")]
    pub station_id: u8,
    #[serde(default = "default_connect_timeout", rename = "connect_timeout_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub connect_timeout: Duration,
    #[serde(default = "default_write_timeout", rename = "write_timeout_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub write_timeout: Duration,
    /// Connect as soon as the runtime starts.
    #[serde(default)]
    pub auto_connect: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            station_id: default_station_id(),
            connect_timeout: default_connect_timeout(),
            write_timeout: default_write_timeout(),
            auto_connect: false,
        }
    }
}

impl TransportConfig {
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(anyhow!("transport host must not be empty"));
        }
        if self.connect_timeout.is_zero() || self.write_timeout.is_zero() {
            return Err(anyhow!("transport timeouts must be positive"));
        }
        Ok(())
    }
}

/// Trigger periods and retry policy.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_interval", rename = "simulation_interval_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub simulation_interval: Duration,
    #[serde(default = "default_interval", rename = "send_interval_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub send_interval: Duration,
    #[serde(default = "default_reconnect_delay", rename = "reconnect_delay_ms")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub reconnect_delay: Duration,
    /// Attempts per send cycle before a reconnect is scheduled.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Start the simulation trigger with the runtime.
    #[serde(default = "default_true")]
    pub start_simulating: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            simulation_interval: default_interval(),
            send_interval: default_interval(),
            reconnect_delay: default_reconnect_delay(),
            max_attempts: default_max_attempts(),
            start_simulating: true,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, interval) in [
            ("simulation_interval_ms", self.simulation_interval),
            ("send_interval_ms", self.send_interval),
        ] {
            if interval < MIN_INTERVAL {
                return Err(anyhow!(
                    "{name} must be at least {} ms, got {} ms",
                    MIN_INTERVAL.as_millis(),
                    interval.as_millis()
                ));
            }
        }
        if self.max_attempts == 0 {
            return Err(anyhow!("max_attempts must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed for reproducible runs; entropy when absent.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_listen")]
    pub listen: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let config: AppConfig = "".parse().unwrap();
        assert_eq!(config.transport.host, "192.168.1.100");
        assert_eq!(config.transport.port, 502);
        assert_eq!(config.transport.station_id, 1);
        assert_eq!(config.transport.write_timeout, Duration::from_secs(2));
        assert_eq!(config.scheduler.send_interval, Duration::from_secs(1));
        assert_eq!(config.scheduler.max_attempts, 3);
        assert!(config.scheduler.start_simulating);
        assert!(!config.metrics.enabled);
        assert_eq!(config.metrics.listen.port(), 9899);
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
    }

    #[test]
    fn millisecond_fields_parse() {
        let config: AppConfig = r#"
            [transport]
            host = "plc.local"
            port = 1502
            station_id = 7
            write_timeout_ms = 500

            [scheduler]
            simulation_interval_ms = 250
            send_interval_ms = 2000

            [simulation]
            random_seed = 42

            [logging]
            format = "pretty"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.transport.host, "plc.local");
        assert_eq!(config.transport.station_id, 7);
        assert_eq!(config.transport.write_timeout, Duration::from_millis(500));
        assert_eq!(config.scheduler.simulation_interval, Duration::from_millis(250));
        assert_eq!(config.scheduler.send_interval, Duration::from_millis(2000));
        assert_eq!(config.simulation.random_seed, Some(42));
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn intervals_below_floor_are_rejected() {
        let error = "[scheduler]\nsend_interval_ms = 50"
            .parse::<AppConfig>()
            .unwrap_err();
        assert!(format!("{error:#}").contains("send_interval_ms"));
    }

    #[test]
    fn zero_attempts_and_empty_host_are_rejected() {
        assert!("[scheduler]\nmax_attempts = 0".parse::<AppConfig>().is_err());
        assert!("[transport]\nhost = \" \"".parse::<AppConfig>().is_err());
    }

    #[test]
    fn missing_candidates_fall_back_to_defaults() {
        let loaded = AppConfig::load_with_source(&["does/not/exist.toml"]).unwrap();
        assert!(loaded.source.is_none());
        assert_eq!(loaded.config.transport.port, 502);
    }

    #[test]
    fn first_existing_candidate_wins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[transport]\nport = 5020").unwrap();
        let path = file.path().to_path_buf();
        let loaded =
            AppConfig::load_with_source(&[PathBuf::from("missing.toml"), path.clone()]).unwrap();
        assert_eq!(loaded.source, Some(path));
        assert_eq!(loaded.config.transport.port, 5020);
    }
}

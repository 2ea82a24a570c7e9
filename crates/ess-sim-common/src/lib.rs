//! ---
//! ess_section: "01-core-functionality"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Shared configuration and logging bootstrap."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
//! Shared primitives for the ESS-SIM workspace: configuration loading and the
//! tracing bootstrap used by the daemon.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, LoadedAppConfig, LoggingConfig, MetricsConfig, SchedulerConfig, SimulationConfig,
    TransportConfig, MIN_INTERVAL,
};
pub use logging::{init_tracing, resolve_filter, LogFormat};

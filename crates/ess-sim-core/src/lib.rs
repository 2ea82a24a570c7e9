//! ---
//! ess_section: "01-core-functionality"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Simulator runtime core."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
//! Runtime core for the ESS-SIM device simulator.
//!
//! The [`TelemetryHub`] holds the plant state. A [`Scheduler`] ticks the simulation
//! engine on one period and asks the [`TransmissionCoordinator`] to push snapshots to
//! the remote controller on another. [`SimulatorRuntime`] wires it all from an
//! [`AppConfig`](ess_sim_common::AppConfig).

pub mod coordinator;
pub mod hub;
pub mod runtime;
pub mod scheduler;
pub mod stats;

pub use coordinator::{CycleOutcome, RetryPolicy, TransmissionCoordinator};
pub use hub::TelemetryHub;
pub use runtime::{RuntimeStatus, SimulatorRuntime};
pub use scheduler::{parse_interval_ms, Scheduler};
pub use stats::{RuntimeStats, StatsSnapshot};

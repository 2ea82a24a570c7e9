//! ---
//! ess_section: "11-simulation"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Simulation engine module exports."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
//! Telemetry simulation for the ESS-SIM devices.
//!
//! The engine advances each entity in place by one tick. Values follow bounded
//! random walks and derived fields are recomputed afterwards, so the output always
//! looks like a plausible, self-consistent device.

pub mod generator;

pub use generator::SimulationEngine;

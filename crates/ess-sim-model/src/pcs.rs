//! ---
//! ess_section: "02-telemetry-data-model"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Telemetry entities and wire enumerations for simulated devices."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};

use crate::enums::{PcsStatus, PcsWorkMode};

/// Power conversion system telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcsTelemetry {
    /// DC bus voltage in volts.
    pub dc_voltage: f64,
    /// DC bus current in amps.
    pub dc_current: f64,
    /// DC power in kW, derived from voltage and current.
    pub dc_power: f64,
    /// AC line voltage in volts.
    pub ac_voltage: f64,
    /// AC line current in amps.
    pub ac_current: f64,
    /// Three-phase AC power in kW, derived.
    pub ac_power: f64,
    /// Grid frequency in Hz.
    pub frequency: f64,
    /// Power factor (0..1).
    pub power_factor: f64,
    /// Conversion efficiency in percent.
    pub efficiency: f64,
    /// Cabinet temperature in °C.
    pub temperature: f64,
    /// Cumulative running hours.
    pub running_hours: f64,
    /// Operating state.
    pub status: PcsStatus,
    /// Dispatch mode.
    pub work_mode: PcsWorkMode,
    /// Vendor fault code, zero when healthy.
    pub fault_code: u16,
}

impl PcsTelemetry {
    /// Documented start-of-day values.
    pub fn baseline() -> Self {
        Self {
            dc_voltage: 750.0,
            dc_current: 100.0,
            dc_power: 75.0,
            ac_voltage: 380.0,
            ac_current: 80.0,
            ac_power: 50.0,
            frequency: 50.0,
            power_factor: 0.98,
            efficiency: 96.5,
            temperature: 45.0,
            running_hours: 1000.0,
            status: PcsStatus::Running,
            work_mode: PcsWorkMode::Discharging,
            fault_code: 0,
        }
    }
}

impl Default for PcsTelemetry {
    fn default() -> Self {
        Self::baseline()
    }
}

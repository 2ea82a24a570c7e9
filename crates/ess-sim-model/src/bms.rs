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

use crate::enums::{AlarmLevel, BmsStatus};

/// Lower bound the simulator keeps state of charge above, in percent.
pub const SOC_FLOOR: f64 = 10.0;
/// Upper bound the simulator keeps state of charge below, in percent.
pub const SOC_CEILING: f64 = 95.0;

/// Battery management system telemetry for the whole pack.
///
/// Cell voltage and temperature are summarised as max/min/avg plus the spread
/// between max and min. The simulator keeps `max >= avg >= min` for both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmsTelemetry {
    /// Pack voltage in volts.
    pub total_voltage: f64,
    /// Pack current in amps; positive is discharge.
    pub total_current: f64,
    /// State of charge in percent.
    pub soc: f64,
    /// State of health in percent.
    pub soh: f64,
    /// Highest cell voltage in volts.
    pub max_cell_voltage: f64,
    /// Lowest cell voltage in volts.
    pub min_cell_voltage: f64,
    /// Mean cell voltage in volts.
    pub avg_cell_voltage: f64,
    /// `max_cell_voltage - min_cell_voltage`.
    pub cell_voltage_diff: f64,
    /// Hottest cell in °C.
    pub max_temperature: f64,
    /// Coolest cell in °C.
    pub min_temperature: f64,
    /// Mean cell temperature in °C.
    pub avg_temperature: f64,
    /// `max_temperature - min_temperature`.
    pub temperature_diff: f64,
    /// Completed full cycles.
    pub cycle_count: u32,
    /// Nameplate energy in kWh.
    pub total_energy: f64,
    /// Energy left at the current state of charge, in kWh.
    pub available_energy: f64,
    /// Pack state.
    pub status: BmsStatus,
    /// Alarm escalation level.
    pub alarm_level: AlarmLevel,
    /// Insulation resistance in MΩ.
    pub insulation_resistance: f64,
    /// Installed battery clusters.
    pub cluster_count: u16,
    /// Clusters currently online.
    pub online_cluster_count: u16,
}

impl BmsTelemetry {
    /// Documented start-of-day values.
    pub fn baseline() -> Self {
        Self {
            total_voltage: 750.0,
            total_current: 50.0,
            soc: 75.0,
            soh: 98.0,
            max_cell_voltage: 3.55,
            min_cell_voltage: 3.45,
            avg_cell_voltage: 3.50,
            cell_voltage_diff: 0.10,
            max_temperature: 32.0,
            min_temperature: 28.0,
            avg_temperature: 30.0,
            temperature_diff: 4.0,
            cycle_count: 500,
            total_energy: 100.0,
            available_energy: 75.0,
            status: BmsStatus::Discharging,
            alarm_level: AlarmLevel::Normal,
            insulation_resistance: 800.0,
            cluster_count: 8,
            online_cluster_count: 8,
        }
    }
}

impl Default for BmsTelemetry {
    fn default() -> Self {
        Self::baseline()
    }
}

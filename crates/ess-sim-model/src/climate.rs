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

use crate::enums::{ClimateMode, ClimateStatus, FanSpeedLevel};

/// Lowest indoor temperature the simulator will report, in °C.
pub const INDOOR_MIN_C: f64 = 18.0;
/// Highest indoor temperature the simulator will report, in °C.
pub const INDOOR_MAX_C: f64 = 35.0;

/// HVAC unit telemetry for the battery container.
///
/// Whenever `status` is not [`ClimateStatus::Running`] the compressor, both fans and
/// the power draw read zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateTelemetry {
    /// Indoor air temperature in °C.
    pub indoor_temperature: f64,
    /// Outdoor air temperature in °C.
    pub outdoor_temperature: f64,
    /// Externally supplied target temperature in °C.
    pub set_temperature: f64,
    /// Indoor relative humidity in percent.
    pub indoor_humidity: f64,
    /// Outdoor relative humidity in percent.
    pub outdoor_humidity: f64,
    /// Compressor drive frequency in Hz.
    pub compressor_frequency: f64,
    /// Indoor fan speed in rpm.
    pub indoor_fan_speed: u16,
    /// Outdoor fan speed in rpm.
    pub outdoor_fan_speed: u16,
    /// Evaporator coil temperature in °C.
    pub evaporator_temperature: f64,
    /// Condenser coil temperature in °C.
    pub condenser_temperature: f64,
    /// Suction pressure in MPa.
    pub suction_pressure: f64,
    /// Discharge pressure in MPa.
    pub discharge_pressure: f64,
    /// Electrical power draw in kW.
    pub power: f64,
    /// Cumulative energy consumption in kWh.
    pub total_energy_consumption: f64,
    /// Operating mode.
    pub mode: ClimateMode,
    /// Run state.
    pub status: ClimateStatus,
    /// Requested fan speed.
    pub fan_speed_level: FanSpeedLevel,
    /// Cumulative running hours.
    pub running_hours: f64,
    /// Cooling capacity in kW.
    pub cooling_capacity: f64,
    /// Energy efficiency ratio.
    pub eer: f64,
}

impl ClimateTelemetry {
    /// Documented start-of-day values.
    pub fn baseline() -> Self {
        Self {
            indoor_temperature: 26.0,
            outdoor_temperature: 35.0,
            set_temperature: 25.0,
            indoor_humidity: 55.0,
            outdoor_humidity: 70.0,
            compressor_frequency: 60.0,
            indoor_fan_speed: 1000,
            outdoor_fan_speed: 750,
            evaporator_temperature: 10.0,
            condenser_temperature: 45.0,
            suction_pressure: 0.5,
            discharge_pressure: 1.8,
            power: 3.5,
            total_energy_consumption: 100.0,
            mode: ClimateMode::Cooling,
            status: ClimateStatus::Running,
            fan_speed_level: FanSpeedLevel::Auto,
            running_hours: 500.0,
            cooling_capacity: 12.0,
            eer: 3.4,
        }
    }

    /// Whether the compressor and fans are allowed to run.
    pub fn is_running(&self) -> bool {
        self.status == ClimateStatus::Running
    }
}

impl Default for ClimateTelemetry {
    fn default() -> Self {
        Self::baseline()
    }
}

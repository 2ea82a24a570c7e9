//! ---
//! ess_section: "02-telemetry-data-model"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Telemetry entities and wire enumerations for simulated devices."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
//! Operator setpoints applied directly onto telemetry.
//!
//! Applying a setpoint is a plain state write. The simulator picks the new values up
//! on its next tick as already-committed state.

use serde::{Deserialize, Serialize};

use crate::derive::{available_energy_kwh, dc_power_kw};
use crate::enums::{ClimateMode, ClimateStatus, FanSpeedLevel, PcsWorkMode};
use crate::{BmsTelemetry, ClimateTelemetry, PcsTelemetry};

/// Operator targets for the power conversion system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PcsSetpoints {
    /// Requested dispatch mode.
    pub work_mode: PcsWorkMode,
    /// Target DC bus voltage in volts.
    pub dc_voltage: f64,
    /// Target power in kW.
    pub power: f64,
}

impl Default for PcsSetpoints {
    fn default() -> Self {
        Self {
            work_mode: PcsWorkMode::Discharging,
            dc_voltage: 750.0,
            power: 50.0,
        }
    }
}

impl PcsSetpoints {
    /// Seed setpoints from what the device currently reports.
    pub fn read_from(telemetry: &PcsTelemetry) -> Self {
        Self {
            work_mode: telemetry.work_mode,
            dc_voltage: telemetry.dc_voltage,
            power: telemetry.dc_power,
        }
    }

    /// Write the setpoints onto the device; DC power follows the new voltage.
    pub fn apply(&self, telemetry: &mut PcsTelemetry) {
        telemetry.work_mode = self.work_mode;
        telemetry.dc_voltage = self.dc_voltage;
        telemetry.dc_power = dc_power_kw(self.dc_voltage, telemetry.dc_current);
    }
}

/// Operator targets for the battery pack.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BmsSetpoints {
    /// Target state of charge in percent.
    pub target_soc: f64,
    /// Charge current limit in amps.
    pub charging_current_limit: f64,
    /// Discharge current limit in amps.
    pub discharging_current_limit: f64,
}

impl Default for BmsSetpoints {
    fn default() -> Self {
        Self {
            target_soc: 80.0,
            charging_current_limit: 100.0,
            discharging_current_limit: 100.0,
        }
    }
}

impl BmsSetpoints {
    /// Seed setpoints from what the pack currently reports.
    pub fn read_from(telemetry: &BmsTelemetry) -> Self {
        let current = telemetry.total_current.abs();
        Self {
            target_soc: telemetry.soc,
            charging_current_limit: current,
            discharging_current_limit: current,
        }
    }

    /// Write the setpoints onto the pack. Only available energy reflects the target
    /// until the next tick recomputes it from the live state of charge.
    pub fn apply(&self, telemetry: &mut BmsTelemetry) {
        telemetry.available_energy = available_energy_kwh(telemetry.total_energy, self.target_soc);
    }
}

/// Operator targets for the climate unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateSetpoints {
    /// Target indoor temperature in °C.
    pub set_temperature: f64,
    /// Requested mode.
    pub mode: ClimateMode,
    /// Requested fan speed.
    pub fan_speed: FanSpeedLevel,
    /// Power switch.
    pub power_on: bool,
}

impl Default for ClimateSetpoints {
    fn default() -> Self {
        Self {
            set_temperature: 25.0,
            mode: ClimateMode::Cooling,
            fan_speed: FanSpeedLevel::Auto,
            power_on: true,
        }
    }
}

impl ClimateSetpoints {
    /// Seed setpoints from what the unit currently reports.
    pub fn read_from(telemetry: &ClimateTelemetry) -> Self {
        Self {
            set_temperature: telemetry.set_temperature,
            mode: telemetry.mode,
            fan_speed: telemetry.fan_speed_level,
            power_on: telemetry.is_running(),
        }
    }

    /// Write the setpoints onto the unit.
    pub fn apply(&self, telemetry: &mut ClimateTelemetry) {
        telemetry.set_temperature = self.set_temperature;
        telemetry.mode = self.mode;
        telemetry.fan_speed_level = self.fan_speed;
        telemetry.status = if self.power_on {
            ClimateStatus::Running
        } else {
            ClimateStatus::Off
        };
    }
}

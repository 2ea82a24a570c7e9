//! ---
//! ess_section: "02-telemetry-data-model"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Telemetry entities and wire enumerations for simulated devices."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
//! Pure formulas for derived telemetry fields.
//!
//! The simulator perturbs base fields and then calls these to recompute everything
//! that depends on them, so derived values never drift from their inputs.

use crate::enums::{AlarmLevel, BmsStatus};

/// Battery temperature above which the alarm level escalates, in °C.
pub const ALARM_MAX_TEMPERATURE_C: f64 = 50.0;
/// Cell voltage spread above which the alarm level escalates, in volts.
pub const ALARM_CELL_SPREAD_V: f64 = 0.1;

/// DC-side power in kW from volts and amps.
pub fn dc_power_kw(voltage_v: f64, current_a: f64) -> f64 {
    voltage_v * current_a / 1000.0
}

/// Three-phase AC power in kW.
pub fn ac_power_kw(voltage_v: f64, current_a: f64, power_factor: f64) -> f64 {
    3f64.sqrt() * voltage_v * current_a * power_factor / 1000.0
}

/// Energy still available in the pack given its capacity and state of charge.
pub fn available_energy_kwh(total_energy_kwh: f64, soc_percent: f64) -> f64 {
    total_energy_kwh * soc_percent / 100.0
}

/// Pack status from the sign of total current; positive current is discharge.
pub fn bms_status_for_current(total_current_a: f64) -> BmsStatus {
    if total_current_a > 0.0 {
        BmsStatus::Discharging
    } else if total_current_a < 0.0 {
        BmsStatus::Charging
    } else {
        BmsStatus::Idle
    }
}

/// Alarm level from the hottest cell and the cell voltage spread.
pub fn alarm_level_for(max_temperature_c: f64, cell_voltage_diff_v: f64) -> AlarmLevel {
    if max_temperature_c > ALARM_MAX_TEMPERATURE_C || cell_voltage_diff_v > ALARM_CELL_SPREAD_V {
        AlarmLevel::Warning
    } else {
        AlarmLevel::Normal
    }
}

/// Energy efficiency ratio; zero while the unit draws no power.
pub fn energy_efficiency_ratio(cooling_capacity_kw: f64, power_kw: f64) -> f64 {
    if power_kw > 0.0 {
        cooling_capacity_kw / power_kw
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_formulas() {
        assert!((dc_power_kw(750.0, 100.0) - 75.0).abs() < 1e-9);
        let ac = ac_power_kw(380.0, 80.0, 1.0);
        assert!((ac - 52.654).abs() < 1e-3);
    }

    #[test]
    fn status_follows_current_sign() {
        assert_eq!(bms_status_for_current(12.0), BmsStatus::Discharging);
        assert_eq!(bms_status_for_current(-0.5), BmsStatus::Charging);
        assert_eq!(bms_status_for_current(0.0), BmsStatus::Idle);
    }

    #[test]
    fn alarm_thresholds_are_exclusive() {
        assert_eq!(alarm_level_for(50.0, 0.1), AlarmLevel::Normal);
        assert_eq!(alarm_level_for(50.01, 0.0), AlarmLevel::Warning);
        assert_eq!(alarm_level_for(30.0, 0.11), AlarmLevel::Warning);
    }

    #[test]
    fn eer_is_zero_without_power() {
        assert_eq!(energy_efficiency_ratio(12.0, 0.0), 0.0);
        assert_eq!(energy_efficiency_ratio(12.0, 4.0), 3.0);
    }
}

//! ---
//! ess_section: "02-telemetry-data-model"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Telemetry entities and wire enumerations for simulated devices."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
//! Telemetry data model shared across the ESS-SIM workspace.
//!
//! Three simulated devices are modelled: the power conversion system (PCS), the
//! battery management system (BMS) and the climate (HVAC) unit. Each entity is a
//! flat record mutated in place by the simulation engine and read by the
//! transmission pipeline.
#![warn(missing_docs)]

pub mod bms;
pub mod climate;
pub mod derive;
pub mod enums;
pub mod pcs;
pub mod setpoints;

use serde::{Deserialize, Serialize};

pub use bms::BmsTelemetry;
pub use climate::ClimateTelemetry;
pub use enums::{
    AlarmLevel, BmsStatus, ClimateMode, ClimateStatus, FanSpeedLevel, PcsStatus, PcsWorkMode,
};
pub use pcs::PcsTelemetry;
pub use setpoints::{BmsSetpoints, ClimateSetpoints, PcsSetpoints};

/// Shared result type for model conversions.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised when external input cannot be mapped onto the model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A raw register word did not correspond to any enumerant.
    #[error("ordinal {ordinal} is not a valid {kind}")]
    InvalidOrdinal {
        /// Name of the enumeration being decoded.
        kind: &'static str,
        /// The rejected raw value.
        ordinal: u16,
    },
}

/// The complete simulated plant: one entity per device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySet {
    /// Power conversion system telemetry.
    pub pcs: PcsTelemetry,
    /// Battery management system telemetry.
    pub bms: BmsTelemetry,
    /// Climate unit telemetry.
    pub climate: ClimateTelemetry,
}

impl TelemetrySet {
    /// Build the documented start-of-day baseline for all three devices.
    pub fn baseline() -> Self {
        Self {
            pcs: PcsTelemetry::baseline(),
            bms: BmsTelemetry::baseline(),
            climate: ClimateTelemetry::baseline(),
        }
    }

    /// Restore every device to its baseline values.
    pub fn reset(&mut self) {
        *self = Self::baseline();
    }
}

//! ---
//! ess_section: "02-telemetry-data-model"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Telemetry entities and wire enumerations for simulated devices."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
//! Closed status/mode enumerations carried on the wire as single registers.
//!
//! Every enumerant has an explicitly assigned ordinal. The ordinals are part of the
//! register contract with the remote controller and must never be renumbered.

use serde::{Deserialize, Serialize};

use crate::ModelError;

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident as $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident = $ordinal:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            Serialize,
            Deserialize,
            strum::EnumIter,
            strum::EnumCount,
            strum::Display,
        )]
        #[repr(u16)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $ordinal),+
        }

        impl From<$name> for u16 {
            fn from(value: $name) -> Self {
                value as u16
            }
        }

        impl TryFrom<u16> for $name {
            type Error = ModelError;

            fn try_from(value: u16) -> Result<Self, Self::Error> {
                match value {
                    $($ordinal => Ok(Self::$variant),)+
                    ordinal => Err(ModelError::InvalidOrdinal { kind: $kind, ordinal }),
                }
            }
        }
    };
}

wire_enum! {
    /// Operating state of the power conversion system.
    PcsStatus as "pcs status" {
        /// Converter halted.
        Stopped = 0,
        /// Converter switching and exchanging power.
        Running = 1,
        /// Ready but idle.
        Standby = 2,
        /// Tripped on a fault.
        Fault = 3,
        /// Taken out of service.
        Maintenance = 4,
    }
}

wire_enum! {
    /// Dispatch mode of the power conversion system.
    PcsWorkMode as "pcs work mode" {
        /// Charging the battery.
        Charging = 0,
        /// Discharging the battery.
        Discharging = 1,
        /// No power exchange.
        Idle = 2,
        /// Grid-following operation.
        GridConnected = 3,
        /// Islanded, grid-forming operation.
        OffGrid = 4,
    }
}

wire_enum! {
    /// Battery pack state. Derived from the sign of total current by the simulator.
    BmsStatus as "bms status" {
        /// No current flowing.
        Idle = 0,
        /// Current flowing into the pack.
        Charging = 1,
        /// Current flowing out of the pack.
        Discharging = 2,
        /// Cell balancing in progress.
        Balancing = 3,
        /// Pack fault.
        Fault = 4,
        /// Protection relay open.
        Protection = 5,
    }
}

wire_enum! {
    /// Battery alarm escalation level.
    AlarmLevel as "alarm level" {
        /// No alarm.
        Normal = 0,
        /// Early warning.
        Warning = 1,
        /// Alarm raised.
        Alarm = 2,
        /// Critical alarm.
        Critical = 3,
    }
}

wire_enum! {
    /// Climate unit operating mode.
    ClimateMode as "climate mode" {
        /// Cooling toward the set-point.
        Cooling = 0,
        /// Heating toward the set-point.
        Heating = 1,
        /// Dehumidifying.
        Dehumidifying = 2,
        /// Fan only.
        Ventilation = 3,
        /// Unit chooses its own mode.
        Auto = 4,
    }
}

wire_enum! {
    /// Climate unit run state.
    ClimateStatus as "climate status" {
        /// Powered off.
        Off = 0,
        /// Compressor and fans running.
        Running = 1,
        /// Powered but idle.
        Standby = 2,
        /// Defrost cycle.
        Defrosting = 3,
        /// Unit fault.
        Fault = 4,
    }
}

wire_enum! {
    /// Requested indoor fan speed.
    FanSpeedLevel as "fan speed level" {
        /// Low speed.
        Low = 0,
        /// Medium speed.
        Medium = 1,
        /// High speed.
        High = 2,
        /// Automatic.
        Auto = 3,
    }
}

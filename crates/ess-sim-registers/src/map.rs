//! ---
//! ess_section: "05-networking-external-interfaces"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Fixed register map and word codec for telemetry transmission."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
//! Holding-register layout for the three simulated devices.

use serde::Serialize;
use strum::IntoEnumIterator;
use thiserror::Error;

/// First register of the power conversion system block.
pub const PCS_BASE: u16 = 40000;
/// First register of the battery management block.
pub const BMS_BASE: u16 = 40100;
/// First register of the climate unit block.
pub const CLIMATE_BASE: u16 = 40200;

/// Device a register block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display, strum::EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum Subsystem {
    /// Power conversion system.
    #[strum(serialize = "pcs")]
    Pcs,
    /// Battery management system.
    #[strum(serialize = "bms")]
    Bms,
    /// Climate unit.
    #[strum(serialize = "climate")]
    Climate,
}

/// How a field is laid out in registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum Encoding {
    /// IEEE-754 single across two registers, low half first. Written with
    /// write-multiple-registers.
    #[strum(serialize = "f32")]
    Float32,
    /// One register. Written with write-single-register.
    #[strum(serialize = "u16")]
    Word,
}

impl Encoding {
    /// Number of registers occupied.
    pub const fn width(self) -> u16 {
        match self {
            Encoding::Float32 => 2,
            Encoding::Word => 1,
        }
    }
}

/// A field within one device's register block.
///
/// Implementors are `#[repr(u16)]` enums whose discriminant is the offset from the
/// block base, iterated in ascending offset order.
pub trait RegisterField: Copy + IntoEnumIterator + Into<&'static str> {
    /// Device owning this block.
    const SUBSYSTEM: Subsystem;
    /// First register of the block.
    const BASE: u16;

    /// Offset from [`Self::BASE`].
    fn offset(self) -> u16;

    /// Layout of the field.
    fn encoding(self) -> Encoding;

    /// Absolute start address.
    fn address(self) -> u16 {
        Self::BASE + self.offset()
    }

    /// Number of registers occupied.
    fn width(self) -> u16 {
        self.encoding().width()
    }

    /// Static label of the field.
    fn name(self) -> &'static str {
        self.into()
    }
}

/// __PCS__ registers, base 40000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter, strum::IntoStaticStr)]
#[repr(u16)]
pub enum PcsRegister {
    /// DC voltage, V.
    DcVoltage = 0,
    /// DC current, A.
    DcCurrent = 2,
    /// DC power, kW.
    DcPower = 4,
    /// AC voltage, V.
    AcVoltage = 6,
    /// AC current, A.
    AcCurrent = 8,
    /// AC power, kW.
    AcPower = 10,
    /// Grid frequency, Hz.
    Frequency = 12,
    /// Power factor.
    PowerFactor = 14,
    /// Efficiency, %.
    Efficiency = 16,
    /// Cabinet temperature, °C.
    Temperature = 18,
    /// See [`PcsStatus`](ess_sim_model::PcsStatus).
    Status = 20,
    /// See [`PcsWorkMode`](ess_sim_model::PcsWorkMode).
    WorkMode = 21,
    /// Vendor fault code.
    FaultCode = 22,
    /// Cumulative running hours.
    RunningHours = 23,
}

impl RegisterField for PcsRegister {
    const SUBSYSTEM: Subsystem = Subsystem::Pcs;
    const BASE: u16 = PCS_BASE;

    fn offset(self) -> u16 {
        self as u16
    }

    fn encoding(self) -> Encoding {
        match self {
            Self::Status | Self::WorkMode | Self::FaultCode => Encoding::Word,
            _ => Encoding::Float32,
        }
    }
}

/// __BMS__ registers, base 40100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter, strum::IntoStaticStr)]
#[repr(u16)]
pub enum BmsRegister {
    /// Pack voltage, V.
    TotalVoltage = 0,
    /// Pack current, A. Positive is discharge.
    TotalCurrent = 2,
    /// State of charge, %.
    Soc = 4,
    /// State of health, %.
    Soh = 6,
    /// Highest cell voltage, V.
    MaxCellVoltage = 8,
    /// Lowest cell voltage, V.
    MinCellVoltage = 10,
    /// Mean cell voltage, V.
    AvgCellVoltage = 12,
    /// Hottest cell, °C.
    MaxTemperature = 14,
    /// Coolest cell, °C.
    MinTemperature = 16,
    /// Mean cell temperature, °C.
    AvgTemperature = 18,
    /// Insulation resistance, MΩ.
    InsulationResistance = 20,
    /// Available energy, kWh.
    AvailableEnergy = 22,
    /// See [`BmsStatus`](ess_sim_model::BmsStatus).
    Status = 24,
    /// See [`AlarmLevel`](ess_sim_model::AlarmLevel).
    AlarmLevel = 25,
    /// Clusters online.
    OnlineClusterCount = 26,
}

impl RegisterField for BmsRegister {
    const SUBSYSTEM: Subsystem = Subsystem::Bms;
    const BASE: u16 = BMS_BASE;

    fn offset(self) -> u16 {
        self as u16
    }

    fn encoding(self) -> Encoding {
        match self {
            Self::Status | Self::AlarmLevel | Self::OnlineClusterCount => Encoding::Word,
            _ => Encoding::Float32,
        }
    }
}

/// __Climate__ registers, base 40200.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter, strum::IntoStaticStr)]
#[repr(u16)]
pub enum ClimateRegister {
    /// Indoor temperature, °C.
    IndoorTemperature = 0,
    /// Outdoor temperature, °C.
    OutdoorTemperature = 2,
    /// Set-point temperature, °C.
    SetTemperature = 4,
    /// Indoor humidity, %.
    IndoorHumidity = 6,
    /// Outdoor humidity, %.
    OutdoorHumidity = 8,
    /// Compressor frequency, Hz.
    CompressorFrequency = 10,
    /// Indoor fan speed, rpm.
    IndoorFanSpeed = 12,
    /// Outdoor fan speed, rpm.
    OutdoorFanSpeed = 13,
    /// Evaporator temperature, °C.
    EvaporatorTemperature = 14,
    /// Condenser temperature, °C.
    CondenserTemperature = 16,
    /// Suction pressure, MPa.
    SuctionPressure = 18,
    /// Discharge pressure, MPa.
    DischargePressure = 20,
    /// Power draw, kW.
    Power = 22,
    /// Cooling capacity, kW.
    CoolingCapacity = 24,
    /// See [`ClimateMode`](ess_sim_model::ClimateMode).
    Mode = 26,
    /// See [`ClimateStatus`](ess_sim_model::ClimateStatus).
    Status = 27,
    /// See [`FanSpeedLevel`](ess_sim_model::FanSpeedLevel).
    FanSpeedLevel = 28,
}

impl RegisterField for ClimateRegister {
    const SUBSYSTEM: Subsystem = Subsystem::Climate;
    const BASE: u16 = CLIMATE_BASE;

    fn offset(self) -> u16 {
        self as u16
    }

    fn encoding(self) -> Encoding {
        match self {
            Self::IndoorFanSpeed
            | Self::OutdoorFanSpeed
            | Self::Mode
            | Self::Status
            | Self::FanSpeedLevel => Encoding::Word,
            _ => Encoding::Float32,
        }
    }
}

/// Flattened description of one mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegisterDescriptor {
    /// Owning device.
    pub subsystem: Subsystem,
    /// Field label.
    pub name: &'static str,
    /// Absolute start address.
    pub address: u16,
    /// Registers occupied.
    pub width: u16,
    /// Layout.
    pub encoding: Encoding,
}

impl RegisterDescriptor {
    fn of<F: RegisterField>(field: F) -> Self {
        Self {
            subsystem: F::SUBSYSTEM,
            name: field.name(),
            address: field.address(),
            width: field.width(),
            encoding: field.encoding(),
        }
    }

    /// Last register occupied by the field.
    pub fn last_address(&self) -> u16 {
        self.address + self.width - 1
    }
}

/// Every mapped field, ordered by device then offset.
pub fn descriptors() -> Vec<RegisterDescriptor> {
    PcsRegister::iter()
        .map(RegisterDescriptor::of)
        .chain(BmsRegister::iter().map(RegisterDescriptor::of))
        .chain(ClimateRegister::iter().map(RegisterDescriptor::of))
        .collect()
}

/// Violations of the register layout contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// Two fields share at least one register.
    #[error("{first} and {second} overlap at register {address}")]
    Overlap {
        /// Earlier field.
        first: &'static str,
        /// Later field.
        second: &'static str,
        /// First shared register.
        address: u16,
    },
}

/// Check that no two fields, in any block, share a register.
pub fn validate_layout() -> Result<(), LayoutError> {
    let mut all = descriptors();
    all.sort_by_key(|descriptor| descriptor.address);
    for pair in all.windows(2) {
        let (first, second) = (&pair[0], &pair[1]);
        if second.address <= first.last_address() {
            return Err(LayoutError::Overlap {
                first: first.name,
                second: second.name,
                address: second.address,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_has_no_overlaps() {
        validate_layout().unwrap();
    }

    #[test]
    fn fields_are_declared_in_ascending_offset_order() {
        fn check<F: RegisterField>() {
            let offsets: Vec<u16> = F::iter().map(|field| field.offset()).collect();
            assert!(offsets.windows(2).all(|pair| pair[0] < pair[1]));
        }
        check::<PcsRegister>();
        check::<BmsRegister>();
        check::<ClimateRegister>();
    }

    #[test]
    fn contract_addresses_are_fixed() {
        assert_eq!(PcsRegister::DcVoltage.address(), 40000);
        assert_eq!(PcsRegister::Status.address(), 40020);
        assert_eq!(PcsRegister::RunningHours.address(), 40023);
        assert_eq!(PcsRegister::RunningHours.width(), 2);
        assert_eq!(BmsRegister::AvailableEnergy.address(), 40122);
        assert_eq!(BmsRegister::OnlineClusterCount.address(), 40126);
        assert_eq!(ClimateRegister::IndoorFanSpeed.address(), 40212);
        assert_eq!(ClimateRegister::OutdoorFanSpeed.width(), 1);
        assert_eq!(ClimateRegister::FanSpeedLevel.address(), 40228);
    }

    #[test]
    fn blocks_stay_inside_their_ranges() {
        for descriptor in descriptors() {
            let base = match descriptor.subsystem {
                Subsystem::Pcs => PCS_BASE,
                Subsystem::Bms => BMS_BASE,
                Subsystem::Climate => CLIMATE_BASE,
            };
            assert!(descriptor.address >= base);
            assert!(descriptor.last_address() < base + 100, "{}", descriptor.name);
        }
    }

    #[test]
    fn field_counts() {
        assert_eq!(PcsRegister::iter().count(), 14);
        assert_eq!(BmsRegister::iter().count(), 15);
        assert_eq!(ClimateRegister::iter().count(), 17);
        assert_eq!(descriptors().len(), 46);
    }
}

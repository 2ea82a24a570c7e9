//! ---
//! ess_section: "05-networking-external-interfaces"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Fixed register map and word codec for telemetry transmission."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
//! Per-device frames: which register writes carry a telemetry snapshot.

use std::collections::BTreeMap;

use ess_sim_model::{BmsTelemetry, ClimateTelemetry, PcsTelemetry, TelemetrySet};
use strum::IntoEnumIterator;

use crate::codec::{RegisterValue, RegisterWrite};
use crate::map::{BmsRegister, ClimateRegister, PcsRegister, RegisterDescriptor, RegisterField};

/// Remote register contents, keyed by absolute address.
pub type RegisterImage = BTreeMap<u16, u16>;

/// Telemetry entity that can be laid out over a register block.
pub trait RegisterSource {
    /// Field enumeration of the block.
    type Field: RegisterField;

    /// Value of one field, narrowed to its wire representation.
    fn value_of(&self, field: Self::Field) -> RegisterValue;
}

/// Build every write for one device, in ascending address order.
pub fn encode_frame<T: RegisterSource>(source: &T) -> Vec<RegisterWrite> {
    T::Field::iter()
        .map(|field| RegisterWrite {
            field: field.name(),
            address: field.address(),
            value: source.value_of(field),
        })
        .collect()
}

/// Read a field back out of a register image. `None` when any of its words is absent.
pub fn decode_field<F: RegisterField>(field: F, image: &RegisterImage) -> Option<RegisterValue> {
    let words = (0..field.width())
        .map(|index| image.get(&(field.address() + index)).copied())
        .collect::<Option<Vec<u16>>>()?;
    RegisterValue::from_words(field.encoding(), &words)
}

/// Decode a flattened descriptor, e.g. one returned by [`descriptors`](crate::descriptors).
pub fn decode_descriptor(
    descriptor: &RegisterDescriptor,
    image: &RegisterImage,
) -> Option<RegisterValue> {
    let words = (descriptor.address..=descriptor.last_address())
        .map(|address| image.get(&address).copied())
        .collect::<Option<Vec<u16>>>()?;
    RegisterValue::from_words(descriptor.encoding, &words)
}

/// Store the words of each write into `image`, as the remote controller would.
pub fn apply_writes(image: &mut RegisterImage, writes: &[RegisterWrite]) {
    for write in writes {
        for (offset, word) in (0u16..).zip(write.value.to_words()) {
            image.insert(write.address + offset, word);
        }
    }
}

/// Register image held remotely after one complete snapshot was delivered.
pub fn snapshot_image(set: &TelemetrySet) -> RegisterImage {
    let mut image = RegisterImage::new();
    apply_writes(&mut image, &encode_frame(&set.pcs));
    apply_writes(&mut image, &encode_frame(&set.bms));
    apply_writes(&mut image, &encode_frame(&set.climate));
    image
}

fn float(value: f64) -> RegisterValue {
    RegisterValue::Float(value as f32)
}

impl RegisterSource for PcsTelemetry {
    type Field = PcsRegister;

    fn value_of(&self, field: PcsRegister) -> RegisterValue {
        match field {
            PcsRegister::DcVoltage => float(self.dc_voltage),
            PcsRegister::DcCurrent => float(self.dc_current),
            PcsRegister::DcPower => float(self.dc_power),
            PcsRegister::AcVoltage => float(self.ac_voltage),
            PcsRegister::AcCurrent => float(self.ac_current),
            PcsRegister::AcPower => float(self.ac_power),
            PcsRegister::Frequency => float(self.frequency),
            PcsRegister::PowerFactor => float(self.power_factor),
            PcsRegister::Efficiency => float(self.efficiency),
            PcsRegister::Temperature => float(self.temperature),
            PcsRegister::Status => RegisterValue::Word(self.status.into()),
            PcsRegister::WorkMode => RegisterValue::Word(self.work_mode.into()),
            PcsRegister::FaultCode => RegisterValue::Word(self.fault_code),
            PcsRegister::RunningHours => float(self.running_hours),
        }
    }
}

impl RegisterSource for BmsTelemetry {
    type Field = BmsRegister;

    fn value_of(&self, field: BmsRegister) -> RegisterValue {
        match field {
            BmsRegister::TotalVoltage => float(self.total_voltage),
            BmsRegister::TotalCurrent => float(self.total_current),
            BmsRegister::Soc => float(self.soc),
            BmsRegister::Soh => float(self.soh),
            BmsRegister::MaxCellVoltage => float(self.max_cell_voltage),
            BmsRegister::MinCellVoltage => float(self.min_cell_voltage),
            BmsRegister::AvgCellVoltage => float(self.avg_cell_voltage),
            BmsRegister::MaxTemperature => float(self.max_temperature),
            BmsRegister::MinTemperature => float(self.min_temperature),
            BmsRegister::AvgTemperature => float(self.avg_temperature),
            BmsRegister::InsulationResistance => float(self.insulation_resistance),
            BmsRegister::AvailableEnergy => float(self.available_energy),
            BmsRegister::Status => RegisterValue::Word(self.status.into()),
            BmsRegister::AlarmLevel => RegisterValue::Word(self.alarm_level.into()),
            BmsRegister::OnlineClusterCount => RegisterValue::Word(self.online_cluster_count),
        }
    }
}

impl RegisterSource for ClimateTelemetry {
    type Field = ClimateRegister;

    fn value_of(&self, field: ClimateRegister) -> RegisterValue {
        match field {
            ClimateRegister::IndoorTemperature => float(self.indoor_temperature),
            ClimateRegister::OutdoorTemperature => float(self.outdoor_temperature),
            ClimateRegister::SetTemperature => float(self.set_temperature),
            ClimateRegister::IndoorHumidity => float(self.indoor_humidity),
            ClimateRegister::OutdoorHumidity => float(self.outdoor_humidity),
            ClimateRegister::CompressorFrequency => float(self.compressor_frequency),
            ClimateRegister::IndoorFanSpeed => RegisterValue::Word(self.indoor_fan_speed),
            ClimateRegister::OutdoorFanSpeed => RegisterValue::Word(self.outdoor_fan_speed),
            ClimateRegister::EvaporatorTemperature => float(self.evaporator_temperature),
            ClimateRegister::CondenserTemperature => float(self.condenser_temperature),
            ClimateRegister::SuctionPressure => float(self.suction_pressure),
            ClimateRegister::DischargePressure => float(self.discharge_pressure),
            ClimateRegister::Power => float(self.power),
            ClimateRegister::CoolingCapacity => float(self.cooling_capacity),
            ClimateRegister::Mode => RegisterValue::Word(self.mode.into()),
            ClimateRegister::Status => RegisterValue::Word(self.status.into()),
            ClimateRegister::FanSpeedLevel => RegisterValue::Word(self.fan_speed_level.into()),
        }
    }
}

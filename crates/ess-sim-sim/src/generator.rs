//! ---
//! ess_section: "11-simulation"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Per-device telemetry tick generators."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
use ess_sim_model::bms::{SOC_CEILING, SOC_FLOOR};
use ess_sim_model::climate::{INDOOR_MAX_C, INDOOR_MIN_C};
use ess_sim_model::derive::{
    ac_power_kw, alarm_level_for, available_energy_kwh, bms_status_for_current, dc_power_kw,
    energy_efficiency_ratio,
};
use ess_sim_model::{
    BmsTelemetry, ClimateMode, ClimateTelemetry, PcsStatus, PcsTelemetry, TelemetrySet,
};
use rand::prelude::*;
use strum::IntoEnumIterator;
use tracing::debug;

/// Hours added to running counters on every tick.
const HOURS_PER_TICK: f64 = 0.001;
/// Probability that the PCS status is redrawn instead of forced to `Running`.
const STATUS_REDRAW_PROBABILITY: f64 = 0.05;
/// Probability that the PCS work mode is redrawn.
const WORK_MODE_REDRAW_PROBABILITY: f64 = 0.10;
/// Maximum per-tick SOC drift in percentage points.
const SOC_STEP: f64 = 0.05;
/// Half-width of the indoor temperature random walk.
const INDOOR_STEP_C: f64 = 0.25;
/// Extra pull toward the set-point when the unit is actively conditioning.
const INDOOR_PULL_C: f64 = 0.3;
/// Band around the set-point inside which indoor temperature settles.
const SETTLE_BAND_C: f64 = 1.0;
/// Pack capacity held by the simulator.
const PACK_ENERGY_KWH: f64 = 100.0;
/// Clusters reported by the simulated pack.
const CLUSTERS: u16 = 8;

/// Advances simulated devices one tick at a time.
///
/// Deterministic up to its random source. Seed it for reproducible runs.
#[derive(Debug, Clone)]
pub struct SimulationEngine<R: Rng = StdRng> {
    rng: R,
}

impl SimulationEngine<StdRng> {
    /// Engine with a reproducible random source.
    pub fn new(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    /// Engine seeded from operating system entropy.
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Seeded when a seed is given, entropy otherwise.
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::new)
    }
}

impl<R: Rng> SimulationEngine<R> {
    /// Engine driven by an arbitrary random source.
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Advance all three devices.
    pub fn tick_all(&mut self, set: &mut TelemetrySet) {
        self.tick_pcs(&mut set.pcs);
        self.tick_bms(&mut set.bms);
        self.tick_climate(&mut set.climate);
    }

    /// Advance the power conversion system.
    pub fn tick_pcs(&mut self, pcs: &mut PcsTelemetry) {
        let rng = &mut self.rng;

        pcs.dc_voltage = rng.gen_range(700.0..800.0);
        pcs.dc_current = rng.gen_range(50.0..150.0);
        pcs.dc_power = dc_power_kw(pcs.dc_voltage, pcs.dc_current);

        pcs.ac_voltage = rng.gen_range(370.0..390.0);
        pcs.ac_current = rng.gen_range(40.0..120.0);
        pcs.frequency = rng.gen_range(49.9..50.1);
        pcs.power_factor = rng.gen_range(0.95..0.99);
        pcs.ac_power = ac_power_kw(pcs.ac_voltage, pcs.ac_current, pcs.power_factor);
        pcs.efficiency = rng.gen_range(95.0..98.0);
        pcs.temperature = rng.gen_range(35.0..55.0);
        pcs.running_hours += HOURS_PER_TICK;

        let previous = pcs.status;
        pcs.status = if rng.gen_bool(STATUS_REDRAW_PROBABILITY) {
            PcsStatus::iter().choose(rng).unwrap_or(PcsStatus::Running)
        } else {
            PcsStatus::Running
        };
        if pcs.status != previous {
            debug!(from = %previous, to = %pcs.status, "pcs status changed");
        }

        if rng.gen_bool(WORK_MODE_REDRAW_PROBABILITY) {
            if let Some(mode) = ess_sim_model::PcsWorkMode::iter().choose(rng) {
                pcs.work_mode = mode;
            }
        }
    }

    /// Advance the battery pack.
    pub fn tick_bms(&mut self, bms: &mut BmsTelemetry) {
        let rng = &mut self.rng;

        bms.total_voltage = rng.gen_range(700.0..800.0);
        bms.total_current = rng.gen_range(-100.0..100.0);
        bms.soc = (bms.soc + rng.gen_range(-SOC_STEP..SOC_STEP)).clamp(SOC_FLOOR, SOC_CEILING);
        bms.soh = rng.gen_range(95.0..100.0);

        bms.avg_cell_voltage = rng.gen_range(3.2..3.7);
        bms.max_cell_voltage = bms.avg_cell_voltage + rng.gen_range(0.0..0.05);
        bms.min_cell_voltage = bms.avg_cell_voltage - rng.gen_range(0.0..0.05);
        bms.cell_voltage_diff = bms.max_cell_voltage - bms.min_cell_voltage;

        bms.avg_temperature = rng.gen_range(25.0..40.0);
        bms.max_temperature = bms.avg_temperature + rng.gen_range(0.0..3.0);
        bms.min_temperature = bms.avg_temperature - rng.gen_range(0.0..3.0);
        bms.temperature_diff = bms.max_temperature - bms.min_temperature;

        bms.total_energy = PACK_ENERGY_KWH;
        bms.available_energy = available_energy_kwh(bms.total_energy, bms.soc);
        bms.insulation_resistance = rng.gen_range(500.0..1000.0);
        bms.cluster_count = CLUSTERS;
        bms.online_cluster_count = CLUSTERS;

        bms.status = bms_status_for_current(bms.total_current);
        bms.alarm_level = alarm_level_for(bms.max_temperature, bms.cell_voltage_diff);
    }

    /// Advance the climate unit.
    pub fn tick_climate(&mut self, climate: &mut ClimateTelemetry) {
        climate.indoor_temperature = self.next_indoor_temperature(climate);

        let rng = &mut self.rng;
        climate.outdoor_temperature = rng.gen_range(25.0..40.0);
        climate.indoor_humidity = rng.gen_range(40.0..70.0);
        climate.outdoor_humidity = rng.gen_range(50.0..90.0);

        let running = climate.is_running();
        if running {
            climate.compressor_frequency = rng.gen_range(30.0..120.0);
            climate.indoor_fan_speed = rng.gen_range(800..1200);
            climate.outdoor_fan_speed = rng.gen_range(600..900);
        } else {
            climate.compressor_frequency = 0.0;
            climate.indoor_fan_speed = 0;
            climate.outdoor_fan_speed = 0;
        }

        climate.evaporator_temperature = rng.gen_range(5.0..15.0);
        climate.condenser_temperature = rng.gen_range(40.0..55.0);
        climate.suction_pressure = rng.gen_range(0.4..0.6);
        climate.discharge_pressure = rng.gen_range(1.5..2.0);

        if running {
            climate.power = rng.gen_range(2.0..5.0);
            climate.total_energy_consumption += climate.power * HOURS_PER_TICK;
            climate.running_hours += HOURS_PER_TICK;
        } else {
            climate.power = 0.0;
        }

        let cop: f64 = rng.gen_range(3.0..4.0);
        climate.cooling_capacity = climate.power * cop;
        climate.eer = energy_efficiency_ratio(climate.cooling_capacity, climate.power);
    }

    fn next_indoor_temperature(&mut self, climate: &ClimateTelemetry) -> f64 {
        let rng = &mut self.rng;
        let current = climate.indoor_temperature;
        let target = climate.set_temperature;
        let step = rng.gen_range(-INDOOR_STEP_C..INDOOR_STEP_C);

        let next = if (current - target).abs() < SETTLE_BAND_C {
            target + step
        } else if climate.mode == ClimateMode::Cooling && current > target {
            current - step.abs() - rng.gen_range(0.0..INDOOR_PULL_C)
        } else if climate.mode == ClimateMode::Heating && current < target {
            current + step.abs() + rng.gen_range(0.0..INDOOR_PULL_C)
        } else {
            current + step
        };
        next.clamp(INDOOR_MIN_C, INDOOR_MAX_C)
    }
}

#[cfg(test)]
mod tests {
    use ess_sim_model::{BmsStatus, ClimateStatus};

    use super::*;

    fn assert_bms_invariants(bms: &BmsTelemetry) {
        assert!((SOC_FLOOR..=SOC_CEILING).contains(&bms.soc), "soc {}", bms.soc);
        assert!(bms.max_cell_voltage >= bms.min_cell_voltage);
        assert!(bms.cell_voltage_diff >= 0.0);
        assert!(bms.max_temperature >= bms.min_temperature);
        assert!(bms.temperature_diff >= 0.0);
        assert_eq!(bms.status, bms_status_for_current(bms.total_current));
        assert_eq!(
            bms.alarm_level,
            alarm_level_for(bms.max_temperature, bms.cell_voltage_diff)
        );
    }

    #[test]
    fn invariants_hold_over_many_ticks() {
        let mut engine = SimulationEngine::new(7);
        let mut set = TelemetrySet::baseline();
        for _ in 0..5_000 {
            engine.tick_all(&mut set);
            assert_bms_invariants(&set.bms);
            assert!((INDOOR_MIN_C..=INDOOR_MAX_C).contains(&set.climate.indoor_temperature));

            let pcs = &set.pcs;
            assert!((pcs.dc_power - pcs.dc_voltage * pcs.dc_current / 1000.0).abs() < 1e-9);
            assert!((pcs.ac_power - ac_power_kw(pcs.ac_voltage, pcs.ac_current, pcs.power_factor)).abs() < 1e-9);

            let climate = &set.climate;
            if climate.power > 0.0 {
                assert_eq!(climate.eer, climate.cooling_capacity / climate.power);
            }
        }
    }

    #[test]
    fn soc_stays_near_baseline_after_one_tick() {
        let mut engine = SimulationEngine::new(1);
        let mut bms = BmsTelemetry::baseline();
        engine.tick_bms(&mut bms);
        assert!((bms.soc - 75.0).abs() <= SOC_STEP);
        assert_bms_invariants(&bms);
    }

    #[test]
    fn soc_clamps_at_the_floor() {
        let mut engine = SimulationEngine::new(3);
        let mut bms = BmsTelemetry::baseline();
        bms.soc = SOC_FLOOR;
        for _ in 0..200 {
            engine.tick_bms(&mut bms);
            assert!(bms.soc >= SOC_FLOOR);
        }
    }

    #[test]
    fn cooling_never_warms_a_room_above_set_point() {
        for seed in 0..500 {
            let mut engine = SimulationEngine::new(seed);
            let mut climate = ClimateTelemetry::baseline();
            assert_eq!(climate.mode, ClimateMode::Cooling);
            assert_eq!((climate.set_temperature, climate.indoor_temperature), (25.0, 26.0));
            engine.tick_climate(&mut climate);
            assert!(climate.indoor_temperature <= 26.0, "seed {seed}");
        }
    }

    #[test]
    fn heating_never_cools_a_room_below_set_point() {
        for seed in 0..500 {
            let mut engine = SimulationEngine::new(seed);
            let mut climate = ClimateTelemetry::baseline();
            climate.mode = ClimateMode::Heating;
            climate.indoor_temperature = 20.0;
            engine.tick_climate(&mut climate);
            assert!(climate.indoor_temperature >= 20.0, "seed {seed}");
        }
    }

    #[test]
    fn indoor_settles_around_set_point() {
        let mut engine = SimulationEngine::new(11);
        let mut climate = ClimateTelemetry::baseline();
        climate.indoor_temperature = 25.4;
        for _ in 0..100 {
            engine.tick_climate(&mut climate);
            assert!((climate.indoor_temperature - 25.0).abs() <= INDOOR_STEP_C);
        }
    }

    #[test]
    fn stopped_unit_reports_zero_load() {
        let mut engine = SimulationEngine::new(5);
        let mut climate = ClimateTelemetry::baseline();
        climate.status = ClimateStatus::Off;
        for _ in 0..250 {
            engine.tick_climate(&mut climate);
            assert_eq!(climate.compressor_frequency, 0.0);
            assert_eq!(climate.indoor_fan_speed, 0);
            assert_eq!(climate.outdoor_fan_speed, 0);
            assert_eq!(climate.power, 0.0);
            assert_eq!(climate.eer, 0.0);
        }
    }

    #[test]
    fn running_unit_accumulates_energy() {
        let mut engine = SimulationEngine::new(9);
        let mut climate = ClimateTelemetry::baseline();
        let before = climate.total_energy_consumption;
        engine.tick_climate(&mut climate);
        assert!(climate.power >= 2.0 && climate.power < 5.0);
        assert!(climate.total_energy_consumption > before);
        assert!((800..1200).contains(&climate.indoor_fan_speed));
    }

    #[test]
    fn pcs_status_is_mostly_running() {
        let mut engine = SimulationEngine::new(21);
        let mut pcs = PcsTelemetry::baseline();
        let mut running = 0;
        for _ in 0..1_000 {
            engine.tick_pcs(&mut pcs);
            if pcs.status == PcsStatus::Running {
                running += 1;
            }
        }
        assert!(running > 900, "running {running}");
        assert!((pcs.running_hours - 1001.0).abs() < 1e-6);
    }

    #[test]
    fn bms_status_tracks_current_sign() {
        let mut engine = SimulationEngine::new(2);
        let mut bms = BmsTelemetry::baseline();
        let mut seen_charging = false;
        let mut seen_discharging = false;
        for _ in 0..100 {
            engine.tick_bms(&mut bms);
            seen_charging |= bms.status == BmsStatus::Charging;
            seen_discharging |= bms.status == BmsStatus::Discharging;
        }
        assert!(seen_charging && seen_discharging);
    }

    #[test]
    fn seeded_engines_are_reproducible() {
        let mut first = SimulationEngine::new(42);
        let mut second = SimulationEngine::new(42);
        let (mut a, mut b) = (TelemetrySet::baseline(), TelemetrySet::baseline());
        for _ in 0..10 {
            first.tick_all(&mut a);
            second.tick_all(&mut b);
        }
        assert_eq!(a, b);
    }
}

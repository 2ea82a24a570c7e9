//! ---
//! ess_section: "01-core-functionality"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Simulator runtime core."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
use std::sync::Arc;

use ess_sim_model::{
    BmsSetpoints, BmsTelemetry, ClimateSetpoints, ClimateTelemetry, PcsSetpoints, PcsTelemetry,
    TelemetrySet,
};
use parking_lot::RwLock;

/// Shared owner of the simulated plant state.
///
/// The simulation trigger is the only regular writer. Send cycles and status readers
/// take clones under the read lock and never observe a half-updated entity.
#[derive(Debug, Clone, Default)]
pub struct TelemetryHub {
    inner: Arc<RwLock<TelemetrySet>>,
}

impl TelemetryHub {
    /// Hub seeded with `set`.
    pub fn new(set: TelemetrySet) -> Self {
        Self {
            inner: Arc::new(RwLock::new(set)),
        }
    }

    /// Hub at the documented baseline.
    pub fn baseline() -> Self {
        Self::new(TelemetrySet::baseline())
    }

    /// Consistent copy of all three devices.
    pub fn snapshot(&self) -> TelemetrySet {
        self.inner.read().clone()
    }

    pub fn pcs(&self) -> PcsTelemetry {
        self.inner.read().pcs.clone()
    }

    pub fn bms(&self) -> BmsTelemetry {
        self.inner.read().bms.clone()
    }

    pub fn climate(&self) -> ClimateTelemetry {
        self.inner.read().climate.clone()
    }

    /// Mutate the set under the write lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut TelemetrySet) -> R) -> R {
        f(&mut *self.inner.write())
    }

    /// Restore every device to baseline.
    pub fn reset(&self) {
        self.inner.write().reset();
    }

    pub fn apply_pcs_setpoints(&self, setpoints: &PcsSetpoints) {
        setpoints.apply(&mut self.inner.write().pcs);
    }

    pub fn apply_bms_setpoints(&self, setpoints: &BmsSetpoints) {
        setpoints.apply(&mut self.inner.write().bms);
    }

    pub fn apply_climate_setpoints(&self, setpoints: &ClimateSetpoints) {
        setpoints.apply(&mut self.inner.write().climate);
    }

    pub fn pcs_setpoints(&self) -> PcsSetpoints {
        PcsSetpoints::read_from(&self.inner.read().pcs)
    }

    pub fn bms_setpoints(&self) -> BmsSetpoints {
        BmsSetpoints::read_from(&self.inner.read().bms)
    }

    pub fn climate_setpoints(&self) -> ClimateSetpoints {
        ClimateSetpoints::read_from(&self.inner.read().climate)
    }
}

#[cfg(test)]
mod tests {
    use ess_sim_model::{ClimateStatus, PcsWorkMode};

    use super::*;

    #[test]
    fn clones_share_state() {
        let hub = TelemetryHub::baseline();
        let other = hub.clone();
        other.update(|set| set.bms.soc = 42.0);
        assert_eq!(hub.bms().soc, 42.0);
    }

    #[test]
    fn snapshots_are_detached() {
        let hub = TelemetryHub::baseline();
        let snapshot = hub.snapshot();
        hub.update(|set| set.pcs.fault_code = 9);
        assert_eq!(snapshot.pcs.fault_code, 0);
        assert_eq!(hub.pcs().fault_code, 9);
    }

    #[test]
    fn setpoints_round_trip_through_the_hub() {
        let hub = TelemetryHub::baseline();
        let mut pcs = hub.pcs_setpoints();
        pcs.work_mode = PcsWorkMode::Idle;
        hub.apply_pcs_setpoints(&pcs);
        assert_eq!(hub.pcs().work_mode, PcsWorkMode::Idle);

        let mut climate = hub.climate_setpoints();
        climate.power_on = false;
        hub.apply_climate_setpoints(&climate);
        assert_eq!(hub.climate().status, ClimateStatus::Off);

        hub.reset();
        assert_eq!(hub.snapshot(), TelemetrySet::baseline());
    }
}

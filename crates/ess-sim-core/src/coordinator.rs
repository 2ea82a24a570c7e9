//! ---
//! ess_section: "01-core-functionality"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Simulator runtime core."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
//! Send cycle: snapshot, write three frames concurrently, retry, then reconnect.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ess_sim_metrics::{CycleOutcomeLabel, SimulatorMetrics};
use ess_sim_model::TelemetrySet;
use ess_sim_registers::{encode_frame, RegisterSource};
use ess_sim_transport::{TransportError, TransportSession};
use tokio::time::sleep;
use tracing::{debug, error, info, trace, warn};

use crate::hub::TelemetryHub;
use crate::stats::RuntimeStats;

/// Attempts per cycle and the back-off before the follow-up reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub reconnect_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, reconnect_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            reconnect_delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

/// Result of one send cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Transport not connected; nothing was written or counted.
    Skipped,
    /// All three devices were written on the given attempt.
    Delivered { attempt: u32 },
    /// Every attempt failed and a reconnect may have been scheduled.
    Exhausted { attempts: u32, reconnect_scheduled: bool },
    /// An operator disconnect landed mid-cycle; retries stopped after `attempt` and nothing
    /// was counted or scheduled.
    Interrupted { attempt: u32 },
}

/// Pushes telemetry snapshots to the remote controller.
#[derive(Debug)]
pub struct TransmissionCoordinator {
    session: Arc<TransportSession>,
    hub: TelemetryHub,
    stats: Arc<RuntimeStats>,
    station_id: u8,
    policy: RetryPolicy,
    metrics: Option<SimulatorMetrics>,
    reconnect_pending: Arc<AtomicBool>,
    reconnect_epoch: Arc<AtomicU64>,
}

impl TransmissionCoordinator {
    pub fn new(
        session: Arc<TransportSession>,
        hub: TelemetryHub,
        stats: Arc<RuntimeStats>,
        station_id: u8,
        policy: RetryPolicy,
        metrics: Option<SimulatorMetrics>,
    ) -> Self {
        Self {
            session,
            hub,
            stats,
            station_id,
            policy,
            metrics,
            reconnect_pending: Arc::new(AtomicBool::new(false)),
            reconnect_epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn session(&self) -> &Arc<TransportSession> {
        &self.session
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Whether a reconnect has been scheduled and not yet run.
    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending.load(Ordering::Acquire)
    }

    /// Drop any scheduled reconnect, e.g. after an operator disconnect. A cycle in flight
    /// stops retrying and schedules nothing.
    pub fn cancel_pending_reconnect(&self) {
        self.reconnect_epoch.fetch_add(1, Ordering::AcqRel);
        self.reconnect_pending.store(false, Ordering::Release);
    }

    /// Run one cycle.
    pub async fn run_cycle(&self) -> CycleOutcome {
        if !self.session.is_connected().await {
            trace!("send cycle skipped, transport not connected");
            return CycleOutcome::Skipped;
        }
        self.stats.record_attempt();
        let cycle_epoch = self.reconnect_epoch.load(Ordering::Acquire);

        for attempt in 1..=self.policy.max_attempts {
            let snapshot = self.hub.snapshot();
            match self.send_snapshot(&snapshot).await {
                Ok(()) => {
                    self.stats.record_success();
                    if let Some(metrics) = &self.metrics {
                        metrics.record_cycle(CycleOutcomeLabel::Delivered);
                    }
                    debug!(attempt, station = self.station_id, "telemetry delivered");
                    return CycleOutcome::Delivered { attempt };
                }
                Err(err) => {
                    warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        error = %err,
                        "send attempt failed",
                    );
                    if self.reconnect_epoch.load(Ordering::Acquire) != cycle_epoch {
                        info!(attempt, "send cycle interrupted by disconnect");
                        return CycleOutcome::Interrupted { attempt };
                    }
                }
            }
        }

        self.stats.record_failure();
        if let Some(metrics) = &self.metrics {
            metrics.record_cycle(CycleOutcomeLabel::Exhausted);
            if !self.session.is_connected().await {
                metrics.set_connected(false);
            }
        }
        error!(
            attempts = self.policy.max_attempts,
            "send attempts exhausted; scheduling reconnect"
        );
        let reconnect_scheduled = self.schedule_reconnect(cycle_epoch);
        CycleOutcome::Exhausted {
            attempts: self.policy.max_attempts,
            reconnect_scheduled,
        }
    }

    async fn send_snapshot(&self, snapshot: &TelemetrySet) -> Result<(), TransportError> {
        let (pcs, bms, climate) = tokio::join!(
            self.send_frame(&snapshot.pcs),
            self.send_frame(&snapshot.bms),
            self.send_frame(&snapshot.climate),
        );
        pcs.and(bms).and(climate)
    }

    async fn send_frame<T: RegisterSource>(&self, source: &T) -> Result<(), TransportError> {
        for write in encode_frame(source) {
            self.session.write_value(self.station_id, &write).await?;
        }
        Ok(())
    }

    fn schedule_reconnect(&self, cycle_epoch: u64) -> bool {
        if self.reconnect_pending.swap(true, Ordering::AcqRel) {
            debug!("reconnect already pending");
            return false;
        }
        if self.reconnect_epoch.load(Ordering::Acquire) != cycle_epoch {
            self.reconnect_pending.store(false, Ordering::Release);
            debug!("reconnect cancelled before scheduling");
            return false;
        }
        self.stats.record_reconnect_scheduled();
        if let Some(metrics) = &self.metrics {
            metrics.inc_reconnect();
        }

        let session = self.session.clone();
        let pending = self.reconnect_pending.clone();
        let epoch = self.reconnect_epoch.clone();
        let delay = self.policy.reconnect_delay;
        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            if epoch.load(Ordering::Acquire) != cycle_epoch {
                debug!("scheduled reconnect cancelled");
                return;
            }
            let connected = session.reconnect().await;
            pending.store(false, Ordering::Release);
            if let Some(metrics) = &metrics {
                metrics.set_connected(connected);
            }
            if connected {
                info!("transport reconnected after exhausted send cycle");
            } else {
                warn!("scheduled reconnect failed");
            }
        });
        true
    }
}

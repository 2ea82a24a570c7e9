//! ---
//! ess_section: "01-core-functionality"
//! ess_subsection: "module"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Simulator runtime core."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
//! Dual-rate scheduler: one periodic task ticks the simulation, another drives send
//! cycles. Each runs its action inline, so a trigger never overlaps itself.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ess_sim_common::MIN_INTERVAL;
use ess_sim_metrics::SimulatorMetrics;
use ess_sim_sim::SimulationEngine;
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::coordinator::TransmissionCoordinator;
use crate::hub::TelemetryHub;
use crate::stats::RuntimeStats;

/// Interval whose first tick fires one period from now and which delays, rather than
/// bursts, after a missed tick.
fn periodic(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Parse an operator supplied millisecond count.
pub fn parse_interval_ms(input: &str) -> Option<Duration> {
    let millis = input.trim().parse::<u64>().ok()?;
    let interval = Duration::from_millis(millis);
    (interval >= MIN_INTERVAL).then_some(interval)
}

#[derive(Debug)]
struct RunningTrigger {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// One periodic trigger: its current period and, while started, its task.
#[derive(Debug)]
struct Trigger {
    name: &'static str,
    period: watch::Sender<Duration>,
    running: Mutex<Option<RunningTrigger>>,
}

impl Trigger {
    fn new(name: &'static str, period: Duration) -> Self {
        let (period, _) = watch::channel(period.max(MIN_INTERVAL));
        Self {
            name,
            period,
            running: Mutex::new(None),
        }
    }

    fn period(&self) -> Duration {
        *self.period.borrow()
    }

    fn set_period(&self, period: Duration) -> bool {
        if period < MIN_INTERVAL {
            warn!(
                trigger = self.name,
                requested_ms = period.as_millis() as u64,
                floor_ms = MIN_INTERVAL.as_millis() as u64,
                "interval below floor rejected"
            );
            return false;
        }
        self.period.send_replace(period);
        debug!(trigger = self.name, period_ms = period.as_millis() as u64, "interval updated");
        true
    }

    fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    fn start<F, Fut>(&self, mut action: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| !r.task.is_finished()) {
            return false;
        }
        let (stop_tx, mut stop_rx) = oneshot::channel();
        let mut period_rx = self.period.subscribe();
        let name = self.name;
        let task = tokio::spawn(async move {
            let mut ticker = periodic(*period_rx.borrow_and_update());
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    changed = period_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let period = *period_rx.borrow_and_update();
                        ticker = periodic(period);
                        debug!(trigger = name, period_ms = period.as_millis() as u64, "trigger re-armed");
                    }
                    _ = ticker.tick() => action().await,
                }
            }
            debug!(trigger = name, "trigger stopped");
        });
        *running = Some(RunningTrigger {
            stop: stop_tx,
            task,
        });
        info!(trigger = self.name, period_ms = self.period().as_millis() as u64, "trigger started");
        true
    }

    fn stop(&self) -> Option<JoinHandle<()>> {
        let running = self.running.lock().take()?;
        let _ = running.stop.send(());
        Some(running.task)
    }
}

/// Owns the simulation and send triggers.
#[derive(Debug)]
pub struct Scheduler {
    hub: TelemetryHub,
    engine: Arc<Mutex<SimulationEngine>>,
    coordinator: Arc<TransmissionCoordinator>,
    stats: Arc<RuntimeStats>,
    metrics: Option<SimulatorMetrics>,
    auto_send: Arc<AtomicBool>,
    simulation: Trigger,
    send: Trigger,
}

impl Scheduler {
    pub fn new(
        hub: TelemetryHub,
        engine: SimulationEngine,
        coordinator: Arc<TransmissionCoordinator>,
        stats: Arc<RuntimeStats>,
        metrics: Option<SimulatorMetrics>,
        simulation_interval: Duration,
        send_interval: Duration,
    ) -> Self {
        Self {
            hub,
            engine: Arc::new(Mutex::new(engine)),
            coordinator,
            stats,
            metrics,
            auto_send: Arc::new(AtomicBool::new(false)),
            simulation: Trigger::new("simulation", simulation_interval),
            send: Trigger::new("send", send_interval),
        }
    }

    /// Advance every device once, outside the trigger.
    pub fn simulate_once(&self) {
        tick(&self.engine, &self.hub, &self.stats, self.metrics.as_ref());
    }

    pub fn start_simulation(&self) -> bool {
        let engine = self.engine.clone();
        let hub = self.hub.clone();
        let stats = self.stats.clone();
        let metrics = self.metrics.clone();
        self.simulation.start(move || {
            tick(&engine, &hub, &stats, metrics.as_ref());
            std::future::ready(())
        })
    }

    pub fn stop_simulation(&self) {
        if self.simulation.stop().is_some() {
            info!("simulation stopped");
        }
    }

    /// Start when stopped, stop when running. Returns the new state.
    pub fn toggle_simulation(&self) -> bool {
        if self.is_simulating() {
            self.stop_simulation();
            false
        } else {
            self.start_simulation()
        }
    }

    pub fn is_simulating(&self) -> bool {
        self.simulation.is_running()
    }

    pub fn start_sending(&self) -> bool {
        let coordinator = self.coordinator.clone();
        let auto_send = self.auto_send.clone();
        self.send.start(move || {
            let coordinator = coordinator.clone();
            let auto_send = auto_send.clone();
            async move {
                if auto_send.load(Ordering::Acquire) {
                    coordinator.run_cycle().await;
                }
            }
        })
    }

    /// Prevent new send cycles. An in-flight cycle runs to completion.
    pub fn stop_sending(&self) {
        if self.send.stop().is_some() {
            info!("sending stopped");
        }
    }

    pub fn is_sending(&self) -> bool {
        self.send.is_running()
    }

    pub fn set_auto_send(&self, enabled: bool) {
        self.auto_send.store(enabled, Ordering::Release);
    }

    pub fn auto_send(&self) -> bool {
        self.auto_send.load(Ordering::Acquire)
    }

    pub fn simulation_interval(&self) -> Duration {
        self.simulation.period()
    }

    pub fn send_interval(&self) -> Duration {
        self.send.period()
    }

    /// Change the simulation period; a running trigger is re-armed. `false` below the floor.
    pub fn set_simulation_interval(&self, interval: Duration) -> bool {
        self.simulation.set_period(interval)
    }

    /// Change the send period; a running trigger is re-armed. `false` below the floor.
    pub fn set_send_interval(&self, interval: Duration) -> bool {
        self.send.set_period(interval)
    }

    /// String form of [`Self::set_simulation_interval`]; rejects non-numeric input.
    pub fn set_simulation_interval_str(&self, input: &str) -> bool {
        match parse_interval_ms(input) {
            Some(interval) => self.set_simulation_interval(interval),
            None => {
                warn!(input, "invalid simulation interval");
                false
            }
        }
    }

    /// String form of [`Self::set_send_interval`]; rejects non-numeric input.
    pub fn set_send_interval_str(&self, input: &str) -> bool {
        match parse_interval_ms(input) {
            Some(interval) => self.set_send_interval(interval),
            None => {
                warn!(input, "invalid send interval");
                false
            }
        }
    }

    /// Stop both triggers and wait for their tasks to exit.
    pub async fn shutdown(&self) {
        let handles = [self.simulation.stop(), self.send.stop()];
        for handle in handles.into_iter().flatten() {
            if let Err(err) = handle.await {
                warn!(error = %err, "trigger task join error");
            }
        }
    }
}

fn tick(
    engine: &Mutex<SimulationEngine>,
    hub: &TelemetryHub,
    stats: &RuntimeStats,
    metrics: Option<&SimulatorMetrics>,
) {
    let mut engine = engine.lock();
    hub.update(|set| engine.tick_all(set));
    stats.record_update();
    if let Some(metrics) = metrics {
        metrics.inc_tick();
    }
}

#[cfg(test)]
mod tests {
    use ess_sim_model::TelemetrySet;
    use ess_sim_transport::mock::{MockBus, MockFailure};
    use ess_sim_transport::{SessionOptions, TransportSession};

    use super::*;
    use crate::coordinator::RetryPolicy;

    struct Fixture {
        bus: MockBus,
        hub: TelemetryHub,
        stats: Arc<RuntimeStats>,
        scheduler: Scheduler,
    }

    fn fixture() -> Fixture {
        let bus = MockBus::new();
        let hub = TelemetryHub::baseline();
        let stats = Arc::new(RuntimeStats::new());
        let session = Arc::new(TransportSession::new(
            Arc::new(bus.connector()),
            SessionOptions::default(),
        ));
        let coordinator = Arc::new(TransmissionCoordinator::new(
            session,
            hub.clone(),
            stats.clone(),
            1,
            RetryPolicy::default(),
            None,
        ));
        let scheduler = Scheduler::new(
            hub.clone(),
            SimulationEngine::new(3),
            coordinator,
            stats.clone(),
            None,
            Duration::from_millis(1000),
            Duration::from_millis(1000),
        );
        Fixture {
            bus,
            hub,
            stats,
            scheduler,
        }
    }

    #[test]
    fn interval_strings_respect_the_floor() {
        assert_eq!(parse_interval_ms(" 250 "), Some(Duration::from_millis(250)));
        assert_eq!(parse_interval_ms("100"), Some(MIN_INTERVAL));
        assert_eq!(parse_interval_ms("99"), None);
        assert_eq!(parse_interval_ms("fast"), None);
        assert_eq!(parse_interval_ms("-5"), None);
    }

    #[tokio::test]
    async fn rejected_intervals_keep_the_old_value() {
        let fixture = fixture();
        let scheduler = &fixture.scheduler;
        assert!(!scheduler.set_send_interval_str("abc"));
        assert!(!scheduler.set_simulation_interval(Duration::from_millis(50)));
        assert_eq!(scheduler.send_interval(), Duration::from_millis(1000));
        assert_eq!(scheduler.simulation_interval(), Duration::from_millis(1000));
        assert!(scheduler.set_send_interval_str("500"));
        assert_eq!(scheduler.send_interval(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn simulation_trigger_ticks_each_period() {
        let fixture = fixture();
        assert!(fixture.scheduler.start_simulation());
        assert!(!fixture.scheduler.start_simulation());

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(fixture.stats.snapshot().updates, 3);
        assert_ne!(fixture.hub.snapshot(), TelemetrySet::baseline());

        fixture.scheduler.stop_simulation();
        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(fixture.stats.snapshot().updates, 3);
        assert!(!fixture.scheduler.is_simulating());
    }

    #[tokio::test(start_paused = true)]
    async fn changing_the_period_rearms_only_that_trigger() {
        let fixture = fixture();
        fixture.scheduler.start_simulation();
        fixture.scheduler.start_sending();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(fixture.stats.snapshot().updates, 1);

        assert!(fixture.scheduler.set_simulation_interval(Duration::from_millis(200)));
        tokio::time::sleep(Duration::from_millis(1050)).await;
        assert_eq!(fixture.stats.snapshot().updates, 1 + 5);
        assert!(fixture.scheduler.is_sending());
        assert_eq!(fixture.scheduler.send_interval(), Duration::from_millis(1000));
        fixture.scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn send_trigger_respects_auto_send_and_connection() {
        let fixture = fixture();
        fixture.scheduler.start_sending();
        fixture.scheduler.set_auto_send(true);
        tokio::time::sleep(Duration::from_millis(2500)).await;
        // Not connected: cycles are skipped without counting.
        assert_eq!(fixture.stats.snapshot().send_attempts, 0);
        assert_eq!(fixture.bus.write_calls(), 0);

        let session = fixture.scheduler.coordinator.session().clone();
        assert!(session.connect("plc", 502).await);
        fixture.scheduler.set_auto_send(false);
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(fixture.stats.snapshot().send_attempts, 0);

        fixture.scheduler.set_auto_send(true);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(fixture.stats.snapshot().send_attempts, 1);
        assert_eq!(fixture.stats.snapshot().send_successes, 1);
        fixture.scheduler.shutdown().await;
        assert!(!fixture.scheduler.is_sending());
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_sends_lets_the_running_cycle_finish() {
        let fixture = fixture();
        let session = fixture.scheduler.coordinator.session().clone();
        assert!(session.connect("plc", 502).await);
        fixture.bus.fail_writes(Some(MockFailure::Hang));
        fixture.scheduler.set_auto_send(true);
        fixture.scheduler.start_sending();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(fixture.stats.snapshot().send_attempts, 1);
        fixture.scheduler.stop_sending();
        assert!(!fixture.scheduler.is_sending());

        // The stalled write times out and the cycle still runs to exhaustion.
        tokio::time::sleep(Duration::from_millis(2000)).await;
        let snapshot = fixture.stats.snapshot();
        assert_eq!(snapshot.send_attempts, 1);
        assert_eq!(snapshot.send_failures, 1);
        assert_eq!(snapshot.reconnects_scheduled, 1);

        fixture.bus.fail_writes(None);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(session.is_connected().await);
        assert_eq!(fixture.stats.snapshot().send_attempts, 1);
        assert!(fixture.bus.writes().is_empty());
    }

    #[test]
    fn simulate_once_counts_an_update() {
        let fixture = fixture();
        fixture.scheduler.simulate_once();
        assert_eq!(fixture.stats.snapshot().updates, 1);
    }
}

//! ---
//! ess_section: "15-testing-qa-runbook"
//! ess_subsection: "integration-tests"
//! ess_type: "source"
//! ess_scope: "code"
//! ess_description: "Integration and validation tests for the ESS-SIM stack."
//! ess_version: "v0.0.0-prealpha"
//! ess_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use ess_sim_common::AppConfig;
use ess_sim_core::SimulatorRuntime;
use ess_sim_metrics::{new_registry, CycleOutcomeLabel, SimulatorMetrics};
use ess_sim_registers::{decode_field, BmsRegister, ClimateRegister, PcsRegister};
use ess_sim_transport::mock::{MockBus, MockFailure};
use ess_sim_transport::SessionPhase;

fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.simulation.random_seed = Some(7);
    config.transport.station_id = 3;
    config
}

fn runtime_with_metrics(bus: &MockBus) -> (SimulatorRuntime, SimulatorMetrics) {
    let metrics = SimulatorMetrics::new(new_registry()).unwrap();
    let runtime =
        SimulatorRuntime::with_connector(&config(), Arc::new(bus.connector()), Some(metrics.clone()));
    (runtime, metrics)
}

#[tokio::test(start_paused = true)]
async fn disconnected_runtime_never_writes() {
    let bus = MockBus::new();
    let (runtime, _metrics) = runtime_with_metrics(&bus);
    runtime.start().await;
    runtime.scheduler().start_sending();

    tokio::time::sleep(Duration::from_millis(5500)).await;
    let stats = runtime.stats();
    assert_eq!(bus.write_calls(), 0);
    assert_eq!(stats.send_attempts, 0);
    assert_eq!(stats.send_failures, 0);
    assert_eq!(stats.updates, 5);
    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn remote_image_matches_the_snapshot() {
    let bus = MockBus::new();
    let (runtime, metrics) = runtime_with_metrics(&bus);
    runtime.scheduler().stop_simulation();
    assert!(runtime.connect().await);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(metrics.cycles(CycleOutcomeLabel::Delivered), 1);

    let telemetry = runtime.telemetry();
    let image = bus.image();
    let value = |field| decode_field(field, &image);
    assert_eq!(
        value(PcsRegister::DcVoltage).and_then(|v| v.as_f32()),
        Some(telemetry.pcs.dc_voltage as f32)
    );
    assert_eq!(
        value(PcsRegister::WorkMode).and_then(|v| v.as_word()),
        Some(u16::from(telemetry.pcs.work_mode))
    );
    assert_eq!(
        decode_field(BmsRegister::Soc, &image).and_then(|v| v.as_f32()),
        Some(telemetry.bms.soc as f32)
    );
    assert_eq!(
        decode_field(BmsRegister::OnlineClusterCount, &image).and_then(|v| v.as_word()),
        Some(telemetry.bms.online_cluster_count)
    );
    assert_eq!(
        decode_field(ClimateRegister::Mode, &image).and_then(|v| v.as_word()),
        Some(u16::from(telemetry.climate.mode))
    );
    assert!(bus.writes().iter().all(|write| write.station == 3));
    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failing_controller_costs_one_failure_and_one_reconnect_per_cycle() {
    let bus = MockBus::new();
    let (runtime, metrics) = runtime_with_metrics(&bus);
    assert!(runtime.connect().await);
    bus.fail_writes(Some(MockFailure::Exception));

    tokio::time::sleep(Duration::from_millis(1050)).await;
    let stats = runtime.stats();
    assert_eq!(stats.send_attempts, 1);
    assert_eq!(stats.send_failures, 1);
    assert_eq!(stats.reconnects_scheduled, 1);
    assert_eq!(bus.write_calls(), 9);
    assert_eq!(metrics.cycles(CycleOutcomeLabel::Exhausted), 1);
    assert_eq!(metrics.reconnects(), 1);

    bus.fail_writes(None);
    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(runtime.session().phase().await, SessionPhase::Connected);
    assert!(runtime.stats().send_successes >= 1);
    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn hung_controller_times_out_and_drops_the_link() {
    let bus = MockBus::new();
    let (runtime, _metrics) = runtime_with_metrics(&bus);
    assert!(runtime.connect().await);
    bus.fail_writes(Some(MockFailure::Hang));

    tokio::time::sleep(Duration::from_millis(3500)).await;
    let stats = runtime.stats();
    assert_eq!(stats.send_attempts, 1);
    assert_eq!(stats.send_failures, 1);
    runtime.disconnect().await;
    assert_eq!(runtime.session().phase().await, SessionPhase::Disconnected);
}

//! Vapor-reference supervision and actuator write failures.

use crate::mock_hw::{ActuatorCall, Rig};
use stillctl::app::commands::AppCommand;
use stillctl::app::ports::AlertKind;
use stillctl::config::ProcessConfig;
use stillctl::fsm::Status;

fn overclocking() -> Rig {
    let mut r = Rig::new(ProcessConfig::default());
    r.command(AppCommand::AdvanceStage);
    r.run_for(3_000);
    assert_eq!(r.app.status(), Status::Overclock);
    assert_eq!(r.hw.heaters(), (true, true));
    r
}

#[test]
fn hot_reference_trips_once_and_stops_heaters() {
    let mut r = overclocking();
    r.hw.reference_c = 50.0;
    r.run_for(9_000);
    assert_eq!(r.app.status(), Status::Overclock, "still debouncing");

    r.run_for(5_000);
    assert_eq!(r.app.status(), Status::ErrorReference);
    assert_eq!(r.hw.heaters(), (false, false));
    assert_eq!(r.hw.pump_duty, 0);

    r.run_for(20_000);
    assert_eq!(r.sink.faults(), 1);
    let tones = r
        .alerts
        .heard
        .iter()
        .filter(|k| **k == AlertKind::ErrorTone)
        .count();
    assert_eq!(tones, 1);
}

#[test]
fn error_holds_after_reference_cools_until_operator_leaves() {
    let mut r = overclocking();
    r.hw.reference_c = 50.0;
    r.run_for(15_000);
    assert_eq!(r.app.status(), Status::ErrorReference);

    r.hw.reference_c = 25.0;
    r.run_for(10_000);
    assert_eq!(r.app.status(), Status::ErrorReference);

    r.command(AppCommand::AdvanceStage);
    assert_eq!(r.app.status(), Status::Off);
    assert_eq!(r.alerts.silenced, 1);
    r.run_for(5_000);
    assert_eq!(r.app.status(), Status::Off);
}

#[test]
fn leaving_while_still_hot_trips_again() {
    let mut r = overclocking();
    r.hw.reference_c = 50.0;
    r.run_for(15_000);
    r.command(AppCommand::RetreatStage);
    assert_eq!(r.app.status(), Status::Off);

    r.run_for(2_000);
    assert_eq!(r.app.status(), Status::ErrorReference);
    assert_eq!(r.sink.faults(), 2);
}

#[test]
fn reference_supervised_while_off() {
    let mut r = Rig::new(ProcessConfig::default());
    r.hw.reference_c = 43.0;
    r.run_for(15_000);
    assert_eq!(r.app.status(), Status::ErrorReference);
}

#[test]
fn faulted_reference_probe_is_hidden_and_trips() {
    let mut r = overclocking();
    r.hw.reference_c = 5000.0;
    r.run_for(20_000);
    assert_eq!(r.app.build_telemetry().reference_c, None);
    assert_eq!(r.app.status(), Status::ErrorReference);
    let t = r.sink.last_telemetry().expect("telemetry emitted");
    assert_eq!(t.status, Status::ErrorReference.label());
}

#[test]
fn failed_valve_write_is_retried() {
    let mut r = Rig::new(ProcessConfig::default());
    r.hw.fail_valve_writes = true;
    r.run_for(500);
    assert!(r.hw.valve_edges(false).is_empty());
    assert!(r.hw.calls.iter().any(|(_, c)| *c == ActuatorCall::HeaterOne(false)));

    r.hw.fail_valve_writes = false;
    r.pass();
    assert_eq!(r.hw.valve_edges(false).len(), 1);
    r.run_for(500);
    assert_eq!(r.hw.valve_edges(false).len(), 1, "written once, then only on change");
}

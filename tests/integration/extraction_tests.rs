//! Extraction run: overclock, stabilization, process with coolant flow
//! supervision and boiler limits.

use crate::mock_hw::Rig;
use stillctl::app::commands::AppCommand;
use stillctl::app::ports::AlertKind;
use stillctl::config::ProcessConfig;
use stillctl::control::flow::DUTY_MAX;
use stillctl::fsm::Status;

/// Reach PROCESS with a healthy still: boiler on target, output just over.
fn rig_in_process() -> Rig {
    let config = ProcessConfig {
        ext_settle_minutes: 1,
        ..Default::default()
    };
    let mut r = Rig::new(config);
    r.hw.boiler_c = 98.7;
    r.hw.output_c = 91.0;
    r.hw.pulses_per_drain = 1;

    r.command(AppCommand::AdvanceStage);
    r.run_for(8_000);
    assert_eq!(r.app.status(), Status::Stabilization);
    assert!(r.hw.pump_duty == 0, "pump sleeps until PROCESS");
    r.run_for(62_000);
    assert_eq!(r.app.status(), Status::Process);
    r
}

#[test]
fn process_wakes_pump_and_tracks_flow_target() {
    let mut r = rig_in_process();
    r.run_for(30_000);
    assert_eq!(r.app.status(), Status::Process);
    assert!(!r.app.flow().is_asleep());
    assert!(r.hw.pump_duty > 0);
    assert_eq!(r.hw.heaters(), (true, false));
    // Output over target nudges the flow target up from 10 L/h.
    let target = r.app.config().pump_target_speed_lph;
    assert!(target > 10.0 && target <= 30.0, "target {target}");
}

#[test]
fn flow_loss_ends_the_run() {
    let mut r = rig_in_process();
    r.hw.pulses_per_drain = 0;
    r.run_for(45_000);
    assert_eq!(r.app.status(), Status::End);
    assert!(r.alerts.heard.contains(&AlertKind::EndTone));
    assert_eq!(r.hw.heaters(), (false, false));
    assert_eq!(r.hw.pump_duty, 0);
}

#[test]
fn cold_boiler_is_an_error() {
    let mut r = rig_in_process();
    r.hw.boiler_c = 85.0;
    r.run_for(35_000);
    assert_eq!(r.app.status(), Status::ErrorBoiler);
    assert!(r.alerts.heard.contains(&AlertKind::ErrorTone));
    assert_eq!(r.hw.heaters(), (false, false));

    r.command(AppCommand::AdvanceStage);
    assert_eq!(r.app.status(), Status::Off);
}

#[test]
fn dry_flow_sensor_floods_pump_to_full_duty() {
    let mut r = rig_in_process();
    r.hw.pulses_per_drain = 0;
    r.run_for(20_000);
    assert!(r.app.flow().is_flooded());
    assert_eq!(r.hw.pump_duty, DUTY_MAX);
}

#[test]
fn manual_override_holds_duty() {
    let mut r = rig_in_process();
    r.command(AppCommand::ToggleManualPump);
    let duty = r.app.flow().duty();
    r.command(AppCommand::AdjustManualDuty {
        up: false,
        step: stillctl::app::commands::Step::Coarse,
    });
    r.run_for(20_000);
    assert!(r.app.flow().is_manual());
    assert_eq!(r.app.flow().duty(), duty.saturating_sub(5));
}

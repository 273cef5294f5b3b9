//! Full rectification run: overclock, stabilization, head, body with an
//! output-temperature pause, tail hold, tail stage and end.

use crate::mock_hw::Rig;
use stillctl::app::commands::AppCommand;
use stillctl::app::ports::AlertKind;
use stillctl::config::ProcessConfig;
use stillctl::control::valve::open_time_for_speed;
use stillctl::fsm::{Mode, Status};

fn rig() -> Rig {
    let config = ProcessConfig {
        rect_settle_minutes: 1,
        rect_body_speed: 1500,
        ..Default::default()
    };
    let mut rig = Rig::new(config);
    rig.hw.output_c = 80.0;
    rig.command(AppCommand::NextMode);
    assert_eq!(rig.app.mode(), Mode::Rectification);
    rig
}

/// Advance into HEAD through overclock and a one-minute stabilization.
fn run_to_head(rig: &mut Rig) {
    rig.command(AppCommand::AdvanceStage);
    assert_eq!(rig.app.status(), Status::Overclock);
    rig.run_for(15_000);
    assert_eq!(rig.app.status(), Status::Stabilization);
    rig.run_for(62_000);
    assert_eq!(rig.app.status(), Status::Head);
    rig.run_for(2_000);
}

#[test]
fn overclock_runs_both_heaters_then_holds_one() {
    let mut r = rig();
    r.command(AppCommand::AdvanceStage);
    r.run_for(2_000);
    assert_eq!(r.hw.heaters(), (true, true));
    assert!(r.hw.cooler, "output above 70 C engages the cooler");

    r.run_for(13_000);
    assert_eq!(r.app.status(), Status::Stabilization);
    assert_eq!(r.hw.heaters(), (true, false));
    assert!(r.alerts.heard.contains(&AlertKind::Chime));
}

#[test]
fn head_meters_valve_at_head_speed() {
    let mut r = rig();
    run_to_head(&mut r);
    let open_time = open_time_for_speed(r.app.config().rect_head_speed);
    assert_eq!(r.app.context().offtake.valve_open_time_ms, open_time);

    // Two full cycles: two openings, each closing after the open time.
    r.hw.calls.clear();
    r.run_for(10_000);
    let opens = r.hw.valve_edges(true);
    let closes = r.hw.valve_edges(false);
    assert_eq!(opens.len(), 2, "opens at {:?}", opens);
    assert_eq!(closes.len(), 2, "closes at {:?}", closes);
    let held = closes[0] - opens[0];
    assert!(held > u64::from(open_time) && held <= u64::from(open_time) + 100);
}

#[test]
fn body_pauses_on_output_rise_and_resumes_after_cooldown() {
    let mut r = rig();
    run_to_head(&mut r);
    r.command(AppCommand::AdvanceStage);
    assert_eq!(r.app.status(), Status::Body);
    r.run_for(3_000);

    let off = r.app.context().offtake;
    assert_eq!(off.start_body_temp_c, 80.0);
    assert_eq!(off.real_speed, 1500);
    assert_eq!(off.valve_open_time_ms, open_time_for_speed(1500));

    r.hw.output_c = 80.4;
    r.run_for(8_000);
    let off = r.app.context().offtake;
    assert!(off.paused);
    assert_eq!(off.real_speed, 1350);
    assert_eq!(off.valve_open_time_ms, 0);
    assert!(!r.hw.valve, "pause closes the valve");

    r.hw.output_c = 80.2;
    r.run_for(170_000);
    assert!(r.app.context().offtake.paused, "cooldown not yet over");

    r.run_for(20_000);
    let off = r.app.context().offtake;
    assert!(!off.paused);
    assert_eq!(off.valve_open_time_ms, open_time_for_speed(1350));
    assert_eq!(r.app.status(), Status::Body);
}

#[test]
fn sensor_fault_on_output_never_pauses() {
    let mut r = rig();
    run_to_head(&mut r);
    r.command(AppCommand::AdvanceStage);
    r.run_for(3_000);

    r.hw.output_c = 5000.0;
    r.run_for(20_000);
    assert_eq!(r.app.build_telemetry().output_c, None);
    assert!(!r.app.context().offtake.paused);
}

#[test]
fn tail_threshold_holds_offtake_until_operator_advances() {
    let mut r = rig();
    run_to_head(&mut r);
    r.command(AppCommand::AdvanceStage);
    r.run_for(3_000);

    r.hw.boiler_c = 92.0;
    r.run_for(25_000);
    assert!(r.app.context().offtake.tail_hold);
    assert_eq!(r.app.context().offtake.valve_open_time_ms, 0);
    assert!(!r.hw.valve);
    assert!(r.alerts.heard.contains(&AlertKind::EndTone));
    assert_eq!(r.app.status(), Status::Body);

    // Any key silences the latched tone; this one also enters TAIL.
    r.command(AppCommand::AdvanceStage);
    assert_eq!(r.app.status(), Status::Tail);
    assert_eq!(r.alerts.silenced, 1);
    r.run_for(3_000);
    assert!(!r.app.context().offtake.tail_hold);
    assert!(r.app.context().offtake.valve_open_time_ms > 0);
    assert_eq!(r.hw.heaters(), (true, false), "tail keeps heater state");

    r.hw.boiler_c = 97.0;
    r.run_for(8_000);
    assert_eq!(r.app.status(), Status::End);
    assert_eq!(r.hw.heaters(), (false, false));
    assert!(!r.hw.valve);
}

#[test]
fn retreat_from_body_clears_offtake() {
    let mut r = rig();
    run_to_head(&mut r);
    r.command(AppCommand::AdvanceStage);
    r.run_for(3_000);
    assert!(r.app.context().offtake.real_speed > 0);

    r.command(AppCommand::RetreatStage);
    assert_eq!(r.app.status(), Status::Head);
    assert_eq!(r.app.context().offtake.real_speed, 0);
}

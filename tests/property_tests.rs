//! Property tests for the controller's output invariants.
//!
//! Runs on host (x86_64) only; proptest is not available for ESP32 targets.
//! On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use proptest::prelude::*;
use stillctl::app::commands::{AppCommand, Setpoint, Step};
use stillctl::app::events::AppEvent;
use stillctl::app::ports::{ActuatorPort, AlertKind, AlertSink, EventSink, SensorPort};
use stillctl::app::service::AppService;
use stillctl::config::{LoadedConfig, ProcessConfig};
use stillctl::control::debounce::Debounce;
use stillctl::control::valve::{CYCLE_MS, open_time_for_speed};
use stillctl::error::{ActuatorError, SensorError};
use stillctl::fsm::{Mode, StageEvent, Status, navigate};
use stillctl::sensors::temperature::SensorRole;

// ── Minimal still ─────────────────────────────────────────────

#[derive(Default)]
struct Still {
    temps: [f32; 3],
    pulses: u32,
    heaters: (bool, bool),
    valve: bool,
}

impl SensorPort for Still {
    fn request_conversion(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn read_celsius(&mut self, role: SensorRole) -> Result<f32, SensorError> {
        Ok(self.temps[role as usize])
    }

    fn drain_flow_pulses(&mut self) -> u32 {
        self.pulses
    }
}

impl ActuatorPort for Still {
    fn set_heater_one(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.heaters.0 = on;
        Ok(())
    }

    fn set_heater_two(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.heaters.1 = on;
        Ok(())
    }

    fn set_valve(&mut self, open: bool) -> Result<(), ActuatorError> {
        self.valve = open;
        Ok(())
    }

    fn set_cooler(&mut self, _on: bool) -> Result<(), ActuatorError> {
        Ok(())
    }

    fn set_pump_duty(&mut self, _duty: u16) -> Result<(), ActuatorError> {
        Ok(())
    }
}

struct Quiet;

impl EventSink for Quiet {
    fn emit(&mut self, _event: &AppEvent) {}
}

impl AlertSink for Quiet {
    fn alert(&mut self, _kind: AlertKind) {}
    fn silence(&mut self) {}
}

// ── Strategies ────────────────────────────────────────────────

fn command() -> impl Strategy<Value = AppCommand> {
    prop_oneof![
        3 => Just(AppCommand::AdvanceStage),
        2 => Just(AppCommand::RetreatStage),
        1 => Just(AppCommand::NextMode),
        1 => Just(AppCommand::ToggleManualPump),
        1 => Just(AppCommand::SilenceAlert),
        1 => any::<bool>().prop_map(|up| AppCommand::Adjust {
            setpoint: Setpoint::BodySpeed,
            up,
            step: Step::Coarse,
        }),
        1 => any::<bool>().prop_map(|up| AppCommand::Adjust {
            setpoint: Setpoint::StabilizationRemaining,
            up,
            step: Step::Fine,
        }),
    ]
}

#[derive(Debug, Clone)]
enum Input {
    Command(AppCommand),
    Temps([f32; 3]),
    Wait(u64),
}

fn input() -> impl Strategy<Value = Input> {
    prop_oneof![
        command().prop_map(Input::Command),
        prop::array::uniform3(-20.0f32..120.0).prop_map(Input::Temps),
        (50u64..20_000).prop_map(Input::Wait),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Whatever the operator and the probes do, the valve is closed outside
    /// the offtake stages and the heaters are off in stopped statuses.
    #[test]
    fn outputs_respect_status(inputs in prop::collection::vec(input(), 1..60)) {
        let config = ProcessConfig {
            ext_settle_minutes: 0,
            rect_settle_minutes: 0,
            ..Default::default()
        };
        let mut app = AppService::new(LoadedConfig { config, needs_save: false });
        let mut still = Still { temps: [25.0, 20.0, 20.0], pulses: 1, ..Default::default() };
        let mut now = 0u64;
        app.start(now, &mut Quiet);

        for step in inputs {
            match step {
                Input::Command(cmd) => app.handle_command(cmd, now, &mut Quiet, &mut Quiet),
                Input::Temps(t) => still.temps = t,
                Input::Wait(ms) => {
                    let end = now + ms;
                    while now < end {
                        app.poll(now, &mut still, &mut Quiet, &mut Quiet);
                        let status = app.status();
                        if !status.is_offtake() {
                            prop_assert!(!still.valve, "valve open in {:?}", status);
                        }
                        if matches!(status, Status::Off | Status::End) || status.is_error() {
                            prop_assert_eq!(still.heaters, (false, false));
                        }
                        now += 50;
                    }
                }
            }
        }
    }

    /// Open time never exceeds the cycle and shrinks as speed drops.
    #[test]
    fn open_time_is_monotonic_and_bounded(a in 1u16..=u16::MAX, b in 1u16..=u16::MAX) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(open_time_for_speed(lo) <= open_time_for_speed(hi));
        prop_assert!(open_time_for_speed(hi) <= CYCLE_MS);
    }

    /// A debounce trips exactly when the condition has held for
    /// `threshold + 1` consecutive evaluations.
    #[test]
    fn debounce_trips_on_consecutive_run(
        threshold in 0u16..40,
        pattern in prop::collection::vec(any::<bool>(), 0..200),
    ) {
        let mut d = Debounce::new(threshold);
        let mut run = 0u32;
        for cond in pattern {
            run = if cond { run + 1 } else { 0 };
            prop_assert_eq!(d.update(cond), run > u32::from(threshold));
        }
    }

    /// Operator navigation alone never leaves the active mode's chain.
    #[test]
    fn navigation_stays_on_the_mode_chain(
        rectification in any::<bool>(),
        events in prop::collection::vec(any::<bool>(), 0..64),
    ) {
        let (mode, chain): (Mode, &[Status]) = if rectification {
            (Mode::Rectification, &[
                Status::Off, Status::Overclock, Status::Stabilization,
                Status::Head, Status::Body, Status::Tail,
            ])
        } else {
            (Mode::Extraction, &[
                Status::Off, Status::Overclock, Status::Stabilization,
                Status::Process, Status::Manual,
            ])
        };
        let mut status = Status::Off;
        for advance in events {
            let event = if advance { StageEvent::Advance } else { StageEvent::Retreat };
            let (next, _) = navigate(status, event, mode);
            prop_assert!(chain.contains(&next), "{:?} -> {:?}", status, next);
            let (back, _) = navigate(next, if advance { StageEvent::Retreat } else { StageEvent::Advance }, mode);
            prop_assert_eq!(back, status, "steps are reversible");
            status = next;
        }
    }
}

//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the FSM, the safety supervisor, the flow controller,
//! the temperature sampler, the valve modulator and the shared context.
//! It exposes a hardware-agnostic API; all I/O flows through port traits
//! injected at call sites, so the whole controller runs against mocks.
//!
//! ```text
//!   SensorPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                  │          AppService          │
//! ActuatorPort ◀── │ Temps · Safety · FSM · Flow  │ ──▶ AlertSink
//!                  │        · Valve · Save        │
//!                  └──────────────────────────────┘
//! ```
//!
//! [`poll`](AppService::poll) is meant to be called as often as the main
//! loop can spin.  Every sub-task gates itself on its own cadence.

use log::{info, warn};

use crate::config::{LoadedConfig, ProcessConfig, validate_config};
use crate::control::flow::{DUTY_MAX, FlowController};
use crate::control::valve::{ValveModulator, open_time_for_speed};
use crate::fsm::context::ProcessContext;
use crate::fsm::states::build_status_table;
use crate::fsm::{Fsm, Mode, StageEvent, Status};
use crate::safety::SafetySupervisor;
use crate::scheduler::{Cadence, Deadline};
use crate::sensors::temperature::TemperatureAcquisition;

use super::commands::{AppCommand, Setpoint, Step};
use super::events::{AppEvent, TelemetryData, format_run_time, probe_value};
use super::ports::{ActuatorPort, AlertKind, AlertSink, ConfigPort, EventSink, SensorPort};

/// Control tick period.
pub const CONTROL_INTERVAL_MS: u64 = 1000;
/// Quiet time after the last setpoint edit before the config is written.
pub const SAVE_DEBOUNCE_MS: u64 = 10_000;
/// Slack added when the operator sets the stabilization remaining time.
const STABILIZATION_SET_SLACK_MS: u64 = 2000;

/// Last state successfully written to each actuator.
/// `None` until the first write so boot always drives every output.
#[derive(Debug, Clone, Copy, Default)]
struct AppliedOutputs {
    heater_one: Option<bool>,
    heater_two: Option<bool>,
    valve: Option<bool>,
    cooler: Option<bool>,
    pump_duty: Option<u16>,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService {
    fsm: Fsm,
    ctx: ProcessContext,
    safety: SafetySupervisor,
    flow: FlowController,
    temperatures: TemperatureAcquisition,
    valve: ValveModulator,
    control: Cadence,
    applied: AppliedOutputs,
    tick_count: u64,
    alert_latched: bool,
    config_dirty: bool,
    save: Deadline,
}

impl AppService {
    /// Construct the service.  Defaults substituted at load are scheduled
    /// for a write [`SAVE_DEBOUNCE_MS`] after boot.
    ///
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(loaded: LoadedConfig) -> Self {
        let mut save = Deadline::new();
        if loaded.needs_save {
            save.arm(0, SAVE_DEBOUNCE_MS);
        }
        Self {
            fsm: Fsm::new(build_status_table(), Status::Off),
            ctx: ProcessContext::new(loaded.config),
            safety: SafetySupervisor::new(),
            flow: FlowController::new(),
            temperatures: TemperatureAcquisition::new(),
            valve: ValveModulator::new(),
            control: Cadence::new(CONTROL_INTERVAL_MS),
            applied: AppliedOutputs::default(),
            tick_count: 0,
            alert_latched: false,
            config_dirty: loaded.needs_save,
            save,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        self.ctx.now_ms = now_ms;
        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started {
            status: self.fsm.current_status(),
            mode: self.ctx.mode,
        });
        info!("AppService started in {}", self.fsm.current_status().label());
    }

    // ── Per-pass orchestration ────────────────────────────────

    /// One main-loop pass.  Returns `true` when a control tick ran.
    ///
    /// `hw` satisfies **both** [`SensorPort`] and [`ActuatorPort`], which
    /// avoids a double mutable borrow while keeping the boundary explicit.
    pub fn poll(
        &mut self,
        now_ms: u64,
        hw: &mut (impl SensorPort + ActuatorPort),
        alerts: &mut impl AlertSink,
        sink: &mut impl EventSink,
    ) -> bool {
        self.ctx.now_ms = now_ms;

        // 1. Sensors
        self.flow.ingest_pulses(hw.drain_flow_pulses());
        if self.temperatures.poll(hw, now_ms) {
            self.ctx.readings = self.temperatures.readings();
        }

        // 2. Flow loop (own 1 s / 8 s cadences)
        let cfg = &self.ctx.config;
        self.flow
            .poll(now_ms, cfg.pump_target_speed_lph, cfg.pump_coefficient);

        // 3. Process control tick
        let ticked = self.control.due(now_ms);
        if ticked {
            self.control_tick(sink);
        }

        // 4. Outputs
        if self.flow.is_asleep() != self.ctx.intents.pump_sleep {
            self.flow.set_sleep(self.ctx.intents.pump_sleep);
        }
        self.valve.poll(self.ctx.offtake.valve_open_time_ms, now_ms);
        self.apply_actuators(hw);
        self.flush_alerts(alerts);

        if ticked {
            sink.emit(&AppEvent::Telemetry(self.build_telemetry()));
        }
        ticked
    }

    fn control_tick(&mut self, sink: &mut impl EventSink) {
        self.tick_count += 1;
        let prev = self.fsm.current_status();
        self.ctx.measured_flow_lph = self.flow.measured_speed(self.ctx.config.pump_coefficient);

        // Reference over-temperature, every mode and status.
        let fault = self
            .safety
            .evaluate(self.ctx.readings.reference_c, self.ctx.config.reference_max_c);
        if let Some(fault) = fault {
            if self.fsm.current_status() != Status::ErrorReference {
                warn!("Safety fault: {}", fault);
                self.fsm.force_transition(Status::ErrorReference, &mut self.ctx);
                self.ctx.alert(AlertKind::ErrorTone);
                sink.emit(&AppEvent::Fault(fault));
            }
        }

        self.fsm.tick(&mut self.ctx);

        let now = self.fsm.current_status();
        if now != prev {
            sink.emit(&AppEvent::StatusChanged { from: prev, to: now });
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an operator command.  Output changes land on the next
    /// [`poll`](Self::poll).
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        now_ms: u64,
        alerts: &mut impl AlertSink,
        sink: &mut impl EventSink,
    ) {
        self.ctx.now_ms = now_ms;
        // Any key press quiets a latched tone.
        if self.alert_latched {
            alerts.silence();
            self.alert_latched = false;
        }

        match cmd {
            AppCommand::AdvanceStage => self.navigate(StageEvent::Advance, sink),
            AppCommand::RetreatStage => self.navigate(StageEvent::Retreat, sink),
            AppCommand::NextMode | AppCommand::PreviousMode => {
                self.ctx.mode = self.ctx.mode.toggled();
                info!("Mode -> {}", self.ctx.mode.label());
                sink.emit(&AppEvent::ModeChanged(self.ctx.mode));
            }
            AppCommand::Adjust { setpoint, up, step } => {
                self.adjust(setpoint, up, step);
                if setpoint.is_persisted() {
                    self.mark_config_dirty(now_ms);
                }
            }
            AppCommand::ToggleManualPump => {
                self.flow.toggle_manual();
            }
            AppCommand::AdjustManualDuty { up, step } => {
                let delta = step.int_delta() as i16;
                self.flow.adjust_manual_duty(if up { delta } else { -delta });
            }
            AppCommand::StartCalibration => {
                self.flow.start_calibration();
            }
            AppCommand::StopCalibration => {
                if let Some(coefficient) = self.flow.finish_calibration() {
                    self.ctx.config.pump_coefficient = coefficient;
                    self.mark_config_dirty(now_ms);
                    sink.emit(&AppEvent::FlowCalibrated(coefficient));
                }
            }
            AppCommand::SilenceAlert => {
                alerts.silence();
            }
            AppCommand::UpdateConfig(new_config) => match validate_config(&new_config) {
                Ok(()) => {
                    self.ctx.config = new_config;
                    self.mark_config_dirty(now_ms);
                    info!("Configuration replaced at runtime");
                }
                Err(e) => warn!("Configuration update rejected: {}", e),
            },
            AppCommand::SaveConfig => {
                self.config_dirty = true;
                self.save.arm_now();
                info!("Explicit config save requested");
            }
        }
    }

    fn navigate(&mut self, event: StageEvent, sink: &mut impl EventSink) {
        let from = self.fsm.current_status();
        let to = self.fsm.navigate(event, &mut self.ctx);
        sink.emit(&AppEvent::StatusChanged { from, to });
    }

    fn adjust(&mut self, setpoint: Setpoint, up: bool, step: Step) {
        let f = if up { step.float_delta() } else { -step.float_delta() };
        let i = if up { step.int_delta() } else { -step.int_delta() };
        let status = self.fsm.current_status();
        let in_tail = status == Status::Tail;
        let mode = self.ctx.mode;
        let cfg = &mut self.ctx.config;

        match setpoint {
            Setpoint::FlowTarget => {
                cfg.pump_target_speed_lph = (cfg.pump_target_speed_lph + f).max(0.0);
            }
            Setpoint::BoilerTarget => match (mode, in_tail) {
                (Mode::Extraction, _) => cfg.ext_boiler_target_c += f,
                (Mode::Rectification, true) => cfg.rect_cube_end_c += f,
                (Mode::Rectification, false) => cfg.rect_cube_tail_c += f,
            },
            Setpoint::OutputTarget => match mode {
                Mode::Extraction => cfg.ext_output_target_c += f,
                Mode::Rectification => cfg.rect_output_target_c += f,
            },
            Setpoint::ReferenceMax => cfg.reference_max_c += f,
            Setpoint::Delta => match (mode, in_tail) {
                (Mode::Extraction, _) => cfg.ext_boiler_delta_c += f,
                (Mode::Rectification, true) => cfg.rect_tail_delta_c += f,
                (Mode::Rectification, false) => cfg.rect_body_delta_c += f,
            },
            Setpoint::HeadSpeed => cfg.rect_head_speed = step_u16(cfg.rect_head_speed, i),
            Setpoint::BodySpeed => {
                cfg.rect_body_speed = step_u16(cfg.rect_body_speed, i);
                let off = &mut self.ctx.offtake;
                if matches!(status, Status::Body | Status::Tail) && !off.paused && !off.tail_hold {
                    off.valve_open_time_ms = open_time_for_speed(cfg.rect_body_speed);
                }
            }
            Setpoint::SpeedReduction => {
                let pct = (i32::from(cfg.rect_speed_reduction_pct) + i).clamp(0, 100);
                cfg.rect_speed_reduction_pct = pct as u8;
            }
            Setpoint::HeaterWatts => match mode {
                Mode::Extraction => cfg.ext_heater_watts = step_u16(cfg.ext_heater_watts, i),
                Mode::Rectification => cfg.rect_heater_watts = step_u16(cfg.rect_heater_watts, i),
            },
            Setpoint::StabilizationRemaining => {
                let minutes = (self.ctx.stabilization_remaining_min() as i64 + i64::from(i)).max(0);
                self.ctx.stabilization.arm(
                    self.ctx.now_ms,
                    minutes as u64 * 60_000 + STABILIZATION_SET_SLACK_MS,
                );
            }
            Setpoint::RealOfftakeSpeed => {
                self.ctx.offtake.real_speed = step_u16(self.ctx.offtake.real_speed, i);
            }
            Setpoint::StartBodyTemp => self.ctx.offtake.start_body_temp_c += f,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn build_telemetry(&self) -> TelemetryData {
        let status = self.fsm.current_status();
        let stopped = matches!(status, Status::Off | Status::End) || status.is_error();
        let cfg = &self.ctx.config;
        let r = &self.ctx.readings;
        TelemetryData {
            status: status.label(),
            mode: self.ctx.mode.label(),
            run_time: format_run_time(self.ctx.run_time_ms(stopped)),
            stabilization_remaining_min: self.ctx.stabilization_remaining_min(),
            flow_target_lph: cfg.pump_target_speed_lph,
            flow_measured_lph: self.flow.measured_speed(cfg.pump_coefficient),
            liters: self.flow.liters(cfg.pump_coefficient),
            pump_duty: self.flow.duty(),
            pump_coefficient: cfg.pump_coefficient,
            reference_c: probe_value(r.reference_c),
            boiler_c: probe_value(r.boiler_c),
            output_c: probe_value(r.output_c),
            valve_open_time_ms: self.ctx.offtake.valve_open_time_ms,
            real_offtake_speed: self.ctx.offtake.real_speed,
            start_body_temp_c: self.ctx.offtake.start_body_temp_c,
            heater_watts: cfg.heater_watts(self.ctx.mode),
            manual: self.flow.is_manual(),
            calibrating: self.flow.is_calibrating(),
            flooded: self.flow.is_flooded(),
            pump_asleep: self.flow.is_asleep(),
            valve_open: self.valve.is_open(),
        }
    }

    pub fn status(&self) -> Status {
        self.fsm.current_status()
    }

    pub fn mode(&self) -> Mode {
        self.ctx.mode
    }

    /// Control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.ctx.config
    }

    pub fn context(&self) -> &ProcessContext {
        &self.ctx
    }

    pub fn flow(&self) -> &FlowController {
        &self.flow
    }

    pub fn is_valve_open(&self) -> bool {
        self.valve.is_open()
    }

    // ── Internal ──────────────────────────────────────────────

    /// Push intents to the hardware.  Each output is written only when it
    /// differs from the last successful write; a failed write is retried
    /// on the next pass.
    fn apply_actuators(&mut self, hw: &mut impl ActuatorPort) {
        let want = self.ctx.intents;
        let a = &mut self.applied;

        sync(&mut a.heater_one, want.heater_one, |v| hw.set_heater_one(v), "heater 1");
        sync(&mut a.heater_two, want.heater_two, |v| hw.set_heater_two(v), "heater 2");
        sync(&mut a.cooler, want.cooler, |v| hw.set_cooler(v), "cooler");
        sync(&mut a.valve, self.valve.is_open(), |v| hw.set_valve(v), "valve");
        sync(
            &mut a.pump_duty,
            self.flow.duty().min(DUTY_MAX),
            |v| hw.set_pump_duty(v),
            "pump",
        );
    }

    fn flush_alerts(&mut self, alerts: &mut impl AlertSink) {
        for kind in self.ctx.alerts.iter().copied() {
            if kind.is_latched() {
                self.alert_latched = true;
            }
            alerts.alert(kind);
        }
        self.ctx.alerts.clear();
    }

    // ── Config persistence ────────────────────────────────────

    /// Mark the config as modified and (re)arm the debounced save.
    pub fn mark_config_dirty(&mut self, now_ms: u64) {
        self.config_dirty = true;
        self.save.arm(now_ms, SAVE_DEBOUNCE_MS);
    }

    /// Write the config once it has been quiet for [`SAVE_DEBOUNCE_MS`].
    /// Returns `true` if the config was saved.
    pub fn auto_save_if_needed(&mut self, now_ms: u64, storage: &impl ConfigPort) -> bool {
        if !self.config_dirty || !self.save.expired(now_ms) {
            return false;
        }
        match storage.save(&self.ctx.config) {
            Ok(()) => {
                self.config_dirty = false;
                self.save.cancel();
                info!("Config auto-saved");
                true
            }
            Err(e) => {
                warn!("Config auto-save failed: {}", e);
                self.save.arm(now_ms, SAVE_DEBOUNCE_MS);
                false
            }
        }
    }

    /// Save immediately if dirty (call before a controlled restart).
    pub fn force_save_if_dirty(&mut self, storage: &impl ConfigPort) {
        if !self.config_dirty {
            return;
        }
        match storage.save(&self.ctx.config) {
            Ok(()) => {
                self.config_dirty = false;
                self.save.cancel();
                info!("Config force-saved");
            }
            Err(e) => warn!("Config force-save failed: {}", e),
        }
    }

    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }
}

fn step_u16(value: u16, delta: i32) -> u16 {
    (i32::from(value) + delta).clamp(0, i32::from(u16::MAX)) as u16
}

fn sync<T: Copy + PartialEq, E: core::fmt::Display>(
    applied: &mut Option<T>,
    want: T,
    write: impl FnOnce(T) -> Result<(), E>,
    what: &str,
) {
    if *applied == Some(want) {
        return;
    }
    match write(want) {
        Ok(()) => *applied = Some(want),
        Err(e) => warn!("{} write failed: {}", what, e),
    }
}

//! Mock still for integration tests.
//!
//! Probes return whatever the test sets, the flow sensor yields a fixed
//! number of pulses per drain, and every actuator write is recorded so
//! tests can assert on output history.

use stillctl::app::events::AppEvent;
use stillctl::app::ports::{
    ActuatorPort, AlertKind, AlertSink, ConfigError, ConfigPort, EventSink, SensorPort,
};
use stillctl::app::service::AppService;
use stillctl::config::ProcessConfig;
use stillctl::error::{ActuatorError, SensorError};
use stillctl::sensors::temperature::SensorRole;
use std::cell::{Cell, RefCell};

/// Loop pass period used by [`run_for`].
pub const PASS_MS: u64 = 50;

// ── Actuator record ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActuatorCall {
    HeaterOne(bool),
    HeaterTwo(bool),
    Valve(bool),
    Cooler(bool),
    PumpDuty(u16),
}

// ── MockStill ─────────────────────────────────────────────────

pub struct MockStill {
    pub reference_c: f32,
    pub boiler_c: f32,
    pub output_c: f32,
    pub pulses_per_drain: u32,
    pub fail_valve_writes: bool,
    pub calls: Vec<(u64, ActuatorCall)>,
    pub now_ms: u64,

    pub heater_one: bool,
    pub heater_two: bool,
    pub valve: bool,
    pub cooler: bool,
    pub pump_duty: u16,
}

#[allow(dead_code)]
impl MockStill {
    pub fn new() -> Self {
        Self {
            reference_c: 25.0,
            boiler_c: 20.0,
            output_c: 20.0,
            pulses_per_drain: 0,
            fail_valve_writes: false,
            calls: Vec::new(),
            now_ms: 0,
            heater_one: false,
            heater_two: false,
            valve: false,
            cooler: false,
            pump_duty: 0,
        }
    }

    fn record(&mut self, call: ActuatorCall) {
        self.calls.push((self.now_ms, call));
    }

    /// Times at which the valve was driven to `open`.
    pub fn valve_edges(&self, open: bool) -> Vec<u64> {
        self.calls
            .iter()
            .filter_map(|(t, c)| (*c == ActuatorCall::Valve(open)).then_some(*t))
            .collect()
    }

    pub fn heaters(&self) -> (bool, bool) {
        (self.heater_one, self.heater_two)
    }
}

impl SensorPort for MockStill {
    fn request_conversion(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn read_celsius(&mut self, role: SensorRole) -> Result<f32, SensorError> {
        Ok(match role {
            SensorRole::Reference => self.reference_c,
            SensorRole::Boiler => self.boiler_c,
            SensorRole::Output => self.output_c,
        })
    }

    fn drain_flow_pulses(&mut self) -> u32 {
        self.pulses_per_drain
    }
}

impl ActuatorPort for MockStill {
    fn set_heater_one(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::HeaterOne(on));
        self.heater_one = on;
        Ok(())
    }

    fn set_heater_two(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::HeaterTwo(on));
        self.heater_two = on;
        Ok(())
    }

    fn set_valve(&mut self, open: bool) -> Result<(), ActuatorError> {
        if self.fail_valve_writes {
            return Err(ActuatorError::GpioWriteFailed);
        }
        self.record(ActuatorCall::Valve(open));
        self.valve = open;
        Ok(())
    }

    fn set_cooler(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::Cooler(on));
        self.cooler = on;
        Ok(())
    }

    fn set_pump_duty(&mut self, duty: u16) -> Result<(), ActuatorError> {
        self.record(ActuatorCall::PumpDuty(duty));
        self.pump_duty = duty;
        Ok(())
    }
}

// ── Sinks ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::Fault(_)))
            .count()
    }

    pub fn last_telemetry(&self) -> Option<&stillctl::app::events::TelemetryData> {
        self.events.iter().rev().find_map(|e| match e {
            AppEvent::Telemetry(t) => Some(t),
            _ => None,
        })
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

#[derive(Default)]
pub struct RecordingAlerts {
    pub heard: Vec<AlertKind>,
    pub silenced: usize,
}

impl AlertSink for RecordingAlerts {
    fn alert(&mut self, kind: AlertKind) {
        self.heard.push(kind);
    }

    fn silence(&mut self) {
        self.silenced += 1;
    }
}

// ── Config store ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockNvs {
    pub stored: RefCell<Option<ProcessConfig>>,
    pub saves: Cell<u32>,
}

#[allow(dead_code)]
impl MockNvs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(config: ProcessConfig) -> Self {
        let nvs = Self::default();
        *nvs.stored.borrow_mut() = Some(config);
        nvs
    }
}

impl ConfigPort for MockNvs {
    fn load(&self) -> Result<ProcessConfig, ConfigError> {
        self.stored.borrow().clone().ok_or(ConfigError::NotFound)
    }

    fn save(&self, config: &ProcessConfig) -> Result<(), ConfigError> {
        *self.stored.borrow_mut() = Some(config.clone());
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

// ── Harness ───────────────────────────────────────────────────

pub struct Rig {
    pub app: AppService,
    pub hw: MockStill,
    pub alerts: RecordingAlerts,
    pub sink: RecordingSink,
    pub now_ms: u64,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(config: ProcessConfig) -> Self {
        let mut sink = RecordingSink::new();
        let mut app = AppService::new(stillctl::config::LoadedConfig {
            config,
            needs_save: false,
        });
        app.start(0, &mut sink);
        Self {
            app,
            hw: MockStill::new(),
            alerts: RecordingAlerts::default(),
            sink,
            now_ms: 0,
        }
    }

    /// Drive the loop for `ms` at [`PASS_MS`] per pass.
    pub fn run_for(&mut self, ms: u64) {
        let end = self.now_ms + ms;
        while self.now_ms < end {
            self.pass();
            self.now_ms += PASS_MS;
        }
    }

    pub fn pass(&mut self) {
        self.hw.now_ms = self.now_ms;
        self.app
            .poll(self.now_ms, &mut self.hw, &mut self.alerts, &mut self.sink);
    }

    pub fn command(&mut self, cmd: stillctl::app::commands::AppCommand) {
        self.app
            .handle_command(cmd, self.now_ms, &mut self.alerts, &mut self.sink);
    }
}

//! Shared mutable context threaded through every status handler.
//!
//! `ProcessContext` is the blackboard the handlers read from and write to:
//! the latest readings, the live configuration, run timers, the offtake
//! working state, every debounce counter, and the actuator intents the
//! service applies after each tick.

use heapless::Vec;
use log::warn;

use crate::app::ports::AlertKind;
use crate::config::ProcessConfig;
use crate::control::debounce::Debounce;
use crate::scheduler::Deadline;
use crate::sensors::temperature::TemperatureReadings;

use super::Mode;

/// Pending alert requests, drained by the service after each tick.
pub const MAX_PENDING_ALERTS: usize = 4;

// ---------------------------------------------------------------------------
// Actuator intents (written by handlers; applied by the service)
// ---------------------------------------------------------------------------

/// Desired actuator state.  The valve is driven separately through
/// [`OfftakeState::valve_open_time_ms`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorIntents {
    pub heater_one: bool,
    pub heater_two: bool,
    pub pump_sleep: bool,
    pub cooler: bool,
}

impl Default for ActuatorIntents {
    fn default() -> Self {
        Self::stopped()
    }
}

impl ActuatorIntents {
    /// Heaters off, pump asleep, cooler off.
    pub const fn stopped() -> Self {
        Self {
            heater_one: false,
            heater_two: false,
            pump_sleep: true,
            cooler: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Rectification offtake working state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OfftakeState {
    /// Effective body offtake speed, reduced on every pause.
    pub real_speed: u16,
    /// Output temperature captured when the body run started.
    pub start_body_temp_c: f32,
    /// Offtake paused on an output temperature rise.
    pub paused: bool,
    pub pause_started_ms: u64,
    /// Boiler crossed the tail threshold; handler idles until the operator
    /// steps into the tail stage.
    pub tail_hold: bool,
    /// Open portion of the valve cycle.  0 = closed.
    pub valve_open_time_ms: u16,
}

// ---------------------------------------------------------------------------
// Debounce counters
// ---------------------------------------------------------------------------

/// One counter per debounced stage condition.
#[derive(Debug, Clone, Copy)]
pub struct StageCounters {
    pub overclock_extraction: Debounce,
    pub overclock_rectification: Debounce,
    pub flow_loss: Debounce,
    pub boiler_under: Debounce,
    pub output_over: Debounce,
    pub offtake_pause: Debounce,
    pub offtake_resume: Debounce,
    pub tail_reached: Debounce,
    pub end_reached: Debounce,
}

impl Default for StageCounters {
    fn default() -> Self {
        Self {
            overclock_extraction: Debounce::new(5),
            overclock_rectification: Debounce::new(10),
            flow_loss: Debounce::new(30),
            boiler_under: Debounce::new(30),
            output_over: Debounce::new(30),
            offtake_pause: Debounce::new(5),
            offtake_resume: Debounce::new(5),
            tail_reached: Debounce::new(20),
            end_reached: Debounce::new(5),
        }
    }
}

impl StageCounters {
    /// Forget every partial run.  Called on each status change so a count
    /// accumulated in one stage never trips in the next.
    pub fn reset_stage(&mut self) {
        *self = Self::default();
    }
}

// ---------------------------------------------------------------------------
// ProcessContext
// ---------------------------------------------------------------------------

pub struct ProcessContext {
    // -- Timing --
    /// Monotonic time of the current tick.
    pub now_ms: u64,
    pub ticks_in_status: u64,
    pub start_ms: u64,
    pub stop_ms: u64,
    pub stabilization: Deadline,

    // -- Inputs --
    pub readings: TemperatureReadings,
    /// Coolant flow measured by the pump controller (L/h).
    pub measured_flow_lph: f32,

    // -- Configuration --
    pub config: ProcessConfig,
    pub mode: Mode,

    // -- Working state --
    pub offtake: OfftakeState,
    pub counters: StageCounters,

    // -- Outputs --
    pub intents: ActuatorIntents,
    pub alerts: Vec<AlertKind, MAX_PENDING_ALERTS>,
}

impl ProcessContext {
    pub fn new(config: ProcessConfig) -> Self {
        Self {
            now_ms: 0,
            ticks_in_status: 0,
            start_ms: 0,
            stop_ms: 0,
            stabilization: Deadline::new(),
            readings: TemperatureReadings::default(),
            measured_flow_lph: 0.0,
            config,
            mode: Mode::default(),
            offtake: OfftakeState::default(),
            counters: StageCounters::default(),
            intents: ActuatorIntents::stopped(),
            alerts: Vec::new(),
        }
    }

    /// Queue an alert for the sink.
    pub fn alert(&mut self, kind: AlertKind) {
        if self.alerts.push(kind).is_err() {
            warn!("Alert queue full, dropping {:?}", kind);
        }
    }

    /// Run time in milliseconds: frozen at `stop_ms` once stopped.
    pub fn run_time_ms(&self, stopped: bool) -> u64 {
        let end = if stopped { self.stop_ms } else { self.now_ms };
        end.saturating_sub(self.start_ms)
    }

    /// Whole minutes left on the stabilization timer.
    pub fn stabilization_remaining_min(&self) -> u64 {
        self.stabilization.remaining_ms(self.now_ms) / 60_000
    }
}

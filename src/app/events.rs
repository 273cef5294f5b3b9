//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, refresh the display,
//! forward as JSON.

use core::fmt::Write;

use serde::Serialize;

use crate::error::ProcessFault;
use crate::fsm::{Mode, Status};
use crate::sensors::temperature::SENSOR_FAULT_SENTINEL;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The service has started (initial status and mode).
    Started { status: Status, mode: Mode },

    /// The process status changed.
    StatusChanged { from: Status, to: Status },

    /// The operating mode changed.
    ModeChanged(Mode),

    /// A debounced fault forced a terminal status.
    Fault(ProcessFault),

    /// A calibration run produced a new pulse coefficient.
    FlowCalibrated(f32),

    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),
}

/// A point-in-time telemetry snapshot for the display and the log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryData {
    pub status: &'static str,
    pub mode: &'static str,
    /// `HH:MM` since the run started.
    pub run_time: heapless::String<8>,
    pub stabilization_remaining_min: u64,

    pub flow_target_lph: f32,
    pub flow_measured_lph: f32,
    pub liters: f32,
    pub pump_duty: u16,
    pub pump_coefficient: f32,

    /// `None` while the probe is faulted.
    pub reference_c: Option<f32>,
    pub boiler_c: Option<f32>,
    pub output_c: Option<f32>,

    pub valve_open_time_ms: u16,
    pub real_offtake_speed: u16,
    pub start_body_temp_c: f32,
    pub heater_watts: u16,

    pub manual: bool,
    pub calibrating: bool,
    pub flooded: bool,
    pub pump_asleep: bool,
    pub valve_open: bool,
}

/// Hide the fault sentinel from consumers.
pub fn probe_value(c: f32) -> Option<f32> {
    (c != SENSOR_FAULT_SENTINEL).then_some(c)
}

/// Format milliseconds as `HH:MM`.
pub fn format_run_time(ms: u64) -> heapless::String<8> {
    let minutes = ms / 60_000;
    let mut s = heapless::String::new();
    if write!(s, "{:02}:{:02}", minutes / 60, minutes % 60).is_err() {
        s.clear();
    }
    s
}

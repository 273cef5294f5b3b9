//! Coolant pump flow-rate controller.
//!
//! Replaces a PID loop with a tiered step controller: the peristaltic pump
//! responds slowly and non-linearly, so small errors get single duty quanta
//! and only large errors get a bounded multiplicative correction.
//!
//! ```text
//!   |e| < 0.175         hold
//!   |e| < 0.35          ±1
//!   |e| < 1.05          ±2
//!   |e| < 2.45          ±3
//!   otherwise           duty /= clamp(measured / target, 0.96, 1.04)
//! ```
//!
//! Measured speed is the mean of the last [`HISTORY_LEN`] one-second pulse
//! counts, converted to L/h through the calibrated pulses-per-mL
//! coefficient.

use heapless::HistoryBuffer;
use log::{debug, info, warn};

use crate::scheduler::Cadence;

/// Actuator ceiling (10-bit PWM).
pub const DUTY_MAX: u16 = 1023;
/// Duty applied when the pump wakes with nothing to resume from.
pub const DUTY_BOOT: u16 = 512;
/// Duty applied once after a flood (no-flow) episode clears.
pub const DUTY_RECOVERY: u16 = 450;
/// Fixed reference duty while calibrating.
pub const DUTY_CALIBRATION: u16 = 450;

/// Number of one-second pulse windows averaged into the measured speed.
pub const HISTORY_LEN: usize = 10;
pub const WINDOW_MS: u64 = 1000;
pub const CORRECTION_INTERVAL_MS: u64 = 8000;

/// Below this measured speed the line is considered dry / airlocked.
pub const FLOOR_LPH: f32 = 0.5;
/// Dead-band unit for the tiered response.
pub const ACCURACY_LPH: f32 = 0.35;
/// Pulses expected for the calibration volume at coefficient 1.0.
pub const CALIBRATION_REFERENCE_PULSES: u32 = 200;

const RATIO_MIN: f32 = 0.96;
const RATIO_MAX: f32 = 1.04;

/// What a correction cycle did, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    /// No measurable flow: duty forced to maximum.
    Flooded,
    /// First cycle with flow after a flood: duty reset to the recovery value.
    Recovered,
    /// Inside the dead band.
    Hold,
    /// Fixed step applied (positive = more duty).
    Step(i16),
    /// Multiplicative correction by the clamped ratio.
    Scaled(f32),
}

/// Flow-rate controller state.
pub struct FlowController {
    history: HistoryBuffer<u32, HISTORY_LEN>,
    window_pulses: u32,
    total_pulses: u64,
    /// `Some(count)` while a calibration run is active.
    calibration_pulses: Option<u32>,
    duty: u16,
    sleep: bool,
    manual: bool,
    flooded: bool,
    window: Cadence,
    correction: Cadence,
}

impl Default for FlowController {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowController {
    pub fn new() -> Self {
        Self {
            history: HistoryBuffer::new(),
            window_pulses: 0,
            total_pulses: 0,
            calibration_pulses: None,
            duty: 0,
            sleep: true,
            manual: false,
            flooded: false,
            window: Cadence::new(WINDOW_MS),
            correction: Cadence::new(CORRECTION_INTERVAL_MS),
        }
    }

    // ── Pulse intake ──────────────────────────────────────────

    /// Account pulses drained from the ISR counter.
    pub fn ingest_pulses(&mut self, pulses: u32) {
        self.total_pulses += u64::from(pulses);
        match self.calibration_pulses.as_mut() {
            Some(count) => *count = count.saturating_add(pulses),
            None => self.window_pulses = self.window_pulses.saturating_add(pulses),
        }
    }

    /// Close the current one-second window into the history ring.
    /// Frozen while calibrating.
    pub fn record_window(&mut self) {
        if self.calibration_pulses.is_some() {
            return;
        }
        self.history.write(self.window_pulses);
        self.window_pulses = 0;
    }

    /// Mean pulses-per-second over the history, in L/h.
    pub fn measured_speed(&self, coefficient: f32) -> f32 {
        let sum: u32 = self.history.as_slice().iter().sum();
        let per_sec = sum as f32 / HISTORY_LEN as f32;
        if per_sec == 0.0 || coefficient <= 0.0 {
            return 0.0;
        }
        per_sec / coefficient * 3.6
    }

    /// Volume delivered since power-up (L, one decimal).
    pub fn liters(&self, coefficient: f32) -> f32 {
        if coefficient <= 0.0 {
            return 0.0;
        }
        let l = self.total_pulses as f32 / coefficient / 1000.0;
        (l * 10.0 + 0.5).floor() / 10.0
    }

    // ── Control ───────────────────────────────────────────────

    /// One loop pass: roll the pulse window and, on the correction cadence,
    /// run the control law.  Returns the correction applied, if any.
    pub fn poll(&mut self, now_ms: u64, target_lph: f32, coefficient: f32) -> Option<Correction> {
        if self.window.due(now_ms) {
            self.record_window();
        }
        if self.sleep {
            return None;
        }
        if !self.correction.due(now_ms) {
            return None;
        }
        if self.manual || self.is_calibrating() {
            return None;
        }
        let c = self.correct(target_lph, coefficient);
        debug!(
            "flow: measured={:.2} target={:.2} duty={} ({:?})",
            self.measured_speed(coefficient),
            target_lph,
            self.duty,
            c
        );
        Some(c)
    }

    /// Apply the control law once against the current history.
    pub fn correct(&mut self, target_lph: f32, coefficient: f32) -> Correction {
        let measured = self.measured_speed(coefficient);

        if measured < FLOOR_LPH {
            if !self.flooded {
                warn!("flow: no measurable flow, forcing pump to full duty");
            }
            self.duty = DUTY_MAX;
            self.flooded = true;
            return Correction::Flooded;
        }
        if self.flooded {
            self.duty = DUTY_RECOVERY;
            self.flooded = false;
            info!("flow: restored, duty reset to {}", DUTY_RECOVERY);
            return Correction::Recovered;
        }

        let error = measured - target_lph;
        let magnitude = error.abs();
        let step: i16 = if magnitude < ACCURACY_LPH / 2.0 {
            return Correction::Hold;
        } else if magnitude < ACCURACY_LPH {
            1
        } else if magnitude < ACCURACY_LPH * 3.0 {
            2
        } else if magnitude < ACCURACY_LPH * 7.0 {
            3
        } else {
            let ratio = (measured / target_lph).clamp(RATIO_MIN, RATIO_MAX);
            self.duty = ((f32::from(self.duty) / ratio) as u16).min(DUTY_MAX);
            return Correction::Scaled(ratio);
        };

        // Running fast means too much duty.
        let signed = if error > 0.0 { -step } else { step };
        self.duty = self.duty.saturating_add_signed(signed).min(DUTY_MAX);
        Correction::Step(signed)
    }

    // ── Modes ─────────────────────────────────────────────────

    /// Put the pump to sleep (duty 0) or wake it.  A running calibration
    /// keeps its duty regardless.
    pub fn set_sleep(&mut self, sleep: bool) {
        let waking = self.sleep && !sleep;
        self.sleep = sleep;
        if waking && self.duty == 0 && !self.manual {
            self.duty = DUTY_BOOT;
            info!("flow: pump awake at duty {}", DUTY_BOOT);
        }
        self.enforce_sleep();
    }

    pub fn toggle_manual(&mut self) -> bool {
        self.manual = !self.manual;
        info!("flow: manual override {}", if self.manual { "on" } else { "off" });
        self.manual
    }

    /// Nudge duty by hand.  Ignored unless manual override is on.
    pub fn adjust_manual_duty(&mut self, delta: i16) -> bool {
        if !self.manual {
            return false;
        }
        self.duty = self.duty.saturating_add_signed(delta).min(DUTY_MAX);
        self.enforce_sleep();
        true
    }

    /// Begin a calibration run: reference duty, counter zeroed.
    pub fn start_calibration(&mut self) -> bool {
        if self.is_calibrating() {
            return false;
        }
        self.calibration_pulses = Some(0);
        self.duty = DUTY_CALIBRATION;
        info!("flow: calibration started at duty {}", DUTY_CALIBRATION);
        true
    }

    /// Finish a calibration run and return the new pulses-per-mL coefficient.
    pub fn finish_calibration(&mut self) -> Option<f32> {
        let pulses = self.calibration_pulses.take()?;
        self.duty = 0;
        self.enforce_sleep();
        self.window_pulses = 0;
        // Zero pulses would yield a zero coefficient and divide-by-zero later.
        let pulses = if pulses == 0 {
            CALIBRATION_REFERENCE_PULSES
        } else {
            pulses
        };
        let coefficient = pulses as f32 / CALIBRATION_REFERENCE_PULSES as f32;
        info!("flow: calibration done, {} pulses -> coefficient {:.2}", pulses, coefficient);
        Some(coefficient)
    }

    fn enforce_sleep(&mut self) {
        if self.sleep && !self.is_calibrating() {
            self.duty = 0;
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn duty(&self) -> u16 {
        self.duty
    }

    pub fn is_asleep(&self) -> bool {
        self.sleep
    }

    pub fn is_manual(&self) -> bool {
        self.manual
    }

    pub fn is_flooded(&self) -> bool {
        self.flooded
    }

    pub fn is_calibrating(&self) -> bool {
        self.calibration_pulses.is_some()
    }

    pub fn calibration_pulses(&self) -> u32 {
        self.calibration_pulses.unwrap_or(0)
    }

    pub fn total_pulses(&self) -> u64 {
        self.total_pulses
    }
}

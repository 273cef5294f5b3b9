//! Offtake valve software PWM.
//!
//! The offtake solenoid is too slow (and wears too fast) for real PWM, so
//! it is modulated over a multi-second cycle: open for `open_time_ms`, then
//! closed for the rest of [`CYCLE_MS`].
//!
//! ```text
//!   open_time = CYCLE / (REFERENCE_SPEED / speed) + OPEN_LATENCY   (≤ CYCLE)
//!
//!   |<-- open_time -->|<------- rest of cycle ------->|
//!   ┌─────────────────┐                               ┌──────
//!   │      open       │            closed             │
//! ──┘                 └───────────────────────────────┘
//! ```

use log::trace;

/// Full modulation period.
pub const CYCLE_MS: u16 = 5000;
/// Offtake speed delivered with the valve held fully open.
pub const REFERENCE_SPEED: u16 = 2100;
/// Dead time the solenoid needs before it actually passes liquid.
pub const OPEN_LATENCY_MS: u16 = 60;

/// Map an offtake speed to the open portion of one cycle.
/// Speed 0 means closed; anything at or past the knee clamps to the full cycle.
pub fn open_time_for_speed(speed: u16) -> u16 {
    if speed == 0 {
        return 0;
    }
    let cycle = f32::from(CYCLE_MS);
    let t = cycle / (f32::from(REFERENCE_SPEED) / f32::from(speed)) + f32::from(OPEN_LATENCY_MS);
    t.min(cycle) as u16
}

/// Timing state for the valve output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValveModulator {
    open: bool,
    last_open_ms: Option<u64>,
}

impl ValveModulator {
    pub const fn new() -> Self {
        Self {
            open: false,
            last_open_ms: None,
        }
    }

    /// Evaluate the modulator at `now_ms`.
    ///
    /// Returns `Some(open)` when the output has to change, `None` to hold.
    pub fn poll(&mut self, open_time_ms: u16, now_ms: u64) -> Option<bool> {
        if open_time_ms >= CYCLE_MS {
            return (!self.open).then(|| self.set_open(now_ms));
        }
        if open_time_ms == 0 {
            return self.open.then(|| self.set_closed());
        }

        match self.last_open_ms {
            Some(opened) if self.open => {
                (now_ms > opened + u64::from(open_time_ms)).then(|| self.set_closed())
            }
            Some(opened) => {
                (now_ms > opened + u64::from(CYCLE_MS)).then(|| self.set_open(now_ms))
            }
            None => Some(self.set_open(now_ms)),
        }
    }

    /// Drop the output immediately (pause, stop, fault).
    pub fn close(&mut self) -> bool {
        let was_open = self.open;
        self.open = false;
        was_open
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn set_open(&mut self, now_ms: u64) -> bool {
        trace!("valve: open at {}", now_ms);
        self.open = true;
        self.last_open_ms = Some(now_ms);
        true
    }

    fn set_closed(&mut self) -> bool {
        trace!("valve: close");
        self.open = false;
        false
    }
}

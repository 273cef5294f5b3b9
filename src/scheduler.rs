//! Cooperative cadence gates.
//!
//! The main loop never sleeps.  Every sub-task owns a [`Cadence`] and asks
//! it on each pass whether it is allowed to run; the gate re-arms itself
//! relative to the pass that fired.
//!
//! ```text
//!  loop pass ──▶ pulse window (1 s) ──▶ flow correction (8 s)
//!            ──▶ temperature sample (1 s, two-phase)
//!            ──▶ control tick (1 s) ──▶ valve modulation (every pass)
//!            ──▶ config save (one-shot, 10 s after last edit)
//! ```

/// Periodic gate: fires at most once per `period_ms`.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    period_ms: u64,
    next_due_ms: u64,
}

impl Cadence {
    /// A cadence that is due on the very first poll.
    pub const fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            next_due_ms: 0,
        }
    }

    /// Returns `true` (and re-arms) if the gate is open at `now_ms`.
    pub fn due(&mut self, now_ms: u64) -> bool {
        if now_ms < self.next_due_ms {
            return false;
        }
        self.next_due_ms = now_ms + self.period_ms;
        true
    }

    /// Push the next opening a full period past `now_ms`.
    pub fn defer(&mut self, now_ms: u64) {
        self.next_due_ms = now_ms + self.period_ms;
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }
}

/// One-shot deadline that can be re-armed (debounced actions).
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline {
    at_ms: Option<u64>,
}

impl Deadline {
    pub const fn new() -> Self {
        Self { at_ms: None }
    }

    /// Arm (or re-arm) the deadline `delay_ms` after `now_ms`.
    pub fn arm(&mut self, now_ms: u64, delay_ms: u64) {
        self.at_ms = Some(now_ms + delay_ms);
    }

    /// Arm so the next [`expired`](Self::expired) check fires.
    pub fn arm_now(&mut self) {
        self.at_ms = Some(0);
    }

    pub fn cancel(&mut self) {
        self.at_ms = None;
    }

    pub fn is_armed(&self) -> bool {
        self.at_ms.is_some()
    }

    /// `true` if armed and `now_ms` has reached the deadline.  Does not disarm.
    pub fn expired(&self, now_ms: u64) -> bool {
        self.at_ms.is_some_and(|at| now_ms >= at)
    }

    /// Time left until expiry; zero when disarmed or already expired.
    pub fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.at_ms.map_or(0, |at| at.saturating_sub(now_ms))
    }
}

//! Coolant flow pulse counter.
//!
//! The hall-effect flow sensor in the coolant line produces one pulse per
//! fixed volume.  A GPIO ISR increments the counter on each rising edge;
//! the control loop drains it once per pass.
//!
//! This is the only state shared between interrupt and loop context, so it
//! is a lone `AtomicU32`: single writer (ISR), single reader (loop), no lock.

use core::sync::atomic::{AtomicU32, Ordering};

/// Interrupt-safe pulse accumulator.
#[derive(Debug, Default)]
pub struct PulseCounter {
    pending: AtomicU32,
}

impl PulseCounter {
    pub const fn new() -> Self {
        Self {
            pending: AtomicU32::new(0),
        }
    }

    /// Record one edge.  Lock-free, callable from interrupt context.
    pub fn on_edge(&self) {
        self.pending.fetch_add(1, Ordering::Relaxed);
    }

    /// Take every pulse recorded since the previous drain.
    pub fn drain(&self) -> u32 {
        self.pending.swap(0, Ordering::Relaxed)
    }
}

/// Counter fed by the pump flow-sensor ISR.
/// `static` because ESP-IDF ISR callbacks cannot capture state.
pub static PUMP_PULSES: PulseCounter = PulseCounter::new();

/// GPIO ISR entry point for the flow-sensor line.
pub fn flow_isr_handler() {
    PUMP_PULSES.on_edge();
}

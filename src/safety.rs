//! Safety supervisor.
//!
//! Runs **every control tick before the FSM**, in every mode and status.
//! It watches the vapor-reference probe above the column: vapor reaching it
//! means the column is flooding or the condenser has failed.
//!
//! ## Fault lifecycle
//!
//! 1. The reference reading exceeds its ceiling.
//! 2. After 10 further consecutive ticks the supervisor latches
//!    [`ProcessFault::ReferenceOverTemperature`].
//! 3. The service forces `ERROR_REFERENCE`, whose entry stops every actuator.
//! 4. The latch clears on the first tick under the ceiling, but the FSM
//!    stays in the error status until the operator navigates out.
//!
//! A faulted probe publishes the 999 °C sentinel, which is above any
//! ceiling and therefore also trips this check.

use crate::control::debounce::Debounce;
use crate::error::ProcessFault;
use log::{error, info};

/// Consecutive over-ceiling ticks tolerated before tripping.
pub const REFERENCE_DEBOUNCE_TICKS: u16 = 10;

pub struct SafetySupervisor {
    reference_over: Debounce,
    latched: Option<ProcessFault>,
}

impl Default for SafetySupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl SafetySupervisor {
    pub fn new() -> Self {
        Self {
            reference_over: Debounce::new(REFERENCE_DEBOUNCE_TICKS),
            latched: None,
        }
    }

    /// Evaluate one tick.  Returns the fault while it is tripped.
    pub fn evaluate(&mut self, reference_c: f32, ceiling_c: f32) -> Option<ProcessFault> {
        let tripped = self.reference_over.update(reference_c > ceiling_c);
        match (tripped, self.latched) {
            (true, None) => {
                error!(
                    "SAFETY FAULT SET: {} ({:.1} > {:.1})",
                    ProcessFault::ReferenceOverTemperature,
                    reference_c,
                    ceiling_c
                );
                self.latched = Some(ProcessFault::ReferenceOverTemperature);
            }
            (false, Some(fault)) => {
                info!("SAFETY FAULT CLEARED: {}", fault);
                self.latched = None;
            }
            _ => {}
        }
        self.latched
    }

    pub fn fault(&self) -> Option<ProcessFault> {
        self.latched
    }

    pub fn has_fault(&self) -> bool {
        self.latched.is_some()
    }
}

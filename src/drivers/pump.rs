//! Coolant pump driver (logic-level MOSFET on an LEDC channel).
//!
//! The gate driver inverts, so the duty written to the PWM peripheral is
//! `DUTY_MAX - duty`: a logical 0 parks the output fully high and the pump
//! stays off.
//!
//! ## Dual-target design
//!
//! Generic over [`SetDutyCycle`]: the LEDC driver on ESP-IDF, a recording
//! mock on host.

use embedded_hal::pwm::SetDutyCycle;

use crate::control::flow::DUTY_MAX;
use crate::error::ActuatorError;

pub struct PumpDriver<P> {
    pwm: P,
    duty: u16,
}

impl<P: SetDutyCycle> PumpDriver<P> {
    pub fn new(pwm: P) -> Self {
        Self { pwm, duty: 0 }
    }

    /// Apply a logical duty in `0..=DUTY_MAX`.  Larger values saturate.
    pub fn set_duty(&mut self, duty: u16) -> Result<(), ActuatorError> {
        let duty = duty.min(DUTY_MAX);
        self.pwm
            .set_duty_cycle_fraction(DUTY_MAX - duty, DUTY_MAX)
            .map_err(|_| ActuatorError::PwmWriteFailed)?;
        self.duty = duty;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), ActuatorError> {
        self.set_duty(0)
    }

    /// Last duty successfully applied.
    pub fn duty(&self) -> u16 {
        self.duty
    }

    pub fn is_running(&self) -> bool {
        self.duty > 0
    }
}

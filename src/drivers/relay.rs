//! Relay and solenoid outputs.
//!
//! The heater SSR boards switch on a low input; the valve and cooler
//! drivers switch on a high one.  [`Relay`] hides the polarity so callers
//! only ever say "energised" or not.

use embedded_hal::digital::{OutputPin, PinState};

use crate::error::ActuatorError;

/// Electrical level that energises the load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

impl Polarity {
    fn level(self, on: bool) -> PinState {
        match self {
            Self::ActiveHigh => PinState::from(on),
            Self::ActiveLow => PinState::from(!on),
        }
    }
}

pub struct Relay<P> {
    pin: P,
    polarity: Polarity,
    on: bool,
}

impl<P: OutputPin> Relay<P> {
    /// Wrap a pin and immediately drive it to the de-energised level.
    pub fn new(pin: P, polarity: Polarity) -> Result<Self, ActuatorError> {
        let mut relay = Self {
            pin,
            polarity,
            on: true,
        };
        relay.set(false)?;
        Ok(relay)
    }

    pub fn set(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.pin
            .set_state(self.polarity.level(on))
            .map_err(|_| ActuatorError::GpioWriteFailed)?;
        self.on = on;
        Ok(())
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}

//! Sensor subsystem: temperature probes and the coolant flow counter.
//!
//! Process logic never touches hardware directly: temperatures arrive
//! through [`SensorPort`](crate::app::ports::SensorPort) and flow pulses
//! through the ISR-fed [`flow::PulseCounter`].  [`ds18b20`] is the probe
//! protocol the hardware adapter sits on.

pub mod ds18b20;
pub mod flow;
pub mod temperature;

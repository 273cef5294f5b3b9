//! Actuator drivers over `embedded-hal` traits.

pub mod buzzer;
pub mod pump;
pub mod relay;

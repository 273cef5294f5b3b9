//! Closed-loop control primitives.
//!
//! - [`debounce`]: consecutive-tick counter behind every fault/stage decision
//! - [`flow`]: coolant pump speed controller
//! - [`valve`]: offtake valve software PWM

pub mod debounce;
pub mod flow;
pub mod valve;

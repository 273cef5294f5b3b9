//! Application core: pure process logic, zero I/O.
//!
//! This module contains the business rules for the still controller:
//! FSM orchestration, safety supervision, flow control, valve metering and
//! config persistence scheduling.  All interaction with hardware happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;

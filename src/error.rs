//! Unified error types for the StillCtl firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level loop's error handling uniform.  All variants are `Copy` so they
//! can be passed through the control path without allocation.
//!
//! Process faults are *not* errors in the control flow sense: they are
//! resolved by state transitions in the FSM.  The [`ProcessFault`] type
//! exists so those transitions can be reported and logged uniformly.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read or returned unusable data.
    Sensor(SensorError),
    /// An actuator command failed.
    Actuator(ActuatorError),
    /// A process fault forced a terminal status.
    Process(ProcessFault),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Process(e) => write!(f, "process: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The one-wire bus did not answer the reset / transaction.
    BusFault,
    /// The addressed probe is not present on the bus.
    NotConnected,
    /// Scratchpad CRC mismatch.
    CrcMismatch,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusFault => write!(f, "bus fault"),
            Self::NotConnected => write!(f, "probe not connected"),
            Self::CrcMismatch => write!(f, "scratchpad CRC mismatch"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// PWM duty-cycle write failed.
    PwmWriteFailed,
    /// GPIO set failed.
    GpioWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Process faults
// ---------------------------------------------------------------------------

/// Debounced process faults.  Each one is resolved by forcing a terminal
/// status (`END`, `ERROR_REFERENCE` or `ERROR_BOILER`) and stopping the
/// heaters, pump and offtake valve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessFault {
    /// Vapor-reference probe above its ceiling.
    ReferenceOverTemperature,
    /// Boiler fell below its target by more than the allowed margin.
    BoilerUnderTemperature,
    /// Condenser output above its target by more than the allowed margin.
    OutputOverTemperature,
    /// Coolant flow collapsed during extraction.
    FlowLoss,
    /// Cube temperature crossed the end-of-run threshold.
    CubeEndReached,
}

impl fmt::Display for ProcessFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReferenceOverTemperature => write!(f, "reference over temperature"),
            Self::BoilerUnderTemperature => write!(f, "boiler under temperature"),
            Self::OutputOverTemperature => write!(f, "output over temperature"),
            Self::FlowLoss => write!(f, "coolant flow lost"),
            Self::CubeEndReached => write!(f, "cube end temperature reached"),
        }
    }
}

impl From<ProcessFault> for Error {
    fn from(e: ProcessFault) -> Self {
        Self::Process(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

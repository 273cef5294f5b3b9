//! Port traits: the hexagonal boundary between process logic and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (probes, relays, pump, buzzer, event sinks, storage)
//! implement these traits.  The [`AppService`](super::service::AppService)
//! consumes them via generics, so the controller never touches hardware
//! directly and runs unchanged against mocks on the host.

use crate::config::ProcessConfig;
use crate::error::{ActuatorError, SensorError};
use crate::sensors::temperature::SensorRole;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port.  Every call must return without waiting on the bus.
pub trait SensorPort {
    /// Start a temperature conversion on every probe.
    fn request_conversion(&mut self) -> Result<(), SensorError>;

    /// Result of the last completed conversion for `role`.
    fn read_celsius(&mut self, role: SensorRole) -> Result<f32, SensorError>;

    /// Flow-sensor pulses since the previous call.
    fn drain_flow_pulses(&mut self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port.  Re-applying the current state must be harmless; the
/// service still only calls in on a change.
pub trait ActuatorPort {
    fn set_heater_one(&mut self, on: bool) -> Result<(), ActuatorError>;

    fn set_heater_two(&mut self, on: bool) -> Result<(), ActuatorError>;

    fn set_valve(&mut self, open: bool) -> Result<(), ActuatorError>;

    fn set_cooler(&mut self, on: bool) -> Result<(), ActuatorError>;

    /// Pump power, 0 (stopped) to [`DUTY_MAX`](crate::control::flow::DUTY_MAX).
    fn set_pump_duty(&mut self, duty: u16) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Alert port (driven adapter: domain → buzzer)
// ───────────────────────────────────────────────────────────────

/// Audible alert requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    /// Short informational chime (stage change, pause, resume).
    Chime,
    /// Continuous error tone, latched until silenced.
    ErrorTone,
    /// Continuous end-of-run tone, latched until silenced.
    EndTone,
}

impl AlertKind {
    /// Whether the tone keeps sounding until the operator reacts.
    pub fn is_latched(self) -> bool {
        !matches!(self, Self::Chime)
    }
}

/// Fire-and-forget alert output.  No acknowledgement protocol.
pub trait AlertSink {
    fn alert(&mut self, kind: AlertKind);

    /// Stop any latched tone.
    fn silence(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / display)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log,
/// display, telemetry uplink).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists operator setpoints.
///
/// Implementations MUST validate before persisting and reject bad values
/// with [`ConfigError::ValidationFailed`] rather than clamping them.
pub trait ConfigPort {
    /// Load configuration.  [`ConfigError::NotFound`] on first boot.
    fn load(&self) -> Result<ProcessConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &ProcessConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::NotFound => Self::Config("not found"),
            ConfigError::Corrupted => Self::Config("corrupted"),
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::StorageFull => Self::Config("storage full"),
            ConfigError::IoError => Self::Config("I/O error"),
        }
    }
}

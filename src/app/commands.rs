//! Inbound commands to the application service.
//!
//! These are the operator actions from the keypad (or a serial console,
//! or a test harness) that the [`AppService`](super::service::AppService)
//! interprets and acts upon.

use crate::config::ProcessConfig;

/// Adjustment granularity.  The keypad picks `Coarse` once a key has been
/// held long enough to auto-repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Fine,
    Coarse,
}

impl Step {
    /// Increment for temperature and flow setpoints.
    pub fn float_delta(self) -> f32 {
        match self {
            Self::Fine => 0.1,
            Self::Coarse => 0.5,
        }
    }

    /// Increment for speeds, percentages, watts, minutes and duty.
    pub fn int_delta(self) -> i32 {
        match self {
            Self::Fine => 1,
            Self::Coarse => 5,
        }
    }
}

/// Operator-adjustable values.
///
/// Entries resolve against the active mode (and, for a few, the active
/// status) so one keypad position edits whichever setpoint is in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setpoint {
    /// Coolant flow target (L/h).
    FlowTarget,
    /// Extraction boiler target; in rectification the cube tail threshold,
    /// or the cube end threshold while in TAIL.
    BoilerTarget,
    /// Condenser output target for the active mode.
    OutputTarget,
    /// Vapor-reference ceiling.
    ReferenceMax,
    /// Extraction boiler delta; in rectification the body delta, or the
    /// tail delta while in TAIL.
    Delta,
    HeadSpeed,
    BodySpeed,
    SpeedReduction,
    /// Heater rating for the active mode.
    HeaterWatts,

    // Runtime only, never persisted.
    /// Minutes left on the stabilization timer.
    StabilizationRemaining,
    /// Current (possibly reduced) offtake speed.
    RealOfftakeSpeed,
    /// Body-run temperature snapshot.
    StartBodyTemp,
}

impl Setpoint {
    /// Whether an edit is written back to persistent storage.
    pub fn is_persisted(self) -> bool {
        !matches!(
            self,
            Self::StabilizationRemaining | Self::RealOfftakeSpeed | Self::StartBodyTemp
        )
    }
}

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Step the process status forward.
    AdvanceStage,
    /// Step the process status backward.
    RetreatStage,
    NextMode,
    PreviousMode,

    /// Nudge a setpoint up or down.
    Adjust {
        setpoint: Setpoint,
        up: bool,
        step: Step,
    },

    /// Toggle manual pump override.
    ToggleManualPump,
    /// Nudge pump duty while in manual override.
    AdjustManualDuty { up: bool, step: Step },

    StartCalibration,
    /// Finish calibration and store the measured coefficient.
    StopCalibration,

    /// Stop a latched alert tone.
    SilenceAlert,

    /// Replace the whole configuration.
    UpdateConfig(ProcessConfig),

    /// Persist the current configuration on the next save check.
    SaveConfig,
}

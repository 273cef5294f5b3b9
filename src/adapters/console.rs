//! Serial console command decoder.
//!
//! Turns one line of operator input into an [`AppCommand`].  Stands in for
//! the keypad on the bench and lets a host script drive the controller.
//!
//! ```text
//! next | back                     stage navigation
//! mode+ | mode-                   operating mode
//! set <name> up|down [coarse]     setpoint adjust
//! manual | duty up|down [coarse]  manual pump override
//! cal start|stop                  flow calibration
//! silence | save | config {json}
//! ```

use crate::app::commands::{AppCommand, Setpoint, Step};
use crate::config::ProcessConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    UnknownCommand,
    UnknownSetpoint,
    /// Direction missing or not `up`/`down`.
    BadDirection,
    BadConfig,
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty line"),
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::UnknownSetpoint => write!(f, "unknown setpoint"),
            Self::BadDirection => write!(f, "expected up or down"),
            Self::BadConfig => write!(f, "config JSON rejected"),
        }
    }
}

fn setpoint(name: &str) -> Result<Setpoint, ParseError> {
    Ok(match name {
        "flow" => Setpoint::FlowTarget,
        "boiler" => Setpoint::BoilerTarget,
        "output" => Setpoint::OutputTarget,
        "ref" => Setpoint::ReferenceMax,
        "delta" => Setpoint::Delta,
        "head" => Setpoint::HeadSpeed,
        "body" => Setpoint::BodySpeed,
        "reduction" => Setpoint::SpeedReduction,
        "watts" => Setpoint::HeaterWatts,
        "stab" => Setpoint::StabilizationRemaining,
        "speed" => Setpoint::RealOfftakeSpeed,
        "bodytemp" => Setpoint::StartBodyTemp,
        _ => return Err(ParseError::UnknownSetpoint),
    })
}

fn direction<'a>(words: &mut impl Iterator<Item = &'a str>) -> Result<(bool, Step), ParseError> {
    let up = match words.next() {
        Some("up") => true,
        Some("down") => false,
        _ => return Err(ParseError::BadDirection),
    };
    let step = if words.next() == Some("coarse") {
        Step::Coarse
    } else {
        Step::Fine
    };
    Ok((up, step))
}

pub fn parse_command(line: &str) -> Result<AppCommand, ParseError> {
    let line = line.trim();
    let (head, rest) = line.split_once(' ').unwrap_or((line, ""));
    let mut words = rest.split_whitespace();

    match head {
        "" => Err(ParseError::Empty),
        "next" => Ok(AppCommand::AdvanceStage),
        "back" => Ok(AppCommand::RetreatStage),
        "mode+" => Ok(AppCommand::NextMode),
        "mode-" => Ok(AppCommand::PreviousMode),
        "set" => {
            let sp = setpoint(words.next().ok_or(ParseError::UnknownSetpoint)?)?;
            let (up, step) = direction(&mut words)?;
            Ok(AppCommand::Adjust { setpoint: sp, up, step })
        }
        "manual" => Ok(AppCommand::ToggleManualPump),
        "duty" => {
            let (up, step) = direction(&mut words)?;
            Ok(AppCommand::AdjustManualDuty { up, step })
        }
        "cal" => match words.next() {
            Some("start") => Ok(AppCommand::StartCalibration),
            Some("stop") => Ok(AppCommand::StopCalibration),
            _ => Err(ParseError::UnknownCommand),
        },
        "silence" => Ok(AppCommand::SilenceAlert),
        "save" => Ok(AppCommand::SaveConfig),
        "config" => serde_json::from_str::<ProcessConfig>(rest.trim())
            .map(AppCommand::UpdateConfig)
            .map_err(|_| ParseError::BadConfig),
        _ => Err(ParseError::UnknownCommand),
    }
}

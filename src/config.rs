//! Process configuration parameters
//!
//! Operator setpoints for both operating modes.  Persisted as a postcard
//! blob through [`ConfigPort`](crate::app::ports::ConfigPort) and tagged
//! with [`CONFIG_SCHEMA_VERSION`] so a firmware with a different layout
//! reinitialises to defaults instead of misreading old bytes.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::fsm::Mode;

/// Bump whenever a field is added, removed or reordered.
pub const CONFIG_SCHEMA_VERSION: u8 = 143;

/// Persisted operator setpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Schema tag, compared against [`CONFIG_SCHEMA_VERSION`] on load.
    pub version: u8,

    // --- Coolant pump ---
    /// Target coolant flow (L/h).
    pub pump_target_speed_lph: f32,
    /// Flow sensor pulses per millilitre.
    pub pump_coefficient: f32,

    // --- Shared ---
    /// Vapor-reference ceiling (Celsius).
    pub reference_max_c: f32,

    // --- Extraction mode ---
    /// Boiler target (Celsius).
    pub ext_boiler_target_c: f32,
    /// Condenser output target (Celsius).
    pub ext_output_target_c: f32,
    /// Allowed boiler deviation before the flow target is nudged (Celsius).
    pub ext_boiler_delta_c: f32,
    /// Heater rating, telemetry only (W).
    pub ext_heater_watts: u16,
    /// Settle time before the process stage (minutes).
    pub ext_settle_minutes: u8,

    // --- Rectification mode ---
    /// Cube temperature that announces the tail fraction (Celsius).
    pub rect_cube_tail_c: f32,
    /// Cube temperature that ends the run (Celsius).
    pub rect_cube_end_c: f32,
    /// Condenser output target during overclock (Celsius).
    pub rect_output_target_c: f32,
    /// Output rise over the body snapshot that pauses offtake (Celsius).
    pub rect_body_delta_c: f32,
    /// Same, while in the tail stage (Celsius).
    pub rect_tail_delta_c: f32,
    /// Heater rating, telemetry only (W).
    pub rect_heater_watts: u16,
    /// Head offtake speed (mL/h).
    pub rect_head_speed: u16,
    /// Body offtake speed (mL/h).
    pub rect_body_speed: u16,
    /// Offtake reduction applied on every pause (percent).
    pub rect_speed_reduction_pct: u8,
    /// Settle time before the head stage (minutes).
    pub rect_settle_minutes: u8,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_SCHEMA_VERSION,

            // Pump
            pump_target_speed_lph: 15.5,
            pump_coefficient: 1.95,

            // Shared
            reference_max_c: 42.0,

            // Extraction
            ext_boiler_target_c: 98.7,
            ext_output_target_c: 90.2,
            ext_boiler_delta_c: 0.3,
            ext_heater_watts: 3000,
            ext_settle_minutes: 5,

            // Rectification
            rect_cube_tail_c: 91.0,
            rect_cube_end_c: 96.0,
            rect_output_target_c: 45.0,
            rect_body_delta_c: 0.3,
            rect_tail_delta_c: 0.5,
            rect_heater_watts: 2800,
            rect_head_speed: 150,
            rect_body_speed: 2100,
            rect_speed_reduction_pct: 10,
            rect_settle_minutes: 60,
        }
    }
}

impl ProcessConfig {
    /// Settle ("work on itself") duration for the given mode, in minutes.
    pub fn settle_minutes(&self, mode: Mode) -> u8 {
        match mode {
            Mode::Extraction => self.ext_settle_minutes,
            Mode::Rectification => self.rect_settle_minutes,
        }
    }

    /// Condenser output target for the given mode.
    pub fn output_target_c(&self, mode: Mode) -> f32 {
        match mode {
            Mode::Extraction => self.ext_output_target_c,
            Mode::Rectification => self.rect_output_target_c,
        }
    }

    /// Heater rating for the given mode (telemetry only).
    pub fn heater_watts(&self, mode: Mode) -> u16 {
        match mode {
            Mode::Extraction => self.ext_heater_watts,
            Mode::Rectification => self.rect_heater_watts,
        }
    }
}

/// Reject values the controller cannot run with.
pub fn validate_config(cfg: &ProcessConfig) -> Result<(), ConfigError> {
    if cfg.version != CONFIG_SCHEMA_VERSION {
        return Err(ConfigError::ValidationFailed("unknown config schema version"));
    }
    if !(cfg.pump_coefficient.is_finite() && cfg.pump_coefficient > 0.0) {
        return Err(ConfigError::ValidationFailed("pump_coefficient must be > 0"));
    }
    if !(cfg.pump_target_speed_lph.is_finite() && cfg.pump_target_speed_lph >= 0.0) {
        return Err(ConfigError::ValidationFailed(
            "pump_target_speed_lph must be finite and >= 0",
        ));
    }
    let temperatures = [
        cfg.reference_max_c,
        cfg.ext_boiler_target_c,
        cfg.ext_output_target_c,
        cfg.ext_boiler_delta_c,
        cfg.rect_cube_tail_c,
        cfg.rect_cube_end_c,
        cfg.rect_output_target_c,
        cfg.rect_body_delta_c,
        cfg.rect_tail_delta_c,
    ];
    if temperatures.iter().any(|t| !t.is_finite()) {
        return Err(ConfigError::ValidationFailed("temperatures must be finite"));
    }
    if cfg.rect_speed_reduction_pct > 100 {
        return Err(ConfigError::ValidationFailed(
            "rect_speed_reduction_pct must be 0-100",
        ));
    }
    Ok(())
}

/// Result of [`load_or_init`].
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ProcessConfig,
    /// `true` when defaults were substituted and must be written back.
    pub needs_save: bool,
}

/// Load the stored configuration, falling back to defaults when nothing is
/// stored, the blob is unreadable, or its schema tag does not match.
///
/// Never fails: a configuration problem is resolved by reinitialising.
pub fn load_or_init(port: &impl ConfigPort) -> LoadedConfig {
    match port.load() {
        Ok(cfg) if cfg.version == CONFIG_SCHEMA_VERSION => {
            info!("Config loaded (schema v{})", cfg.version);
            LoadedConfig {
                config: cfg,
                needs_save: false,
            }
        }
        Ok(cfg) => {
            warn!(
                "Config schema v{} != v{}, reinitialising defaults",
                cfg.version, CONFIG_SCHEMA_VERSION
            );
            LoadedConfig {
                config: ProcessConfig::default(),
                needs_save: true,
            }
        }
        Err(ConfigError::NotFound) => {
            info!("No stored config, using defaults");
            LoadedConfig {
                config: ProcessConfig::default(),
                needs_save: true,
            }
        }
        Err(e) => {
            warn!("Config load failed ({}), using defaults", e);
            LoadedConfig {
                config: ProcessConfig::default(),
                needs_save: true,
            }
        }
    }
}

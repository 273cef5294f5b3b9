//! DS18B20 temperature acquisition for the three probe roles.
//!
//! The probes share one one-wire bus.  A 12-bit conversion takes ~750 ms,
//! so acquisition is two-phase and never blocks the loop:
//!
//! ```text
//!  pass n      : request conversion
//!  pass n + k  : (≥ 1 s later) read all three, publish, request again
//! ```
//!
//! ## Two-strike fault filter
//!
//! A reading outside −100..=1000 °C on its own only arms a pending flag and
//! leaves the published value untouched.  A second consecutive bad reading
//! publishes [`SENSOR_FAULT_SENTINEL`].  Any in-range reading clears the
//! flag and publishes the value rounded to 0.1 °C.

use log::{debug, warn};

use crate::app::ports::SensorPort;
use crate::error::SensorError;
use crate::scheduler::Cadence;

/// Published in place of a temperature while a probe is persistently faulted.
pub const SENSOR_FAULT_SENTINEL: f32 = 999.0;

const VALID_MIN_C: f32 = -100.0;
const VALID_MAX_C: f32 = 1000.0;

/// Time between conversion request and read-back.
pub const SAMPLE_INTERVAL_MS: u64 = 1000;

/// Logical probe roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SensorRole {
    /// Vapor reference above the column ("TSA").
    Reference = 0,
    /// Boiler / cube.
    Boiler = 1,
    /// Condenser output.
    Output = 2,
}

impl SensorRole {
    pub const COUNT: usize = 3;
    pub const ALL: [SensorRole; Self::COUNT] = [Self::Reference, Self::Boiler, Self::Output];

    pub fn label(self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::Boiler => "boiler",
            Self::Output => "output",
        }
    }
}

/// Driver-level view of the one-wire bus, implemented by the DS18B20 driver
/// on target and by test doubles on host.
pub trait TemperatureBus {
    /// Broadcast "convert T" to every probe.  Must not wait for completion.
    fn start_conversion(&mut self) -> Result<(), SensorError>;

    /// Read the last completed conversion for `role`.
    fn read_celsius(&mut self, role: SensorRole) -> Result<f32, SensorError>;
}

/// Published value plus fault-filter state for one probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureChannel {
    last_valid_c: f32,
    fault_pending: bool,
}

impl Default for TemperatureChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl TemperatureChannel {
    pub const fn new() -> Self {
        Self {
            last_valid_c: 0.0,
            fault_pending: false,
        }
    }

    /// Run one raw reading through the two-strike filter and return the
    /// value now published.
    pub fn ingest(&mut self, raw_c: f32) -> f32 {
        if (VALID_MIN_C..=VALID_MAX_C).contains(&raw_c) {
            self.fault_pending = false;
            self.last_valid_c = round_tenths(raw_c);
        } else if self.fault_pending {
            self.fault_pending = false;
            self.last_valid_c = SENSOR_FAULT_SENTINEL;
        } else {
            self.fault_pending = true;
        }
        self.last_valid_c
    }

    pub fn celsius(&self) -> f32 {
        self.last_valid_c
    }

    pub fn fault_pending(&self) -> bool {
        self.fault_pending
    }

    pub fn is_faulted(&self) -> bool {
        self.last_valid_c == SENSOR_FAULT_SENTINEL
    }
}

/// Round to one decimal, half away from zero on the positive side.
pub fn round_tenths(c: f32) -> f32 {
    (c * 10.0 + 0.5).floor() / 10.0
}

/// Latest published temperatures for every role.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TemperatureReadings {
    pub reference_c: f32,
    pub boiler_c: f32,
    pub output_c: f32,
}

impl TemperatureReadings {
    pub fn get(&self, role: SensorRole) -> f32 {
        match role {
            SensorRole::Reference => self.reference_c,
            SensorRole::Boiler => self.boiler_c,
            SensorRole::Output => self.output_c,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Request,
    Collect,
}

/// Non-blocking sampler for all probe roles.
pub struct TemperatureAcquisition {
    channels: [TemperatureChannel; SensorRole::COUNT],
    phase: Phase,
    cadence: Cadence,
}

impl Default for TemperatureAcquisition {
    fn default() -> Self {
        Self::new()
    }
}

impl TemperatureAcquisition {
    pub fn new() -> Self {
        Self {
            channels: [TemperatureChannel::new(); SensorRole::COUNT],
            phase: Phase::Request,
            cadence: Cadence::new(SAMPLE_INTERVAL_MS),
        }
    }

    /// Advance the acquisition by one loop pass.
    ///
    /// Returns `true` when a fresh set of readings was published.
    pub fn poll(&mut self, sensors: &mut impl SensorPort, now_ms: u64) -> bool {
        match self.phase {
            Phase::Request => {
                self.request(sensors, now_ms);
                false
            }
            Phase::Collect => {
                if !self.cadence.due(now_ms) {
                    return false;
                }
                for role in SensorRole::ALL {
                    let ch = &mut self.channels[role as usize];
                    let published = match sensors.read_celsius(role) {
                        Ok(c) => ch.ingest(c),
                        Err(e) => {
                            debug!("{} probe read failed: {}", role.label(), e);
                            ch.ingest(f32::NAN)
                        }
                    };
                    if published == SENSOR_FAULT_SENTINEL && !ch.fault_pending() {
                        warn!("{} probe faulted, publishing sentinel", role.label());
                    }
                }
                // Back-to-back: the next conversion starts in the same pass.
                self.request(sensors, now_ms);
                true
            }
        }
    }

    fn request(&mut self, sensors: &mut impl SensorPort, now_ms: u64) {
        if let Err(e) = sensors.request_conversion() {
            debug!("conversion request failed: {}", e);
        }
        self.cadence.defer(now_ms);
        self.phase = Phase::Collect;
    }

    pub fn readings(&self) -> TemperatureReadings {
        TemperatureReadings {
            reference_c: self.channels[SensorRole::Reference as usize].celsius(),
            boiler_c: self.channels[SensorRole::Boiler as usize].celsius(),
            output_c: self.channels[SensorRole::Output as usize].celsius(),
        }
    }

    pub fn channel(&self, role: SensorRole) -> &TemperatureChannel {
        &self.channels[role as usize]
    }
}

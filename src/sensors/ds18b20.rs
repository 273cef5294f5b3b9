//! DS18B20 probes on a shared one-wire bus.
//!
//! [`Ds18b20Bus`] speaks the scratchpad protocol over any [`OneWire`]
//! link and implements [`TemperatureBus`].  Each role is addressed by its
//! 64-bit ROM code; conversion is broadcast with Skip ROM so all three
//! probes convert together.

use log::{info, warn};

use crate::error::SensorError;

use super::temperature::{SensorRole, TemperatureBus};

pub type Rom = [u8; 8];

const CMD_SKIP_ROM: u8 = 0xCC;
const CMD_MATCH_ROM: u8 = 0x55;
const CMD_CONVERT_T: u8 = 0x44;
const CMD_READ_SCRATCHPAD: u8 = 0xBE;
const CMD_WRITE_SCRATCHPAD: u8 = 0x4E;

/// Configuration register value for 12-bit conversions (~750 ms).
pub const RESOLUTION_12_BIT: u8 = 0x7F;

/// Byte-level one-wire link.
pub trait OneWire {
    /// Reset pulse.  Fails when no device answers with a presence pulse.
    fn reset(&mut self) -> Result<(), SensorError>;

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SensorError>;

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), SensorError>;
}

/// Dallas/Maxim CRC-8 (polynomial 0x31, reflected).  A buffer that ends
/// with its own CRC checks to zero.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
    }
    crc
}

/// Decode a 9-byte scratchpad into degrees Celsius.
pub fn decode_scratchpad(pad: &[u8; 9]) -> Result<f32, SensorError> {
    if pad.iter().all(|&b| b == 0xFF) {
        return Err(SensorError::NotConnected);
    }
    if crc8(pad) != 0 {
        return Err(SensorError::CrcMismatch);
    }
    Ok(f32::from(i16::from_le_bytes([pad[0], pad[1]])) / 16.0)
}

/// Pick a ROM for each role.  Configured ROMs are kept when every one of
/// them is present; otherwise the first three discovered devices are taken
/// in bus order (reference, boiler, output).  Returns `None` when fewer than
/// three devices were found and the configured set is incomplete.
pub fn enroll(configured: &[Rom; SensorRole::COUNT], found: &[Rom]) -> Option<[Rom; SensorRole::COUNT]> {
    if configured.iter().all(|rom| found.contains(rom)) {
        return Some(*configured);
    }
    match found {
        [a, b, c, ..] => {
            info!("ds18b20: re-enrolling probes in discovery order");
            Some([*a, *b, *c])
        }
        _ => {
            warn!("ds18b20: {} of {} probes found", found.len(), SensorRole::COUNT);
            None
        }
    }
}

pub struct Ds18b20Bus<W> {
    wire: W,
    roms: [Rom; SensorRole::COUNT],
}

impl<W: OneWire> Ds18b20Bus<W> {
    pub fn new(wire: W, roms: [Rom; SensorRole::COUNT]) -> Self {
        Self { wire, roms }
    }

    /// Broadcast the resolution to every probe.
    pub fn set_resolution(&mut self, config: u8) -> Result<(), SensorError> {
        self.wire.reset()?;
        self.wire
            .write_bytes(&[CMD_SKIP_ROM, CMD_WRITE_SCRATCHPAD, 0x00, 0x00, config])
    }

    pub fn rom(&self, role: SensorRole) -> &Rom {
        &self.roms[role as usize]
    }

    fn select(&mut self, role: SensorRole) -> Result<(), SensorError> {
        self.wire.reset()?;
        let mut frame = [0u8; 9];
        frame[0] = CMD_MATCH_ROM;
        frame[1..].copy_from_slice(&self.roms[role as usize]);
        self.wire.write_bytes(&frame)
    }
}

impl<W: OneWire> TemperatureBus for Ds18b20Bus<W> {
    fn start_conversion(&mut self) -> Result<(), SensorError> {
        self.wire.reset()?;
        self.wire.write_bytes(&[CMD_SKIP_ROM, CMD_CONVERT_T])
    }

    fn read_celsius(&mut self, role: SensorRole) -> Result<f32, SensorError> {
        self.select(role)?;
        self.wire.write_bytes(&[CMD_READ_SCRATCHPAD])?;
        let mut pad = [0u8; 9];
        self.wire.read_bytes(&mut pad)?;
        decode_scratchpad(&pad)
    }
}

//! GPIO / peripheral pin assignments for the still controller board.
//!
//! Single source of truth: `main` hands these to the drivers instead of
//! hard-coding pin numbers.

use crate::sensors::ds18b20::Rom;

// ---------------------------------------------------------------------------
// Heating elements (SSR inputs, active LOW)
// ---------------------------------------------------------------------------

pub const HEATER_ONE_GPIO: i32 = 11;
pub const HEATER_TWO_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// Offtake solenoid valve and condenser cooler (active HIGH)
// ---------------------------------------------------------------------------

pub const VALVE_GPIO: i32 = 10;
pub const COOLER_GPIO: i32 = 12;

// ---------------------------------------------------------------------------
// Coolant pump MOSFET (LEDC, inverted duty)
// ---------------------------------------------------------------------------

pub const PUMP_PWM_GPIO: i32 = 9;
/// 10-bit resolution gives the 0..=1023 duty range the flow loop works in.
pub const PUMP_PWM_RESOLUTION_BITS: u32 = 10;
pub const PUMP_PWM_FREQ_HZ: u32 = 1_000;

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// Hall-effect flow sensor, rising-edge interrupt.
pub const FLOW_PULSE_GPIO: i32 = 3;

/// DS18B20 one-wire bus (external 4.7 kΩ pull-up).
pub const ONEWIRE_GPIO: i32 = 2;

/// Factory probe ROM codes in role order: reference, boiler, output.
/// Replaced by discovery order when any of them is missing from the bus.
pub const PROBE_ROMS: [Rom; 3] = [
    [0x28, 0xFF, 0x44, 0x05, 0xC4, 0x17, 0x04, 0x11],
    [0x28, 0xFF, 0xE2, 0xFC, 0x80, 0x14, 0x02, 0x7B],
    [0x28, 0xFF, 0x1F, 0x11, 0x25, 0x17, 0x03, 0x2D],
];

// ---------------------------------------------------------------------------
// Buzzer
// ---------------------------------------------------------------------------

pub const BUZZER_GPIO: i32 = 16;

//! Fuzz target: DS18B20 scratchpad decoding
//!
//! Any 9 bytes off the bus decode to a finite temperature inside the
//! sensor's representable range, or to an error.  A pad that decodes
//! must carry a valid CRC.
//!
//! cargo fuzz run fuzz_scratchpad

#![no_main]

use libfuzzer_sys::fuzz_target;
use stillctl::sensors::ds18b20::{crc8, decode_scratchpad};

fuzz_target!(|data: &[u8]| {
    let Some(Ok(pad)) = data.get(..9).map(<[u8; 9]>::try_from) else {
        return;
    };
    if let Ok(c) = decode_scratchpad(&pad) {
        assert!(c.is_finite());
        assert!((-2048.0..2048.0).contains(&c));
        assert_eq!(crc8(&pad[..8]), pad[8]);
    }
});

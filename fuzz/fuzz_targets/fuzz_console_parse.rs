//! Fuzz target: `parse_command`
//!
//! Arbitrary console lines must parse or be rejected, never panic.
//!
//! cargo fuzz run fuzz_console_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use stillctl::adapters::console::parse_command;

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = core::str::from_utf8(data) {
        let _ = parse_command(line);
    }
});

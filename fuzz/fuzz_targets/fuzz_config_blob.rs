//! Fuzz target: persisted config blob
//!
//! Feeds arbitrary bytes into the host config store and boots from it.
//! Loading must never panic, and whatever comes back from `load_or_init`
//! carries the current schema version.
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use libfuzzer_sys::fuzz_target;
use stillctl::adapters::nvs::NvsAdapter;
use stillctl::config::{CONFIG_SCHEMA_VERSION, load_or_init};

fuzz_target!(|data: &[u8]| {
    let Ok(store) = NvsAdapter::new() else {
        return;
    };
    store.inject_raw(data);
    let loaded = load_or_init(&store);
    assert_eq!(loaded.config.version, CONFIG_SCHEMA_VERSION);
});

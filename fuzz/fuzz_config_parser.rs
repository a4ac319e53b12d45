//! Fuzz target for the TOML configuration parser.
//!
//! Run with: cargo +nightly fuzz run fuzz_config_parser
//!
//! Feeds arbitrary bytes to `AppConfig::parse()` to find panics or hangs in
//! parsing and validation, including the per-table column checks.

#![no_main]

use libfuzzer_sys::fuzz_target;
use searchgrid_core::DataTable;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = searchgrid_config::AppConfig::parse(s) {
            // Every validated table must build without error.
            for table in &config.tables {
                let built = DataTable::<String>::from_config(
                    table,
                    &config.filtering,
                    config.expressions.separator,
                    Vec::new(),
                );
                assert!(built.is_ok(), "{}: {:?}", table.client_id, built.err());
            }
        }
    }
});

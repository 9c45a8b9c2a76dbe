//! Integration tests for procon
//!
//! These tests require the isolate binary to be installed and accessible.
//! Run with: cargo test -p procon --features integration-tests
//!
//! Tests that require root are marked `#[ignore]`. To include them:
//!    cargo test -p procon --features integration-tests -- --include-ignored

#![cfg(feature = "integration-tests")]

use std::fs;

use procon::config::Config;

mod config_loading;
mod execution;
mod judging;
mod meta_file_fixtures;
mod problem_loading;

const FIXTURES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

/// Helper to get fixture file content
pub(crate) fn fixture_source(name: &str) -> String {
    let path = format!("{FIXTURES_PATH}/sources/{name}");
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {path}: {e}"))
}

/// Create a test config with cgroup support if available, falling back to
/// non-cgroup mode. Tests run in parallel, so each one passes its own
/// range of box IDs.
pub(crate) fn test_config(first_box_id: u32) -> Config {
    let mut config = Config::default();
    config.sandbox.first_box_id = first_box_id;
    if config.sandbox.cgroup {
        config.sandbox.cgroup = procon::prepare_cgroup(&config.sandbox.cg_root).unwrap_or(false);
    }
    config
}

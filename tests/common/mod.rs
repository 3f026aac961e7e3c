//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::path::PathBuf;

use assert_cmd::Command;
use serde_json::Value;

/// Command for the webrtc-widgets binary, isolated from any config file
/// in the working directory or the environment
pub fn host_cmd() -> Command {
    let mut cmd = Command::cargo_bin("webrtc-widgets").unwrap();
    cmd.current_dir(fixtures_dir())
        .env_remove("WEBRTC_WIDGETS_CONFIG")
        .env_remove("WEBRTC_WIDGETS_AUTO_CONNECT")
        .env_remove("WEBRTC_WIDGETS_TARGET_NAME")
        .env_remove("RUST_LOG");
    cmd
}

/// Get the path to the test fixtures directory
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

pub fn valid_config_fixture() -> PathBuf {
    fixture_path("valid_config.toml")
}

pub fn invalid_config_fixture() -> PathBuf {
    fixture_path("invalid_config.toml")
}

/// Parse each stdout line of the host as JSON
pub fn json_lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("host wrote a non-JSON line"))
        .collect()
}

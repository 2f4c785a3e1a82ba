//! # Configuration System
//!
//! Configuration for the InfluxDB test fixture.
//!
//! This crate provides:
//! - The [`InfluxDbConfig`] structure with the image's setup defaults
//! - Environment variable loading (`INFLUXDB_TEST_*`)
//! - Settings files (TOML/YAML), named by `INFLUXDB_TEST_CONFIG`
//! - Configuration precedence (env > file > defaults)
//! - Configuration validation

pub mod config;
pub mod file_loader;
pub mod loader;
pub mod validation;

pub use config::{
    DEFAULT_ADMIN_TOKEN, DEFAULT_BUCKET, DEFAULT_IMAGE_NAME, DEFAULT_IMAGE_TAG, DEFAULT_ORGANIZATION,
    DEFAULT_PASSWORD, DEFAULT_STARTUP_TIMEOUT_SECONDS, DEFAULT_USERNAME, InfluxDbConfig
};
pub use file_loader::{ConfigFileError, FileFormat, load_from_file};
pub use loader::{apply_env_overrides, load_from_env};
pub use validation::validate;

use std::env;
use std::path::Path;

/// Load configuration with precedence: environment > file > defaults.
///
/// When `path` is `None` only the defaults and the environment are used.
pub fn load(path: Option<&Path>) -> Result<InfluxDbConfig, Box<dyn std::error::Error>> {
    let base = match path {
        Some(path) => load_from_file(path)?,
        None => InfluxDbConfig::default()
    };
    apply_env_overrides(base)
}

/// Settings for the shared fixture.
///
/// Reads the file named by `INFLUXDB_TEST_CONFIG` when it is set, then
/// applies the other `INFLUXDB_TEST_*` variables on top.
pub fn load_fixture_config() -> Result<InfluxDbConfig, Box<dyn std::error::Error>> {
    match env::var_os(loader::ENV_CONFIG_FILE) {
        Some(path) => load(Some(Path::new(&path))),
        None => load(None)
    }
}

//! # Environment Variable Loader
//!
//! Loads fixture configuration from environment variables so CI can pin a
//! different image or credentials without code changes.
//!
//! # Naming Convention
//! - `INFLUXDB_TEST_*`: InfluxDB fixture settings

use crate::config::InfluxDbConfig;
use std::env;

pub const ENV_IMAGE: &str = "INFLUXDB_TEST_IMAGE";
pub const ENV_BUCKET: &str = "INFLUXDB_TEST_BUCKET";
pub const ENV_USERNAME: &str = "INFLUXDB_TEST_USERNAME";
pub const ENV_PASSWORD: &str = "INFLUXDB_TEST_PASSWORD";
pub const ENV_ORGANIZATION: &str = "INFLUXDB_TEST_ORG";
pub const ENV_ADMIN_TOKEN: &str = "INFLUXDB_TEST_ADMIN_TOKEN";
pub const ENV_STARTUP_TIMEOUT_SECONDS: &str = "INFLUXDB_TEST_STARTUP_TIMEOUT_SECONDS";
/// Path of a TOML or YAML settings file read before the overrides above.
pub const ENV_CONFIG_FILE: &str = "INFLUXDB_TEST_CONFIG";

/// Load configuration from environment variables.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Starts from [`InfluxDbConfig::default`] and applies every
/// `INFLUXDB_TEST_*` variable that is set.
///
/// ## Usage
/// ```rust,no_run
/// use config::load_from_env;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = load_from_env()?;
///     println!("InfluxDB image: {}", config.image);
///     Ok(())
/// }
/// ```
///
/// ## Environment Variables
/// - `INFLUXDB_TEST_IMAGE`: image reference (default: "influxdb:2.0.6")
/// - `INFLUXDB_TEST_BUCKET`: initial bucket (default: "init.bucket")
/// - `INFLUXDB_TEST_USERNAME`: initial user (default: "any")
/// - `INFLUXDB_TEST_PASSWORD`: initial password (default: "any.password")
/// - `INFLUXDB_TEST_ORG`: initial organization (default: "org")
/// - `INFLUXDB_TEST_ADMIN_TOKEN`: admin token (default: "admin.token")
/// - `INFLUXDB_TEST_STARTUP_TIMEOUT_SECONDS`: readiness timeout (default: 120)
pub fn load_from_env() -> Result<InfluxDbConfig, Box<dyn std::error::Error>> {
    apply_env_overrides(InfluxDbConfig::default())
}

/// Apply `INFLUXDB_TEST_*` overrides on top of an existing configuration.
///
/// Variables that are not set leave the corresponding field untouched. A set
/// but unparsable timeout is an error.
pub fn apply_env_overrides(
    mut config: InfluxDbConfig
) -> Result<InfluxDbConfig, Box<dyn std::error::Error>> {
    if let Ok(image) = env::var(ENV_IMAGE) {
        config.image = image;
    }
    if let Ok(bucket) = env::var(ENV_BUCKET) {
        config.bucket = bucket;
    }
    if let Ok(username) = env::var(ENV_USERNAME) {
        config.username = username;
    }
    if let Ok(password) = env::var(ENV_PASSWORD) {
        config.password = password;
    }
    if let Ok(organization) = env::var(ENV_ORGANIZATION) {
        config.organization = organization;
    }
    if let Ok(admin_token) = env::var(ENV_ADMIN_TOKEN) {
        config.admin_token = admin_token;
    }
    if env::var(ENV_STARTUP_TIMEOUT_SECONDS).is_ok() {
        config.startup_timeout_seconds = parse_env(ENV_STARTUP_TIMEOUT_SECONDS)?;
    }

    Ok(config)
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<T, Box<dyn std::error::Error>>
where
    T::Err: std::error::Error + 'static
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error>),
        Err(e) => Err(Box::new(e) as Box<dyn std::error::Error>)
    }
}

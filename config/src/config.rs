//! # Configuration Structures
//!
//! Settings for the InfluxDB test fixture.
//!
//! All configuration structures:
//! - Use `serde` for serialization/deserialization
//! - Use `validator` for input validation
//! - Default to the values the `influxdb` image is provisioned with

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Repository and tag of the image used when nothing else is configured.
pub const DEFAULT_IMAGE_NAME: &str = "influxdb";
pub const DEFAULT_IMAGE_TAG: &str = "2.0.6";
pub const DEFAULT_BUCKET: &str = "init.bucket";
pub const DEFAULT_USERNAME: &str = "any";
pub const DEFAULT_PASSWORD: &str = "any.password";
pub const DEFAULT_ORGANIZATION: &str = "org";
pub const DEFAULT_ADMIN_TOKEN: &str = "admin.token";
pub const DEFAULT_STARTUP_TIMEOUT_SECONDS: u64 = 120;

/// InfluxDB fixture configuration.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Describes which image to run and which first-run setup values the
/// container is initialized with.
///
/// ## Usage
/// ```rust,no_run
/// use config::InfluxDbConfig;
///
/// let config = InfluxDbConfig::default();
/// assert_eq!(config.bucket, "init.bucket");
/// ```
///
/// ## Fields
/// - `image`: image reference, `influxdb:2.0.6` by default
/// - `bucket`: initial bucket (default: "init.bucket")
/// - `username`: initial admin user (default: "any")
/// - `password`: initial admin password (default: "any.password")
/// - `organization`: initial organization (default: "org")
/// - `admin_token`: static admin API token (default: "admin.token")
/// - `startup_timeout_seconds`: readiness timeout (default: 120)
///
/// ## Validation
/// - All string fields: minimum length 1
/// - `startup_timeout_seconds`: 1-600
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
pub struct InfluxDbConfig {
    #[serde(default = "default_image")]
    #[validate(length(min = 1, max = 255))]
    pub image: String,

    #[serde(default = "default_bucket")]
    #[validate(length(min = 1))]
    pub bucket: String,

    #[serde(default = "default_username")]
    #[validate(length(min = 1))]
    pub username: String,

    #[serde(default = "default_password")]
    #[validate(length(min = 1))]
    pub password: String,

    #[serde(default = "default_organization")]
    #[validate(length(min = 1))]
    pub organization: String,

    #[serde(default = "default_admin_token")]
    #[validate(length(min = 1))]
    pub admin_token: String,

    #[serde(default = "default_startup_timeout_seconds")]
    #[validate(range(min = 1, max = 600))]
    pub startup_timeout_seconds: u64
}

impl Default for InfluxDbConfig {
    fn default() -> Self {
        Self {
            image: default_image(),
            bucket: default_bucket(),
            username: default_username(),
            password: default_password(),
            organization: default_organization(),
            admin_token: default_admin_token(),
            startup_timeout_seconds: default_startup_timeout_seconds()
        }
    }
}

fn default_image() -> String {
    format!("{}:{}", DEFAULT_IMAGE_NAME, DEFAULT_IMAGE_TAG)
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

fn default_username() -> String {
    DEFAULT_USERNAME.to_string()
}

fn default_password() -> String {
    DEFAULT_PASSWORD.to_string()
}

fn default_organization() -> String {
    DEFAULT_ORGANIZATION.to_string()
}

fn default_admin_token() -> String {
    DEFAULT_ADMIN_TOKEN.to_string()
}

fn default_startup_timeout_seconds() -> u64 {
    DEFAULT_STARTUP_TIMEOUT_SECONDS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_image_setup_values() {
        let config = InfluxDbConfig::default();
        assert_eq!(config.image, "influxdb:2.0.6");
        assert_eq!(config.bucket, "init.bucket");
        assert_eq!(config.username, "any");
        assert_eq!(config.password, "any.password");
        assert_eq!(config.organization, "org");
        assert_eq!(config.admin_token, "admin.token");
        assert_eq!(config.startup_timeout_seconds, 120);
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: InfluxDbConfig = toml::from_str("bucket = \"metrics\"").unwrap();
        assert_eq!(config.bucket, "metrics");
        assert_eq!(config.organization, DEFAULT_ORGANIZATION);
        assert_eq!(config.image, "influxdb:2.0.6");
    }

    #[test]
    fn test_serde_round_trip_json() {
        let config = InfluxDbConfig {
            admin_token: "secret".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: InfluxDbConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}

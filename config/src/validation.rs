//! # Configuration Validation
//!
//! Validates fixture configuration using the `validator` crate.

use crate::config::InfluxDbConfig;
use validator::Validate;

/// Validate configuration structure.
///
/// ## Validation Rules
/// - `image`: 1-255 characters
/// - `bucket`, `username`, `password`, `organization`, `admin_token`: at
///   least 1 character; the image's setup mode refuses empty values
/// - `startup_timeout_seconds`: 1-600
pub fn validate(config: &InfluxDbConfig) -> Result<(), validator::ValidationErrors> {
    config.validate()
}

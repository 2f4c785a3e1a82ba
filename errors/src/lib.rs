//! # InfluxDB Fixture Errors
//!
//! Error types for the InfluxDB test fixture workspace.
//!
//! - Uses `thiserror` for structured error definitions
//! - Named fields in every message so call sites stay self-describing
//! - Nothing here is recovered locally; callers propagate with `?`

use thiserror::Error;

/// Errors raised while building, starting or inspecting an InfluxDB container.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Invalid image reference '{reference}': {reason}")]
    InvalidImageReference { reference: String, reason: String },

    #[error("Image {image} is not compatible with {expected}")]
    IncompatibleImage { image: String, expected: String },

    #[error("Invalid fixture configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("Container {image} failed to start: {reason}")]
    StartupFailed { image: String, reason: String },

    #[error("Could not resolve mapped port for {port}: {reason}")]
    PortResolution { port: u16, reason: String },

    #[error("Port {host}:{port} did not accept connections after {attempts} attempts")]
    PortNotListening {
        host: String,
        port: u16,
        attempts: u32
    },

    #[error("Container runtime operation {operation} failed: {reason}")]
    Runtime { operation: String, reason: String },

    #[error(transparent)]
    Client(#[from] InfluxClientError)
}

/// Errors raised by the InfluxDB HTTP client handle.
#[derive(Debug, Error)]
pub enum InfluxClientError {
    #[error("Invalid client configuration: {reason}")]
    Configuration { reason: String },

    #[error("Request to {url} failed: {reason}")]
    Connection { url: String, reason: String },

    #[error("InfluxDB API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Flux query failed: {message}")]
    Query { message: String },

    #[error("Failed to decode {what}: {reason}")]
    Decode { what: String, reason: String },

    #[error("Invalid point: {reason}")]
    InvalidPoint { reason: String }
}

impl InfluxClientError {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None
        }
    }
}

/// Result alias used by fixture operations.
pub type FixtureResult<T> = Result<T, FixtureError>;

/// Result alias used by the client handle.
pub type ClientResult<T> = Result<T, InfluxClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incompatible_image_message() {
        let err = FixtureError::IncompatibleImage {
            image: "postgres:16".to_string(),
            expected: "influxdb".to_string()
        };
        assert_eq!(
            err.to_string(),
            "Image postgres:16 is not compatible with influxdb"
        );
    }

    #[test]
    fn test_port_not_listening_message() {
        let err = FixtureError::PortNotListening {
            host: "localhost".to_string(),
            port: 32768,
            attempts: 10
        };
        assert!(err.to_string().contains("localhost:32768"));
        assert!(err.to_string().contains("10 attempts"));
    }

    #[test]
    fn test_client_error_is_transparent() {
        let err: FixtureError = InfluxClientError::Api {
            status: 401,
            message: "unauthorized access".to_string()
        }
        .into();
        assert_eq!(err.to_string(), "InfluxDB API returned 401: unauthorized access");
    }

    #[test]
    fn test_status_only_for_api_errors() {
        let api = InfluxClientError::Api {
            status: 404,
            message: "bucket not found".to_string()
        };
        let decode = InfluxClientError::Decode {
            what: "health".to_string(),
            reason: "eof".to_string()
        };
        let query = InfluxClientError::Query {
            message: "bucket \"nope\" not found".to_string()
        };
        assert_eq!(api.status(), Some(404));
        assert_eq!(decode.status(), None);
        assert_eq!(query.status(), None);
    }
}

//! InfluxDB test fixture.
//!
//! Starts an `influxdb` 2.x container through testcontainers, initializes it
//! in setup mode with a known bucket, organization, user and admin token,
//! waits until `/health` answers and the API port accepts connections, then
//! hands out the endpoint and pre-authenticated clients.
//!
//! - [`InfluxDb`]: builder and `testcontainers::Image` implementation
//! - [`InfluxDbContainer`]: started container, removed on drop
//! - [`InfluxDbClient`]: health, bucket lookup, line-protocol writes, Flux queries
//! - [`influxdb`]: one lazily started instance shared by a whole test binary

mod client;
mod container;
mod flux;
mod image;
mod influxdb;
pub mod logging;
mod point;

pub use client::{Bucket, HealthCheck, HealthStatus, InfluxDbClient, RetentionRule};
pub use container::InfluxDbContainer;
pub use errors::{ClientResult, FixtureError, FixtureResult, InfluxClientError};
pub use flux::{FluxRecord, FluxTable};
pub use image::{ImageReference, ImageVersion};
pub use influxdb::{
    DEFAULT_IMAGE_NAME, DEFAULT_STARTUP_TIMEOUT, DEFAULT_TAG, ENV_ADMIN_TOKEN, ENV_BUCKET, ENV_MODE,
    ENV_ORG, ENV_PASSWORD, ENV_USERNAME, HEALTH_PATH, INFLUXDB_PORT, InfluxDb, InfluxDbSettings
};
pub use point::{FieldValue, Point, WritePrecision};

use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::OnceCell;

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Process-unique name, e.g. for buckets or measurements in a shared instance.
pub fn unique_id(prefix: &str) -> String {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}", prefix, id)
}

static INFLUXDB: OnceCell<Option<InfluxDbContainer>> = OnceCell::const_new();

/// Shared InfluxDB instance configured from `INFLUXDB_TEST_*` variables,
/// including a settings file named by `INFLUXDB_TEST_CONFIG`.
///
/// Started on first use and reused by every test in the binary. Returns
/// `None` when the container cannot be started, e.g. without Docker.
pub async fn influxdb() -> Option<&'static InfluxDbContainer> {
    INFLUXDB
        .get_or_init(|| async {
            let started: FixtureResult<InfluxDbContainer> = async {
                let config = config::load_fixture_config().map_err(|e| {
                    FixtureError::InvalidConfiguration {
                        reason: e.to_string()
                    }
                })?;
                InfluxDb::from_config(&config)?.start().await
            }
            .await;

            match started {
                Ok(container) => Some(container),
                Err(e) => {
                    tracing::warn!("Failed to start InfluxDB container: {:?}", e);
                    None
                }
            }
        })
        .await
        .as_ref()
}

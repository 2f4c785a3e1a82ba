//! # InfluxDB image
//!
//! Builder for an `influxdb` 2.x container initialized in setup mode.
//!
//! ## Usage
//! ```rust,no_run
//! use influxdb_testing::InfluxDb;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let container = InfluxDb::default()
//!     .with_bucket("test-bucket")
//!     .with_organization("test-organization")
//!     .with_admin_token("test-admin-token")
//!     .start()
//!     .await?;
//!
//! let client = container.client()?;
//! assert!(client.find_bucket_by_name("test-bucket").await?.is_some());
//! # Ok(())
//! # }
//! ```
//!
//! Setters only exist on the builder. `start` consumes it, so a running
//! container's settings cannot drift from what it was provisioned with.

use crate::container::InfluxDbContainer;
use crate::image::{ImageReference, ImageVersion};
use config::InfluxDbConfig;
use errors::{FixtureError, FixtureResult};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::time::Duration;
use testcontainers::core::wait::HttpWaitStrategy;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{Image, ImageExt};
use validator::Validate;

/// Service port of the HTTP API inside the container.
pub const INFLUXDB_PORT: u16 = 8086;
pub const DEFAULT_IMAGE_NAME: &str = config::DEFAULT_IMAGE_NAME;
pub const DEFAULT_TAG: &str = config::DEFAULT_IMAGE_TAG;
pub const HEALTH_PATH: &str = "/health";
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(120);

pub const ENV_USERNAME: &str = "DOCKER_INFLUXDB_INIT_USERNAME";
pub const ENV_PASSWORD: &str = "DOCKER_INFLUXDB_INIT_PASSWORD";
pub const ENV_MODE: &str = "DOCKER_INFLUXDB_INIT_MODE";
pub const ENV_BUCKET: &str = "DOCKER_INFLUXDB_INIT_BUCKET";
pub const ENV_ORG: &str = "DOCKER_INFLUXDB_INIT_ORG";
pub const ENV_ADMIN_TOKEN: &str = "DOCKER_INFLUXDB_INIT_ADMIN_TOKEN";
const SETUP_MODE: &str = "setup";

const EXPOSED_PORTS: [ContainerPort; 1] = [ContainerPort::Tcp(INFLUXDB_PORT)];

/// First-run setup values passed to the image entrypoint.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct InfluxDbSettings {
    #[validate(length(min = 1))]
    pub bucket: String,
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[validate(length(min = 1))]
    pub organization: String,
    #[validate(length(min = 1))]
    pub admin_token: String
}

impl Default for InfluxDbSettings {
    fn default() -> Self {
        Self {
            bucket: config::DEFAULT_BUCKET.to_string(),
            username: config::DEFAULT_USERNAME.to_string(),
            password: config::DEFAULT_PASSWORD.to_string(),
            organization: config::DEFAULT_ORGANIZATION.to_string(),
            admin_token: config::DEFAULT_ADMIN_TOKEN.to_string()
        }
    }
}

/// InfluxDB container definition, not yet started.
#[derive(Debug, Clone)]
pub struct InfluxDb {
    image: ImageReference,
    name: String,
    tag: String,
    settings: InfluxDbSettings,
    startup_timeout: Duration
}

impl Default for InfluxDb {
    fn default() -> Self {
        Self::unchecked(default_image_name(), DEFAULT_TAG.to_string())
    }
}

impl InfluxDb {
    /// Use `image` instead of the default `influxdb:2.0.6`.
    ///
    /// Fails before anything is pulled when the image is not an `influxdb`
    /// image (or declared a compatible substitute for one), or when it is
    /// pinned by digest.
    pub fn new(image: ImageReference) -> FixtureResult<Self> {
        image.assert_compatible_with(&default_image_name())?;

        let tag = match image.version() {
            ImageVersion::Tag(tag) => tag.clone(),
            ImageVersion::Digest(_) => {
                return Err(FixtureError::InvalidImageReference {
                    reference: image.to_string(),
                    reason: "digest references cannot be started, pin a tag instead".to_string()
                });
            }
        };

        Ok(Self::unchecked(image, tag))
    }

    /// Parse and check an image reference such as `influxdb:2.7`.
    pub fn from_image(reference: &str) -> FixtureResult<Self> {
        Self::new(ImageReference::parse(reference)?)
    }

    /// The official `influxdb` image at another tag.
    ///
    /// The tag is checked like any other reference, so an empty or
    /// malformed tag fails here rather than at pull time.
    pub fn from_tag(tag: &str) -> FixtureResult<Self> {
        Self::from_image(&format!("{}:{}", DEFAULT_IMAGE_NAME, tag))
    }

    fn unchecked(image: ImageReference, tag: String) -> Self {
        Self {
            name: image.name(),
            tag,
            image,
            settings: InfluxDbSettings::default(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT
        }
    }

    /// Build from loaded configuration; the configuration is validated first.
    pub fn from_config(config: &InfluxDbConfig) -> FixtureResult<Self> {
        config::validate(config).map_err(|e| FixtureError::InvalidConfiguration {
            reason: e.to_string()
        })?;

        Ok(Self::from_image(&config.image)?
            .with_bucket(&config.bucket)
            .with_username(&config.username)
            .with_password(&config.password)
            .with_organization(&config.organization)
            .with_admin_token(&config.admin_token)
            .with_readiness_timeout(Duration::from_secs(config.startup_timeout_seconds)))
    }

    /// Bucket created at first start (`DOCKER_INFLUXDB_INIT_BUCKET`).
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.settings.bucket = bucket.into();
        self
    }

    /// Initial admin user (`DOCKER_INFLUXDB_INIT_USERNAME`).
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.settings.username = username.into();
        self
    }

    /// Password of the initial user (`DOCKER_INFLUXDB_INIT_PASSWORD`).
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.settings.password = password.into();
        self
    }

    /// Initial organization (`DOCKER_INFLUXDB_INIT_ORG`).
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.settings.organization = organization.into();
        self
    }

    /// Static token with full API access (`DOCKER_INFLUXDB_INIT_ADMIN_TOKEN`).
    pub fn with_admin_token(mut self, admin_token: impl Into<String>) -> Self {
        self.settings.admin_token = admin_token.into();
        self
    }

    /// How long the runtime waits for `/health` before giving up.
    pub fn with_readiness_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn settings(&self) -> &InfluxDbSettings {
        &self.settings
    }

    pub fn image(&self) -> &ImageReference {
        &self.image
    }

    pub fn readiness_timeout(&self) -> Duration {
        self.startup_timeout
    }

    /// Environment handed to the entrypoint, derived from current settings.
    pub fn environment(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            (ENV_USERNAME, self.settings.username.clone()),
            (ENV_PASSWORD, self.settings.password.clone()),
            (ENV_MODE, SETUP_MODE.to_string()),
            (ENV_BUCKET, self.settings.bucket.clone()),
            (ENV_ORG, self.settings.organization.clone()),
            (ENV_ADMIN_TOKEN, self.settings.admin_token.clone())
        ])
    }

    /// Start the container and wait until it is ready.
    ///
    /// Readiness means `/health` answered 200 and the mapped port accepts TCP
    /// connections. Failures are returned as-is; nothing is retried here.
    pub async fn start(self) -> FixtureResult<InfluxDbContainer> {
        self.settings
            .validate()
            .map_err(|e| FixtureError::InvalidConfiguration {
                reason: e.to_string()
            })?;

        let image = self.image.to_string();
        let timeout = self.startup_timeout;
        let env_keys: Vec<&'static str> = self.environment().into_keys().collect();
        tracing::debug!(
            image = %image,
            env = ?env_keys,
            timeout_secs = timeout.as_secs(),
            "starting InfluxDB container"
        );

        let request = self.with_startup_timeout(timeout);
        let container = AsyncRunner::start(request)
            .await
            .map_err(|e| FixtureError::StartupFailed {
                image: image.clone(),
                reason: e.to_string()
            })?;

        let started = InfluxDbContainer::from_started(container).await?;
        tracing::info!(
            image = %image,
            url = %started.url(),
            "InfluxDB fixture started"
        );
        Ok(started)
    }
}

impl Image for InfluxDb {
    fn name(&self) -> &str {
        &self.name
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn ready_conditions(&self) -> Vec<WaitFor> {
        vec![WaitFor::http(
            HttpWaitStrategy::new(HEALTH_PATH)
                .with_port(ContainerPort::Tcp(INFLUXDB_PORT))
                .with_expected_status_code(200_u16)
        )]
    }

    fn env_vars(
        &self
    ) -> impl IntoIterator<Item = (impl Into<Cow<'_, str>>, impl Into<Cow<'_, str>>)> {
        self.environment()
    }

    fn expose_ports(&self) -> &[ContainerPort] {
        &EXPOSED_PORTS
    }
}

fn default_image_name() -> ImageReference {
    ImageReference::new(DEFAULT_IMAGE_NAME, DEFAULT_TAG)
}

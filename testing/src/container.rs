//! Handle to a started InfluxDB container.

use crate::client::InfluxDbClient;
use crate::image::ImageReference;
use crate::influxdb::{INFLUXDB_PORT, InfluxDb, InfluxDbSettings};
use errors::{ClientResult, FixtureError, FixtureResult};
use std::collections::BTreeSet;
use std::time::Duration;
use testcontainers::ContainerAsync;
use tokio::net::TcpStream;

const PORT_CHECK_ATTEMPTS: u32 = 10;
const PORT_CHECK_INTERVAL: Duration = Duration::from_millis(200);

/// A running container plus the endpoint resolved when it started.
///
/// Host and mapped port are resolved once, so the accessors below never call
/// back into the container runtime. Dropping the handle removes the container.
#[derive(Debug)]
pub struct InfluxDbContainer {
    container: ContainerAsync<InfluxDb>,
    host: String,
    port: u16,
    url: String
}

impl InfluxDbContainer {
    pub(crate) async fn from_started(container: ContainerAsync<InfluxDb>) -> FixtureResult<Self> {
        let host = container
            .get_host()
            .await
            .map_err(|e| FixtureError::Runtime {
                operation: "get_host".to_string(),
                reason: e.to_string()
            })?
            .to_string();

        let port = container
            .get_host_port_ipv4(INFLUXDB_PORT)
            .await
            .map_err(|e| FixtureError::PortResolution {
                port: INFLUXDB_PORT,
                reason: e.to_string()
            })?;

        wait_for_listening_port(&host, port).await?;

        let url = format!("http://{}:{}", host, port);
        Ok(Self {
            container,
            host,
            port,
            url
        })
    }

    /// `http://host:port` of the InfluxDB HTTP API.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Host-side port bound to 8086.
    pub fn mapped_port(&self) -> u16 {
        self.port
    }

    /// Ports the readiness check probes on the host side.
    pub fn liveness_check_ports(&self) -> BTreeSet<u16> {
        BTreeSet::from([self.port])
    }

    /// Settings the container was provisioned with.
    pub fn settings(&self) -> &InfluxDbSettings {
        self.container.image().settings()
    }

    pub fn image(&self) -> &ImageReference {
        self.container.image().image()
    }

    pub fn id(&self) -> &str {
        self.container.id()
    }

    /// New client authenticated with the admin token, scoped to the
    /// configured organization and bucket.
    pub fn client(&self) -> ClientResult<InfluxDbClient> {
        let settings = self.settings();
        InfluxDbClient::new(
            self.url.clone(),
            &settings.admin_token,
            settings.organization.clone(),
            settings.bucket.clone()
        )
    }

    pub async fn is_running(&self) -> FixtureResult<bool> {
        self.container
            .is_running()
            .await
            .map_err(|e| FixtureError::Runtime {
                operation: "is_running".to_string(),
                reason: e.to_string()
            })
    }

    /// Stop and remove the container now instead of on drop.
    pub async fn rm(self) -> FixtureResult<()> {
        let id = self.container.id().to_string();
        self.container.rm().await.map_err(|e| FixtureError::Runtime {
            operation: format!("rm {}", id),
            reason: e.to_string()
        })
    }
}

async fn wait_for_listening_port(host: &str, port: u16) -> FixtureResult<()> {
    for attempt in 1..=PORT_CHECK_ATTEMPTS {
        match TcpStream::connect((host, port)).await {
            Ok(_) => return Ok(()),
            Err(e) => {
                tracing::debug!(host, port, attempt, error = %e, "port not accepting connections yet");
                if attempt < PORT_CHECK_ATTEMPTS {
                    tokio::time::sleep(PORT_CHECK_INTERVAL).await;
                }
            }
        }
    }

    Err(FixtureError::PortNotListening {
        host: host.to_string(),
        port,
        attempts: PORT_CHECK_ATTEMPTS
    })
}

//! Pre-authenticated InfluxDB v2 HTTP client handed out by a started container.

use crate::flux::{FluxTable, QueryRequest, parse_tables};
use crate::point::{Point, WritePrecision};
use errors::{ClientResult, InfluxClientError};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;

/// Overall state reported by `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Pass,
    Fail
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    #[serde(default)]
    pub message: Option<String>,
    pub status: HealthStatus,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub commit: Option<String>
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetentionRule {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "everySeconds", default)]
    pub every_seconds: i64
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Bucket {
    pub id: String,
    pub name: String,
    #[serde(rename = "orgID", default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "retentionRules", default)]
    pub retention_rules: Vec<RetentionRule>
}

#[derive(Debug, Deserialize)]
struct BucketsResponse {
    #[serde(default)]
    buckets: Vec<Bucket>
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>
}

/// Client bound to one organization, bucket and admin token.
///
/// Every container hands out a fresh instance; nothing is pooled between
/// them.
#[derive(Debug, Clone)]
pub struct InfluxDbClient {
    http: Client,
    url: String,
    organization: String,
    bucket: String
}

impl InfluxDbClient {
    pub fn new(
        url: impl Into<String>,
        token: &str,
        organization: impl Into<String>,
        bucket: impl Into<String>
    ) -> ClientResult<Self> {
        let url = url.into().trim_end_matches('/').to_string();
        Url::parse(&url).map_err(|e| InfluxClientError::Configuration {
            reason: format!("invalid url {}: {}", url, e)
        })?;

        let mut auth = HeaderValue::from_str(&format!("Token {}", token)).map_err(|e| {
            InfluxClientError::Configuration {
                reason: format!("invalid token: {}", e)
            }
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| InfluxClientError::Configuration {
                reason: e.to_string()
            })?;

        Ok(Self {
            http,
            url,
            organization: organization.into(),
            bucket: bucket.into()
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    /// Bucket used by [`write_point`](Self::write_point).
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// `GET /health`. A failing server answers 503 with a `fail` body,
    /// which is returned as a value rather than an error.
    pub async fn health(&self) -> ClientResult<HealthCheck> {
        let url = self.endpoint("/health", &[])?;
        let response = self.send(self.http.get(url.clone()), &url).await?;

        match response.status() {
            status if status.is_success() || status == StatusCode::SERVICE_UNAVAILABLE => {
                decode_json(response, "health check").await
            }
            _ => Err(api_error(response).await)
        }
    }

    /// `GET /ready`: true once the server accepts queries and writes.
    pub async fn ready(&self) -> ClientResult<bool> {
        let url = self.endpoint("/ready", &[])?;
        let response = self.send(self.http.get(url.clone()), &url).await?;
        Ok(response.status().is_success())
    }

    /// Look up a bucket in the client's organization.
    ///
    /// A missing bucket is `None`. An unknown organization is an API error.
    pub async fn find_bucket_by_name(&self, name: &str) -> ClientResult<Option<Bucket>> {
        let url = self.endpoint(
            "/api/v2/buckets",
            &[("name", name), ("org", self.organization.as_str())]
        )?;
        let response = self.send(self.http.get(url.clone()), &url).await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body: BucketsResponse = decode_json(response, "bucket list").await?;
        Ok(body.buckets.into_iter().find(|bucket| bucket.name == name))
    }

    pub async fn write_point(&self, point: &Point) -> ClientResult<()> {
        self.write_points(std::slice::from_ref(point)).await
    }

    /// Write a batch into the client's bucket.
    ///
    /// All timestamped points in one batch must share a precision.
    pub async fn write_points(&self, points: &[Point]) -> ClientResult<()> {
        if points.is_empty() {
            return Ok(());
        }

        let mut precisions = points.iter().filter_map(Point::precision);
        let precision = precisions.next().unwrap_or_default();
        if precisions.any(|other| other != precision) {
            return Err(InfluxClientError::InvalidPoint {
                reason: "points in one batch use different precisions".to_string()
            });
        }

        let body = points
            .iter()
            .map(Point::to_line_protocol)
            .collect::<ClientResult<Vec<_>>>()?
            .join("\n");

        let url = self.write_endpoint(precision)?;
        tracing::debug!(bucket = %self.bucket, points = points.len(), "writing points");

        let request = self
            .http
            .post(url.clone())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body);
        let response = self.send(request, &url).await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(api_error(response).await)
        }
    }

    /// Run a Flux query in the client's organization.
    pub async fn query(&self, flux: &str) -> ClientResult<Vec<FluxTable>> {
        let url = self.endpoint("/api/v2/query", &[("org", self.organization.as_str())])?;
        tracing::debug!(query = flux, "running flux query");

        let request = self
            .http
            .post(url.clone())
            .header(ACCEPT, "application/csv")
            .json(&QueryRequest::flux(flux));
        let response = self.send(request, &url).await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| InfluxClientError::Decode {
                what: "query response".to_string(),
                reason: e.to_string()
            })?;
        parse_tables(&body)
    }

    fn write_endpoint(&self, precision: WritePrecision) -> ClientResult<Url> {
        self.endpoint(
            "/api/v2/write",
            &[
                ("org", self.organization.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", precision.as_str())
            ]
        )
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> ClientResult<Url> {
        let raw = format!("{}{}", self.url, path);
        let parsed = if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        };
        parsed.map_err(|e| InfluxClientError::Configuration {
            reason: format!("invalid endpoint {}: {}", raw, e)
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &Url) -> ClientResult<Response> {
        request
            .send()
            .await
            .map_err(|e| InfluxClientError::Connection {
                url: url.to_string(),
                reason: e.to_string()
            })
    }
}

async fn decode_json<T: serde::de::DeserializeOwned>(
    response: Response,
    what: &str
) -> ClientResult<T> {
    response.json::<T>().await.map_err(|e| InfluxClientError::Decode {
        what: what.to_string(),
        reason: e.to_string()
    })
}

async fn api_error(response: Response) -> InfluxClientError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|parsed| parsed.message)
        .unwrap_or(body);

    InfluxClientError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = InfluxDbClient::new("http://localhost:8086/", "t", "org", "b").unwrap();
        assert_eq!(client.url(), "http://localhost:8086");
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let err = InfluxDbClient::new("not a url", "t", "org", "b").unwrap_err();
        assert!(matches!(err, InfluxClientError::Configuration { .. }));
    }

    #[test]
    fn test_token_with_newline_is_rejected() {
        let err = InfluxDbClient::new("http://localhost:8086", "bad\ntoken", "org", "b").unwrap_err();
        assert!(err.to_string().contains("invalid token"));
    }

    #[test]
    fn test_write_endpoint_encodes_parameters() {
        let client =
            InfluxDbClient::new("http://localhost:8086", "t", "my org", "init.bucket").unwrap();
        let url = client.write_endpoint(WritePrecision::Ms).unwrap();
        assert_eq!(url.path(), "/api/v2/write");
        assert_eq!(
            url.query(),
            Some("org=my+org&bucket=init.bucket&precision=ms")
        );
    }

    #[test]
    fn test_health_body_decodes() {
        let health: HealthCheck = serde_json::from_str(
            r#"{"name":"influxdb","message":"ready for queries and writes","status":"pass","checks":[],"version":"2.0.6","commit":"4db98b4c9a"}"#
        )
        .unwrap();
        assert_eq!(health.status, HealthStatus::Pass);
        assert_eq!(health.version.as_deref(), Some("2.0.6"));
    }
}

//! HTTP transport
//!
//! Sends each payload as the body of one request. Any 2xx status is a
//! success; other statuses, timeouts and connection errors are failures,
//! which hand the payload to the next transport in the chain.
//!
//! The underlying client pools connections, so consecutive flushes reuse
//! a kept-alive connection.

use crate::core::{HttpTransportConfig, Payload, Result, TelemetryError, Transport};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use std::sync::Arc;
use std::time::Duration;

/// Turns a payload into a request body
pub type EncodeFn = Arc<dyn Fn(&Payload) -> Result<Vec<u8>> + Send + Sync>;

const COMPONENT: &str = "http_transport";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport that delivers payloads to an HTTP collector
///
/// # Example
///
/// ```no_run
/// use client_telemetry::transports::HttpTransport;
/// use client_telemetry::Publisher;
///
/// let transport = HttpTransport::builder()
///     .url("https://collector.example.com/v1/batch")
///     .header("x-api-key", "secret")
///     .build()
///     .unwrap();
///
/// let publisher = Publisher::builder().transport(transport).build().unwrap();
/// # drop(publisher);
/// ```
pub struct HttpTransport {
    client: Client,
    url: Url,
    method: Method,
    headers: HeaderMap,
    encode: EncodeFn,
    name: String,
}

impl HttpTransport {
    #[must_use]
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::new()
    }

    /// Create a transport from configuration
    pub fn from_config(config: &HttpTransportConfig) -> Result<Self> {
        config
            .headers
            .iter()
            .fold(
                HttpTransportBuilder::new()
                    .url(config.url.as_str())
                    .method(config.method.as_str())
                    .timeout(config.timeout()),
                |builder, (name, value)| builder.header(name.as_str(), value.as_str()),
            )
            .build()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn process(&self, payload: &Payload) -> Result<()> {
        let body = (self.encode)(payload)?;

        let response = self
            .client
            .request(self.method.clone(), self.url.clone())
            .headers(self.headers.clone())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TelemetryError::transport(
                &self.name,
                format!("collector responded with {}", status),
            ))
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`HttpTransport`]
pub struct HttpTransportBuilder {
    url: Option<String>,
    method: String,
    headers: Vec<(String, String)>,
    encode: Option<EncodeFn>,
    timeout: Duration,
    name: String,
}

impl HttpTransportBuilder {
    pub fn new() -> Self {
        Self {
            url: None,
            method: "POST".to_string(),
            headers: Vec::new(),
            encode: None,
            timeout: DEFAULT_TIMEOUT,
            name: "http".to_string(),
        }
    }

    /// Collector endpoint. Required.
    #[must_use = "builder methods return a new value"]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Request method, `POST` by default
    #[must_use = "builder methods return a new value"]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Add a request header. Replaces an earlier header of the same name.
    #[must_use = "builder methods return a new value"]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the body encoder. The default is compact JSON.
    #[must_use = "builder methods return a new value"]
    pub fn encode<F>(mut self, encode: F) -> Self
    where
        F: Fn(&Payload) -> Result<Vec<u8>> + Send + Sync + 'static,
    {
        self.encode = Some(Arc::new(encode));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Build the transport
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` when the URL is missing or unparseable, or a
    /// method or header is malformed.
    pub fn build(self) -> Result<HttpTransport> {
        let raw_url = self
            .url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| TelemetryError::config(COMPONENT, "url must be specified"))?;
        let url = Url::parse(&raw_url).map_err(|e| {
            TelemetryError::config(COMPONENT, format!("invalid url '{}': {}", raw_url, e))
        })?;

        let method = Method::from_bytes(self.method.to_uppercase().as_bytes()).map_err(|e| {
            TelemetryError::config(COMPONENT, format!("invalid method '{}': {}", self.method, e))
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                TelemetryError::config(COMPONENT, format!("invalid header name '{}': {}", name, e))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                TelemetryError::config(COMPONENT, format!("invalid value for header '{}': {}", name, e))
            })?;
            headers.insert(header_name, header_value);
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| {
                TelemetryError::config(COMPONENT, format!("failed to create HTTP client: {}", e))
            })?;

        let encode: EncodeFn = match self.encode {
            Some(encode) => encode,
            None => Arc::new(encode_json),
        };

        Ok(HttpTransport {
            client,
            url,
            method,
            headers,
            encode,
            name: self.name,
        })
    }
}

fn encode_json(payload: &Payload) -> Result<Vec<u8>> {
    Ok(payload.to_json_bytes()?)
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

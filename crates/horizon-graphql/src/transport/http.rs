//! reqwest-backed transport.

use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use reqwest::redirect::Policy;

use super::{Transport, TransportRequest, TransportResponse};
use crate::error::TransportError;

/// Settings for an [`HttpTransport`].
///
/// GraphQL calls are single POSTs to one endpoint, so the settings cover
/// only what shapes that exchange: how long to wait, whether the endpoint may
/// redirect, and what every request carries.
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Upper bound for a whole exchange, from connect to the last body byte.
    pub timeout: Duration,
    /// Upper bound for establishing the connection.
    pub connect_timeout: Duration,
    /// Redirect hops allowed before the call fails; `0` disables redirects.
    pub max_redirects: usize,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
    /// Headers sent with every request, below the call's own headers.
    pub default_headers: ::http::HeaderMap,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            max_redirects: 10,
            user_agent: concat!("HorizonGraphQL/", env!("CARGO_PKG_VERSION"), " (Rust)").into(),
            default_headers: ::http::HeaderMap::new(),
        }
    }
}

impl HttpTransportConfig {
    fn redirect_policy(&self) -> Policy {
        match self.max_redirects {
            0 => Policy::none(),
            hops => Policy::limited(hops),
        }
    }

    fn client(&self) -> Result<reqwest::Client, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .redirect(self.redirect_policy())
            .user_agent(self.user_agent.as_str())
            .default_headers(self.default_headers.clone())
            .build()?;
        Ok(client)
    }
}

/// Builder for an [`HttpTransport`].
#[derive(Default)]
pub struct HttpTransportBuilder {
    config: HttpTransportConfig,
}

impl HttpTransportBuilder {
    /// Start from [`HttpTransportConfig::default`].
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn max_redirects(mut self, hops: usize) -> Self {
        self.config.max_redirects = hops;
        self
    }

    /// Fail calls whose endpoint answers with a redirect.
    pub fn no_redirects(self) -> Self {
        self.max_redirects(0)
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add a header sent with every request.
    ///
    /// Headers set on the client or by the call itself take precedence.
    pub fn default_header(
        mut self,
        name: impl TryInto<::http::HeaderName>,
        value: impl TryInto<::http::HeaderValue>,
    ) -> Result<Self, TransportError> {
        let name = name
            .try_into()
            .map_err(|_| TransportError::InvalidHeader("Invalid header name".to_string()))?;
        let value = value
            .try_into()
            .map_err(|_| TransportError::InvalidHeader("Invalid header value".to_string()))?;
        self.config.default_headers.insert(name, value);
        Ok(self)
    }

    /// Build the transport.
    pub fn build(self) -> Result<HttpTransport, TransportError> {
        let client = self.config.client()?;
        tracing::debug!(
            target: "horizon_graphql::transport",
            timeout_ms = self.config.timeout.as_millis() as u64,
            max_redirects = self.config.max_redirects,
            "HTTP transport ready"
        );
        Ok(HttpTransport {
            inner: Arc::new(HttpTransportInner {
                client,
                config: Some(self.config),
            }),
        })
    }
}

struct HttpTransportInner {
    client: reqwest::Client,
    // None when wrapping a caller-supplied client.
    config: Option<HttpTransportConfig>,
}

/// A [`Transport`] that POSTs over HTTP with reqwest.
///
/// The transport is cheaply cloneable. Clones share the same connection pool.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use horizon_graphql::HttpTransport;
///
/// let transport = HttpTransport::builder()
///     .timeout(Duration::from_secs(5))
///     .default_header("x-api-key", "secret")?
///     .build()?;
/// ```
#[derive(Clone)]
pub struct HttpTransport {
    inner: Arc<HttpTransportInner>,
}

impl HttpTransport {
    /// Create a transport with default configuration.
    pub fn new() -> Result<Self, TransportError> {
        HttpTransportBuilder::new().build()
    }

    /// Create a builder for configuring a new transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::new()
    }

    /// Wrap an already-configured reqwest client.
    pub fn from_reqwest(client: reqwest::Client) -> Self {
        Self {
            inner: Arc::new(HttpTransportInner {
                client,
                config: None,
            }),
        }
    }

    /// Get the transport's configuration, if it was built by this crate.
    pub fn config(&self) -> Option<&HttpTransportConfig> {
        self.inner.config.as_ref()
    }
}

impl Transport for HttpTransport {
    fn execute(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'static, Result<TransportResponse, TransportError>> {
        let client = self.inner.client.clone();
        async move {
            tracing::debug!(
                target: "horizon_graphql::transport",
                url = %request.url,
                bytes = request.body.len(),
                "POST"
            );

            let response = client
                .post(request.url)
                .headers(request.headers)
                .body(request.body)
                .send()
                .await?;

            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response.bytes().await?;

            tracing::debug!(
                target: "horizon_graphql::transport",
                status,
                bytes = body.len(),
                "response received"
            );

            Ok(TransportResponse {
                status,
                headers,
                body,
            })
        }
        .boxed()
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("config", &self.inner.config)
            .finish()
    }
}

//! Client configuration and the call factory.

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::adapter::ResultAdapter;
use crate::call::RawCall;
use crate::codec::Codec;
use crate::error::ConfigurationError;
use crate::operation::Operation;
use crate::scalar::{CustomTypeAdapter, ScalarRegistry, ScalarType};
use crate::transport::Transport;

/// A server endpoint, either already parsed or still text.
///
/// Text endpoints are parsed when the client is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// A parsed URL.
    Parsed(Url),
    /// A URL string awaiting parsing.
    Text(String),
}

impl Endpoint {
    /// Resolve to an absolute URL with a host.
    pub fn resolve(&self) -> Result<Url, ConfigurationError> {
        let url = match self {
            Self::Parsed(url) => url.clone(),
            Self::Text(text) => {
                Url::parse(text).map_err(|e| ConfigurationError::invalid_endpoint(text, e))?
            }
        };
        if url.cannot_be_a_base() || !url.has_host() {
            return Err(ConfigurationError::invalid_endpoint(
                url.as_str(),
                "URL must be absolute and have a host",
            ));
        }
        Ok(url)
    }
}

impl From<Url> for Endpoint {
    fn from(url: Url) -> Self {
        Self::Parsed(url)
    }
}

impl From<&Url> for Endpoint {
    fn from(url: &Url) -> Self {
        Self::Parsed(url.clone())
    }
}

impl From<String> for Endpoint {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Endpoint {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// Builder for a [`GraphQLClient`].
///
/// Setters never fail; every problem is reported by [`build`](Self::build).
/// The builder can be cloned or reused to build several clients that differ
/// only in the fields changed between builds.
pub struct GraphQLClientBuilder<A> {
    transport: Option<Arc<dyn Transport>>,
    endpoint: Option<Endpoint>,
    adapter: Option<A>,
    registry: ScalarRegistry,
    default_headers: ::http::HeaderMap,
    // Rejected adapter registrations by scalar name; a later valid one clears it.
    scalar_faults: Vec<(String, ConfigurationError)>,
    // First header fault recorded by a setter, reported at build time.
    pending_error: Option<ConfigurationError>,
}

impl<A> Default for GraphQLClientBuilder<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Clone> Clone for GraphQLClientBuilder<A> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            endpoint: self.endpoint.clone(),
            adapter: self.adapter.clone(),
            registry: self.registry.clone(),
            default_headers: self.default_headers.clone(),
            scalar_faults: self.scalar_faults.clone(),
            pending_error: self.pending_error.clone(),
        }
    }
}

impl<A> GraphQLClientBuilder<A> {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            transport: None,
            endpoint: None,
            adapter: None,
            registry: ScalarRegistry::new(),
            default_headers: ::http::HeaderMap::new(),
            scalar_faults: Vec::new(),
            pending_error: None,
        }
    }

    /// Set the transport that carries requests.
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Set the server endpoint, as a [`Url`] or a string.
    pub fn server_url(mut self, endpoint: impl Into<Endpoint>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the result adapter that wraps every call.
    pub fn result_adapter(mut self, adapter: A) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Register the adapter for a custom scalar, replacing any earlier one.
    ///
    /// An adapter whose type does not match the scalar is rejected and
    /// reported by [`build`](Self::build), unless a matching adapter for the
    /// same scalar is registered afterwards.
    pub fn custom_type_adapter<T, C>(mut self, scalar: ScalarType, adapter: C) -> Self
    where
        T: Send + 'static,
        C: CustomTypeAdapter<T>,
    {
        let name = scalar.name().to_string();
        self.scalar_faults.retain(|(faulted, _)| *faulted != name);
        if let Err(err) = self.registry.register(scalar, adapter) {
            self.scalar_faults.push((name, err));
        }
        self
    }

    /// Declare a scalar the client's operations use.
    ///
    /// Building fails unless an adapter is also registered for it.
    pub fn scalar_type(mut self, scalar: ScalarType) -> Self {
        self.registry.declare(scalar);
        self
    }

    /// Add a header sent with every call.
    pub fn header(
        mut self,
        name: impl TryInto<::http::HeaderName>,
        value: impl TryInto<::http::HeaderValue>,
    ) -> Self {
        let name = name.try_into();
        let value = value.try_into();
        match (name, value) {
            (Ok(name), Ok(value)) => {
                self.default_headers.insert(name, value);
            }
            (Err(_), _) => {
                self.record(ConfigurationError::InvalidHeader("Invalid header name".into()))
            }
            (_, Err(_)) => {
                self.record(ConfigurationError::InvalidHeader("Invalid header value".into()))
            }
        }
        self
    }

    /// Set bearer token authentication.
    pub fn bearer_auth(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.header(::http::header::AUTHORIZATION, value)
    }

    /// The scalars registered or declared so far.
    pub fn scalar_registry(&self) -> &ScalarRegistry {
        &self.registry
    }

    fn record(&mut self, err: ConfigurationError) {
        self.pending_error.get_or_insert(err);
    }
}

impl<A: ResultAdapter + Clone> GraphQLClientBuilder<A> {
    /// Validate the configuration and freeze it into a client.
    ///
    /// Required fields are checked in a fixed order (transport, server URL,
    /// result adapter) and the first missing one is reported. Then the
    /// endpoint is parsed, setter faults are reported, and the codec is
    /// assembled from the registered scalars.
    pub fn build(&self) -> Result<GraphQLClient<A>, ConfigurationError> {
        let transport = self
            .transport
            .clone()
            .ok_or(ConfigurationError::MissingField("transport"))?;
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or(ConfigurationError::MissingField("server_url"))?;
        let adapter = self
            .adapter
            .clone()
            .ok_or(ConfigurationError::MissingField("result_adapter"))?;

        let endpoint = endpoint.resolve()?;
        if let Some(err) = &self.pending_error {
            return Err(err.clone());
        }
        if let Some((_, err)) = self.scalar_faults.first() {
            return Err(err.clone());
        }
        let codec = Codec::build(&self.registry)?;

        tracing::debug!(
            target: "horizon_graphql::client",
            endpoint = %endpoint,
            scalars = codec.scalar_types().len(),
            "client configured"
        );

        Ok(GraphQLClient {
            inner: Arc::new(ClientInner {
                endpoint,
                transport,
                codec: Arc::new(codec),
                registry: self.registry.clone(),
                adapter,
                default_headers: Arc::new(self.default_headers.clone()),
            }),
        })
    }
}

impl<A> fmt::Debug for GraphQLClientBuilder<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphQLClientBuilder")
            .field("endpoint", &self.endpoint)
            .field("has_transport", &self.transport.is_some())
            .field("has_result_adapter", &self.adapter.is_some())
            .field("registry", &self.registry)
            .finish()
    }
}

struct ClientInner<A> {
    endpoint: Url,
    transport: Arc<dyn Transport>,
    codec: Arc<Codec>,
    registry: ScalarRegistry,
    adapter: A,
    default_headers: Arc<::http::HeaderMap>,
}

/// A frozen GraphQL client configuration and call factory.
///
/// The client is cheaply cloneable and can be shared across threads. Every
/// call it creates is independent of every other.
///
/// # Example
///
/// ```ignore
/// use horizon_graphql::{FutureAdapter, GraphQLClient, HttpTransport};
///
/// let client = GraphQLClient::builder()
///     .transport(HttpTransport::new()?)
///     .server_url("https://api.example.com/graphql")
///     .result_adapter(FutureAdapter)
///     .custom_type_adapter(date, date_adapter)
///     .build()?;
///
/// let response = client.new_call(UserQuery { id: "42".into() }).await?;
/// ```
pub struct GraphQLClient<A> {
    inner: Arc<ClientInner<A>>,
}

impl<A> Clone for GraphQLClient<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: ResultAdapter> GraphQLClient<A> {
    /// Create a builder for configuring a new client.
    pub fn builder() -> GraphQLClientBuilder<A> {
        GraphQLClientBuilder::new()
    }

    /// Create a call for `operation` and hand it to the result adapter.
    pub fn new_call<O: Operation>(&self, operation: O) -> A::Output<O::Data> {
        let call = self.raw_call(operation);
        call.mark_adapted();
        self.inner.adapter.adapt(call)
    }

    /// Create a call for `operation` without adapting it.
    pub fn raw_call<O: Operation>(&self, operation: O) -> RawCall<O::Data> {
        let call = RawCall::new(
            Arc::new(operation),
            self.inner.endpoint.clone(),
            self.inner.transport.clone(),
            self.inner.codec.clone(),
            self.inner.default_headers.clone(),
        );
        tracing::debug!(
            target: "horizon_graphql::client",
            id = %call.id(),
            operation = call.operation_name(),
            "call created"
        );
        call
    }
}

impl<A> GraphQLClient<A> {
    /// The server endpoint.
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// The codec shared by every call.
    pub fn codec(&self) -> &Codec {
        &self.inner.codec
    }

    /// The registered custom scalars.
    pub fn scalar_registry(&self) -> &ScalarRegistry {
        &self.inner.registry
    }

    /// The result adapter.
    pub fn result_adapter(&self) -> &A {
        &self.inner.adapter
    }

    /// Headers sent with every call.
    pub fn default_headers(&self) -> &::http::HeaderMap {
        &self.inner.default_headers
    }
}

impl<A: Clone> GraphQLClient<A> {
    /// Create a builder pre-populated with this client's configuration.
    pub fn to_builder(&self) -> GraphQLClientBuilder<A> {
        GraphQLClientBuilder {
            transport: Some(self.inner.transport.clone()),
            endpoint: Some(Endpoint::Parsed(self.inner.endpoint.clone())),
            adapter: Some(self.inner.adapter.clone()),
            registry: self.inner.registry.clone(),
            default_headers: (*self.inner.default_headers).clone(),
            scalar_faults: Vec::new(),
            pending_error: None,
        }
    }
}

impl<A> fmt::Debug for GraphQLClient<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphQLClient")
            .field("endpoint", &self.inner.endpoint.as_str())
            .field("codec", &self.inner.codec)
            .field("adapter", &std::any::type_name::<A>())
            .finish()
    }
}

/// Anything that turns operations into adapted calls.
///
/// Implemented by [`GraphQLClient`]; code that only creates calls can depend
/// on this trait and be handed a stub in tests.
pub trait CallFactory {
    /// The adapter applied to every call.
    type Adapter: ResultAdapter;

    /// Create and adapt a call for `operation`.
    fn new_call<O: Operation>(
        &self,
        operation: O,
    ) -> <Self::Adapter as ResultAdapter>::Output<O::Data>;
}

impl<A: ResultAdapter> CallFactory for GraphQLClient<A> {
    type Adapter = A;

    fn new_call<O: Operation>(&self, operation: O) -> A::Output<O::Data> {
        GraphQLClient::new_call(self, operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::RawCallAdapter;
    use crate::error::TransportError;
    use crate::transport::{TransportRequest, TransportResponse};
    use futures_util::future::BoxFuture;

    struct Unreachable;

    impl Transport for Unreachable {
        fn execute(
            &self,
            _request: TransportRequest,
        ) -> BoxFuture<'static, Result<TransportResponse, TransportError>> {
            Box::pin(async { Err(TransportError::Connection("unreachable".into())) })
        }
    }

    fn complete() -> GraphQLClientBuilder<RawCallAdapter> {
        GraphQLClientBuilder::new()
            .transport(Unreachable)
            .server_url("https://api.example.com/graphql")
            .result_adapter(RawCallAdapter)
    }

    #[test]
    fn test_endpoint_resolution() {
        let url = Endpoint::from("https://api.example.com/graphql")
            .resolve()
            .unwrap();
        assert_eq!(url.host_str(), Some("api.example.com"));

        assert!(matches!(
            Endpoint::from("not a url").resolve(),
            Err(ConfigurationError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            Endpoint::from("mailto:ops@example.com").resolve(),
            Err(ConfigurationError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_missing_fields_in_order() {
        let empty = GraphQLClientBuilder::<RawCallAdapter>::new();
        assert_eq!(
            empty.build().unwrap_err(),
            ConfigurationError::MissingField("transport")
        );

        let no_url = GraphQLClientBuilder::<RawCallAdapter>::new()
            .transport(Unreachable)
            .result_adapter(RawCallAdapter);
        assert_eq!(
            no_url.build().unwrap_err(),
            ConfigurationError::MissingField("server_url")
        );

        let no_adapter = GraphQLClientBuilder::<RawCallAdapter>::new()
            .transport(Unreachable)
            .server_url("https://api.example.com/graphql");
        assert_eq!(
            no_adapter.build().unwrap_err(),
            ConfigurationError::MissingField("result_adapter")
        );
    }

    #[test]
    fn test_invalid_header_reported_at_build() {
        let builder = complete().header("bad header", "x");
        assert!(matches!(
            builder.build(),
            Err(ConfigurationError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_builder_reuse() {
        let builder = complete().bearer_auth("token");
        let first = builder.build().unwrap();
        let second = builder
            .clone()
            .server_url("https://other.example.com/graphql")
            .build()
            .unwrap();

        assert_eq!(first.endpoint().host_str(), Some("api.example.com"));
        assert_eq!(second.endpoint().host_str(), Some("other.example.com"));
        assert_eq!(
            second.default_headers()[::http::header::AUTHORIZATION],
            "Bearer token"
        );
    }

    #[test]
    fn test_to_builder_round_trip() {
        let client = complete().header("x-client", "tests").build().unwrap();
        let rebuilt = client.to_builder().build().unwrap();

        assert_eq!(rebuilt.endpoint(), client.endpoint());
        assert_eq!(rebuilt.default_headers()["x-client"], "tests");
    }
}

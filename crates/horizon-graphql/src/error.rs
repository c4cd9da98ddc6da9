//! Error types for GraphQL call construction and execution.
//!
//! Errors are split by the phase in which they surface:
//!
//! - [`ConfigurationError`]: raised synchronously by the client builder.
//! - [`EncodeError`] / [`DecodeError`]: raised by the codec while writing
//!   variables or reading a response.
//! - [`TransportError`]: raised by a [`Transport`](crate::Transport).
//! - [`CallError`]: the per-call result channel that carries all of the
//!   above (except configuration faults) to the caller.

use crate::response::GraphQLError;

/// Boxed error returned by custom scalar decode functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A build-time configuration fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// A required builder field was never set.
    #[error("{0} is null")]
    MissingField(&'static str),

    /// The endpoint could not be parsed as an absolute URL.
    #[error("Invalid server URL '{url}': {message}")]
    InvalidEndpoint { url: String, message: String },

    /// A custom scalar adapter was registered for a different domain type than
    /// the scalar declares.
    #[error("Adapter for scalar '{scalar}' handles {actual}, but the scalar maps to {expected}")]
    ScalarTypeMismatch {
        scalar: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A scalar was declared but no adapter was registered for it.
    #[error("No custom type adapter registered for scalar '{scalar}'")]
    MissingScalarAdapter { scalar: String },

    /// A default header name or value was invalid.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

impl ConfigurationError {
    /// Create an invalid-endpoint error.
    pub fn invalid_endpoint(url: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            message: message.to_string(),
        }
    }
}

/// A value in a response could not be turned into its domain type.
///
/// `path` is the dotted JSON path of the offending value (`"user.born"`,
/// `"users[2].id"`); it is empty for the response root.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// A custom scalar was not transmitted as a JSON string.
    #[error("Expected a string for scalar '{scalar}' at '{path}', found {found}")]
    NotAString {
        scalar: String,
        path: String,
        found: &'static str,
    },

    /// The scalar's decode function rejected the wire string.
    #[error("Failed to decode scalar '{scalar}' at '{path}': {source}")]
    Scalar {
        scalar: String,
        path: String,
        #[source]
        source: BoxError,
    },

    /// The codec has no adapter for the requested scalar.
    #[error("Unknown scalar '{scalar}' at '{path}'")]
    UnknownScalar { scalar: String, path: String },

    /// The caller asked for a different domain type than the scalar's adapter produces.
    #[error("Scalar '{scalar}' decodes to {registered}, not {requested}")]
    ScalarTypeMismatch {
        scalar: String,
        registered: &'static str,
        requested: &'static str,
    },

    /// A primitive or structural value had the wrong JSON shape.
    #[error("Expected {expected} at '{path}', found {found}")]
    UnexpectedType {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A required field was absent or null.
    #[error("Missing required field '{path}'")]
    MissingField { path: String },

    /// Standard JSON (de)serialization failed.
    #[error("JSON error at '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    /// Create a missing-field error.
    pub fn missing(path: impl Into<String>) -> Self {
        Self::MissingField { path: path.into() }
    }

    /// Get the JSON path of the failure, if the variant carries one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::NotAString { path, .. }
            | Self::Scalar { path, .. }
            | Self::UnknownScalar { path, .. }
            | Self::UnexpectedType { path, .. }
            | Self::MissingField { path }
            | Self::Json { path, .. } => Some(path.as_str()),
            Self::ScalarTypeMismatch { .. } => None,
        }
    }
}

/// A variable could not be written to the request.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The codec has no adapter for the scalar.
    #[error("Unknown scalar '{scalar}' for variable '{variable}'")]
    UnknownScalar { scalar: String, variable: String },

    /// The value's Rust type does not match the scalar's adapter.
    #[error("Variable '{variable}' holds {actual}, but scalar '{scalar}' expects {expected}")]
    ScalarTypeMismatch {
        scalar: String,
        variable: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A plain variable could not be serialized.
    #[error("Variable '{variable}' could not be serialized: {message}")]
    InvalidVariable { variable: String, message: String },

    /// The request envelope could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A transport-level fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request failed for a reason not covered below.
    #[error("HTTP request error: {0}")]
    Request(String),
    /// Request timed out.
    #[error("Request timed out")]
    Timeout,
    /// Connection refused or failed.
    #[error("Connection error: {0}")]
    Connection(String),
    /// Redirect limit exceeded.
    #[error("Too many redirects")]
    TooManyRedirects,
    /// Invalid header name or value.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    /// The response body could not be read.
    #[error("Invalid response body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_redirect() {
            Self::TooManyRedirects
        } else if err.is_body() || err.is_decode() {
            Self::Body(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Everything that can go wrong once a call has been created.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// The transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}{}", body_suffix(.body))]
    HttpStatus {
        /// The HTTP status code.
        status: u16,
        /// Response body, if it was readable text.
        body: Option<String>,
    },

    /// Variables could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The response could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The server reported GraphQL errors.
    #[error("GraphQL error: {}", join_messages(.0))]
    GraphQL(Vec<GraphQLError>),

    /// The call was canceled through its [`CallHandle`](crate::CallHandle).
    #[error("Call was canceled")]
    Canceled,

    /// The background task driving the call panicked or was aborted.
    #[error("Call task failed: {0}")]
    Task(String),
}

impl CallError {
    /// Check if this error is a cancellation.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

fn body_suffix(body: &Option<String>) -> String {
    match body {
        Some(body) => format!(": {body}"),
        None => String::new(),
    }
}

fn join_messages(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        assert_eq!(
            ConfigurationError::MissingField("transport").to_string(),
            "transport is null"
        );
    }

    #[test]
    fn test_http_status_message() {
        let err = CallError::HttpStatus {
            status: 502,
            body: Some("bad gateway".into()),
        };
        assert_eq!(err.to_string(), "HTTP 502: bad gateway");

        let err = CallError::HttpStatus {
            status: 404,
            body: None,
        };
        assert_eq!(err.to_string(), "HTTP 404");
    }

    #[test]
    fn test_graphql_error_message() {
        let err = CallError::GraphQL(vec![
            GraphQLError::new("first"),
            GraphQLError::new("second"),
        ]);
        assert_eq!(err.to_string(), "GraphQL error: first; second");
    }

    #[test]
    fn test_decode_error_path() {
        let err = DecodeError::missing("user.name");
        assert_eq!(err.path(), Some("user.name"));
        assert_eq!(err.to_string(), "Missing required field 'user.name'");
    }
}

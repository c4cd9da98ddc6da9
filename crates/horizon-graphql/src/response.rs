//! GraphQL response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::CallError;

/// A GraphQL error returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    /// The error message.
    pub message: String,

    /// Locations in the document where the error occurred.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<GraphQLLocation>,

    /// Path to the field that caused the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,

    /// Additional error metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphQLError {
    /// Create an error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: None,
            extensions: None,
        }
    }
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref path) = self.path {
            write!(f, " (at ")?;
            for (i, segment) in path.iter().enumerate() {
                match segment {
                    PathSegment::Field(name) if i > 0 => write!(f, ".{name}")?,
                    PathSegment::Field(name) => write!(f, "{name}")?,
                    PathSegment::Index(idx) => write!(f, "[{idx}]")?,
                }
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl std::error::Error for GraphQLError {}

/// A location in a GraphQL document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQLLocation {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub column: u32,
}

/// A segment in an error path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// A field name.
    Field(String),
    /// An array index.
    Index(usize),
}

/// The raw response body before field mapping.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ResponseEnvelope {
    #[serde(default)]
    pub(crate) data: Option<Value>,
    #[serde(default)]
    pub(crate) errors: Vec<GraphQLError>,
    #[serde(default)]
    pub(crate) extensions: Option<Value>,
}

/// A typed GraphQL response.
///
/// GraphQL may return partial data alongside errors, so both are kept.
/// `data` is `None` when the server sent `null` or omitted it.
#[derive(Debug, Clone)]
pub struct Response<D> {
    /// Name of the operation that produced this response.
    pub operation_name: String,
    /// The mapped data.
    pub data: Option<D>,
    /// Errors that occurred during execution.
    pub errors: Vec<GraphQLError>,
    /// Additional response metadata.
    pub extensions: Option<Value>,
}

impl<D> Response<D> {
    /// Check if the response contains errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Check if the response was successful (has data and no errors).
    pub fn is_success(&self) -> bool {
        self.data.is_some() && self.errors.is_empty()
    }

    /// Get all errors as a combined message.
    pub fn error_message(&self) -> Option<String> {
        if self.errors.is_empty() {
            None
        } else {
            Some(
                self.errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        }
    }

    /// Convert errors to a `Result`.
    ///
    /// Returns `Ok(self)` if there are no errors.
    pub fn into_result(self) -> Result<Self, CallError> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(CallError::GraphQL(self.errors))
        }
    }

    /// Take the data, failing on GraphQL errors or missing data.
    pub fn into_data(self) -> Result<D, CallError> {
        let response = self.into_result()?;
        response
            .data
            .ok_or_else(|| CallError::Decode(crate::error::DecodeError::missing("data")))
    }

    /// Transform the data, keeping errors and extensions.
    pub fn map<T>(self, f: impl FnOnce(D) -> T) -> Response<T> {
        Response {
            operation_name: self.operation_name,
            data: self.data.map(f),
            errors: self.errors,
            extensions: self.extensions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(data: Option<i32>, errors: Vec<GraphQLError>) -> Response<i32> {
        Response {
            operation_name: "Test".into(),
            data,
            errors,
            extensions: None,
        }
    }

    #[test]
    fn test_envelope_parsing() {
        let envelope: ResponseEnvelope = serde_json::from_value(json!({
            "data": {"user": null},
            "errors": [{
                "message": "Permission denied",
                "locations": [{"line": 2, "column": 3}],
                "path": ["user", 0, "email"]
            }]
        }))
        .unwrap();

        assert_eq!(envelope.data, Some(json!({"user": null})));
        assert_eq!(envelope.errors.len(), 1);
        let error = &envelope.errors[0];
        assert_eq!(error.locations[0], GraphQLLocation { line: 2, column: 3 });
        assert_eq!(error.to_string(), "Permission denied (at user[0].email)");
    }

    #[test]
    fn test_successful_response() {
        let response = response(Some(1), vec![]);
        assert!(response.is_success());
        assert!(!response.has_errors());
        assert_eq!(response.into_data().unwrap(), 1);
    }

    #[test]
    fn test_partial_response() {
        // GraphQL can return partial data with errors
        let response = response(Some(1), vec![GraphQLError::new("Permission denied")]);

        assert!(response.has_errors());
        assert_eq!(response.error_message(), Some("Permission denied".to_string()));
        assert!(matches!(response.into_data(), Err(CallError::GraphQL(_))));
    }

    #[test]
    fn test_missing_data() {
        let response = response(None, vec![]);
        assert!(!response.is_success());
        assert!(matches!(response.into_data(), Err(CallError::Decode(_))));
    }

    #[test]
    fn test_map_keeps_errors() {
        let mapped = response(Some(2), vec![GraphQLError::new("warn")]).map(|n| n * 10);
        assert_eq!(mapped.data, Some(20));
        assert_eq!(mapped.errors.len(), 1);
    }
}

//! JSON codec with custom scalar support.
//!
//! The [`Codec`] is assembled once from a [`ScalarRegistry`] when the client is
//! built. Standard JSON values go through `serde_json`; every registered custom
//! scalar gets a leaf encoder/decoder that reads and writes a JSON string and
//! delegates to the scalar's [`CustomTypeAdapter`](crate::CustomTypeAdapter).
//!
//! # Example
//!
//! ```ignore
//! use horizon_graphql::{Codec, ScalarRegistry};
//!
//! let codec = Codec::build(&registry)?;
//!
//! let born: chrono::NaiveDate = codec.decode_scalar(&date, &json!("2024-01-01"))?;
//! assert_eq!(codec.encode_scalar(&date, &born)?, json!("2024-01-01"));
//! ```

mod reader;
mod variables;

pub use reader::ResponseReader;
pub use variables::{VariableValue, Variables};

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{ConfigurationError, DecodeError, EncodeError};
use crate::scalar::{ErasedAdapter, ScalarRegistry, ScalarType};

/// Immutable JSON encoder/decoder extended with custom scalar adapters.
///
/// The codec is `Send + Sync` and is shared by every call made through one
/// client.
#[derive(Clone)]
pub struct Codec {
    adapters: HashMap<String, Arc<dyn ErasedAdapter>>,
    scalars: Vec<ScalarType>,
}

impl Codec {
    /// Build a codec from a registry.
    ///
    /// Fails if a declared scalar has no adapter.
    pub fn build(registry: &ScalarRegistry) -> Result<Self, ConfigurationError> {
        registry.validate()?;

        let mut adapters = HashMap::with_capacity(registry.len());
        let mut scalars = Vec::with_capacity(registry.len());
        for entry in registry.entries() {
            if let Some(adapter) = &entry.adapter {
                adapters.insert(entry.scalar.name().to_string(), adapter.clone());
                scalars.push(entry.scalar.clone());
            }
        }

        Ok(Self { adapters, scalars })
    }

    /// A codec with no custom scalars.
    pub fn standard() -> Self {
        Self {
            adapters: HashMap::new(),
            scalars: Vec::new(),
        }
    }

    /// The custom scalars this codec handles, in registration order.
    pub fn scalar_types(&self) -> &[ScalarType] {
        &self.scalars
    }

    /// Check whether a custom scalar is installed.
    pub fn supports(&self, scalar: &ScalarType) -> bool {
        self.adapters.contains_key(scalar.name())
    }

    /// Parse a response body into a JSON tree.
    pub fn parse(&self, bytes: &[u8]) -> Result<Value, DecodeError> {
        serde_json::from_slice(bytes).map_err(|source| DecodeError::Json {
            path: String::new(),
            source,
        })
    }

    /// Encode a value using standard JSON handling.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Value, EncodeError> {
        Ok(serde_json::to_value(value)?)
    }

    /// Decode a value using standard JSON handling.
    pub fn decode<T: DeserializeOwned>(&self, value: &Value) -> Result<T, DecodeError> {
        self.decode_at(value, "")
    }

    /// Decode a custom scalar from its wire representation.
    pub fn decode_scalar<T: 'static>(
        &self,
        scalar: &ScalarType,
        value: &Value,
    ) -> Result<T, DecodeError> {
        self.decode_scalar_at(scalar, value, "")
    }

    /// Encode a custom scalar as a JSON string.
    pub fn encode_scalar<T: 'static>(
        &self,
        scalar: &ScalarType,
        value: &T,
    ) -> Result<Value, EncodeError> {
        self.encode_scalar_for(scalar, value, std::any::type_name::<T>(), scalar.name())
    }

    /// Encode a set of variables into a JSON object.
    pub fn encode_variables(&self, variables: &Variables) -> Result<Map<String, Value>, EncodeError> {
        variables.encode(self)
    }

    /// Create a reader positioned at the root of `value`.
    pub fn reader<'a>(&'a self, value: &'a Value) -> ResponseReader<'a> {
        ResponseReader::new(self, value)
    }

    pub(crate) fn decode_at<T: DeserializeOwned>(
        &self,
        value: &Value,
        path: &str,
    ) -> Result<T, DecodeError> {
        T::deserialize(value).map_err(|source| DecodeError::Json {
            path: path.to_string(),
            source,
        })
    }

    pub(crate) fn decode_scalar_at<T: 'static>(
        &self,
        scalar: &ScalarType,
        value: &Value,
        path: &str,
    ) -> Result<T, DecodeError> {
        let adapter = self
            .adapters
            .get(scalar.name())
            .ok_or_else(|| DecodeError::UnknownScalar {
                scalar: scalar.name().to_string(),
                path: path.to_string(),
            })?;
        if adapter.domain_type() != TypeId::of::<T>() {
            return Err(DecodeError::ScalarTypeMismatch {
                scalar: scalar.name().to_string(),
                registered: adapter.domain_type_name(),
                requested: std::any::type_name::<T>(),
            });
        }

        let Value::String(wire) = value else {
            return Err(DecodeError::NotAString {
                scalar: scalar.name().to_string(),
                path: path.to_string(),
                found: json_kind(value),
            });
        };

        let decoded = adapter
            .decode_any(wire)
            .map_err(|source| DecodeError::Scalar {
                scalar: scalar.name().to_string(),
                path: path.to_string(),
                source,
            })?;
        decoded
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| DecodeError::ScalarTypeMismatch {
                scalar: scalar.name().to_string(),
                registered: adapter.domain_type_name(),
                requested: std::any::type_name::<T>(),
            })
    }

    pub(crate) fn encode_scalar_for(
        &self,
        scalar: &ScalarType,
        value: &dyn std::any::Any,
        value_type: &'static str,
        variable: &str,
    ) -> Result<Value, EncodeError> {
        let adapter = self
            .adapters
            .get(scalar.name())
            .ok_or_else(|| EncodeError::UnknownScalar {
                scalar: scalar.name().to_string(),
                variable: variable.to_string(),
            })?;
        adapter
            .encode_any(value)
            .map(Value::String)
            .ok_or_else(|| EncodeError::ScalarTypeMismatch {
                scalar: scalar.name().to_string(),
                variable: variable.to_string(),
                expected: adapter.domain_type_name(),
                actual: value_type,
            })
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("scalars", &self.scalars)
            .finish()
    }
}

/// Short name of a JSON value's kind, for error messages.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::FnTypeAdapter;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct Cents(i64);

    fn money() -> ScalarType {
        ScalarType::new::<Cents>("Money")
    }

    fn money_codec() -> Codec {
        let mut registry = ScalarRegistry::new();
        registry
            .register(
                money(),
                FnTypeAdapter::new(|c: &Cents| c.0.to_string(), |s| Ok(Cents(s.parse()?))),
            )
            .unwrap();
        Codec::build(&registry).unwrap()
    }

    #[test]
    fn test_standard_codec_primitives() {
        #[derive(Debug, Serialize, Deserialize, PartialEq)]
        struct User {
            id: String,
            age: u32,
            score: f64,
            active: bool,
            tags: Vec<String>,
        }

        let codec = Codec::standard();
        let user = User {
            id: "1".into(),
            age: 42,
            score: 0.5,
            active: true,
            tags: vec!["a".into(), "b".into()],
        };

        let value = codec.encode(&user).unwrap();
        assert_eq!(value["age"], 42);
        assert_eq!(value["tags"], json!(["a", "b"]));
        assert_eq!(codec.decode::<User>(&value).unwrap(), user);
        assert!(codec.scalar_types().is_empty());
    }

    #[test]
    fn test_scalar_decode_and_encode() {
        let codec = money_codec();

        let cents: Cents = codec.decode_scalar(&money(), &json!("1250")).unwrap();
        assert_eq!(cents, Cents(1250));
        assert_eq!(codec.encode_scalar(&money(), &cents).unwrap(), json!("1250"));
    }

    #[test]
    fn test_scalar_requires_string_token() {
        let codec = money_codec();
        let err = codec.decode_scalar::<Cents>(&money(), &json!(1250)).unwrap_err();

        assert!(matches!(
            err,
            DecodeError::NotAString { found: "number", .. }
        ));
    }

    #[test]
    fn test_scalar_decode_failure_is_reported() {
        let codec = money_codec();
        let err = codec
            .decode_scalar::<Cents>(&money(), &json!("lots"))
            .unwrap_err();

        assert!(matches!(err, DecodeError::Scalar { .. }));
    }

    #[test]
    fn test_unknown_scalar() {
        let codec = Codec::standard();
        let err = codec
            .decode_scalar::<Cents>(&money(), &json!("1"))
            .unwrap_err();
        assert!(matches!(err, DecodeError::UnknownScalar { .. }));

        let err = codec.encode_scalar(&money(), &Cents(1)).unwrap_err();
        assert!(matches!(err, EncodeError::UnknownScalar { .. }));
    }

    #[test]
    fn test_requested_type_must_match_adapter() {
        let codec = money_codec();
        let err = codec
            .decode_scalar::<String>(&money(), &json!("1"))
            .unwrap_err();
        assert!(matches!(err, DecodeError::ScalarTypeMismatch { .. }));

        let err = codec
            .encode_scalar(&money(), &"1".to_string())
            .unwrap_err();
        assert!(matches!(err, EncodeError::ScalarTypeMismatch { .. }));
    }

    #[test]
    fn test_build_fails_on_declared_scalar_without_adapter() {
        let mut registry = ScalarRegistry::new();
        registry.declare(money());

        assert!(matches!(
            Codec::build(&registry),
            Err(ConfigurationError::MissingScalarAdapter { .. })
        ));
    }

    #[test]
    fn test_parse_reports_malformed_json() {
        let codec = Codec::standard();
        assert!(codec.parse(br#"{"data": {}}"#).is_ok());
        assert!(matches!(
            codec.parse(b"{not json"),
            Err(DecodeError::Json { .. })
        ));
    }
}

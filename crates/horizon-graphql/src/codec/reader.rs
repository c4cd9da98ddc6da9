//! Typed traversal of a decoded response tree.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{Codec, json_kind};
use crate::error::DecodeError;
use crate::scalar::ScalarType;

static NULL: Value = Value::Null;

/// A cursor over one value of a response's `data` tree.
///
/// Response-field mappers walk the tree with [`field`](Self::field) and
/// [`list`](Self::list) and read leaves with the typed accessors. Custom
/// scalars are read with [`custom`](Self::custom), which routes through the
/// client's [`Codec`]. Absent fields read as `null`; every error carries the
/// path of the value that failed.
///
/// # Example
///
/// ```ignore
/// let user = User {
///     id: reader.field("id").string()?,
///     born: reader.field("born").optional(|r| r.custom(&DATE))?,
///     friends: reader
///         .field("friends")
///         .list()?
///         .iter()
///         .map(|f| f.field("name").string())
///         .collect::<Result<_, _>>()?,
/// };
/// ```
#[derive(Clone)]
pub struct ResponseReader<'a> {
    codec: &'a Codec,
    value: &'a Value,
    path: String,
}

impl<'a> ResponseReader<'a> {
    pub(crate) fn new(codec: &'a Codec, value: &'a Value) -> Self {
        Self {
            codec,
            value,
            path: String::new(),
        }
    }

    /// Get a reader for a field of this object.
    ///
    /// Reading a field of a non-object, or a field that is absent, yields a
    /// reader positioned on `null`.
    pub fn field(&self, name: &str) -> ResponseReader<'a> {
        let value = match self.value {
            Value::Object(map) => map.get(name).unwrap_or(&NULL),
            _ => &NULL,
        };
        let path = if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.path, name)
        };
        ResponseReader {
            codec: self.codec,
            value,
            path,
        }
    }

    /// The JSON path of the current value.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw JSON value under the cursor.
    pub fn value(&self) -> &'a Value {
        self.value
    }

    /// Check if the current value is `null` or absent.
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Read a required string.
    pub fn string(&self) -> Result<String, DecodeError> {
        match self.value {
            Value::String(s) => Ok(s.clone()),
            other => Err(self.unexpected("string", other)),
        }
    }

    /// Read a required integer.
    pub fn i64(&self) -> Result<i64, DecodeError> {
        match self.value.as_i64() {
            Some(n) => Ok(n),
            None => Err(self.unexpected("integer", self.value)),
        }
    }

    /// Read a required float. Integers are accepted.
    pub fn f64(&self) -> Result<f64, DecodeError> {
        match self.value.as_f64() {
            Some(n) => Ok(n),
            None => Err(self.unexpected("number", self.value)),
        }
    }

    /// Read a required boolean.
    pub fn bool(&self) -> Result<bool, DecodeError> {
        match self.value {
            Value::Bool(b) => Ok(*b),
            other => Err(self.unexpected("boolean", other)),
        }
    }

    /// Read a required custom scalar through the codec.
    pub fn custom<T: 'static>(&self, scalar: &ScalarType) -> Result<T, DecodeError> {
        if self.is_null() {
            return Err(DecodeError::missing(self.path.clone()));
        }
        self.codec.decode_scalar_at(scalar, self.value, &self.path)
    }

    /// Read a required list, returning a reader per element.
    pub fn list(&self) -> Result<Vec<ResponseReader<'a>>, DecodeError> {
        match self.value {
            Value::Array(items) => Ok(items
                .iter()
                .enumerate()
                .map(|(i, value)| ResponseReader {
                    codec: self.codec,
                    value,
                    path: format!("{}[{}]", self.path, i),
                })
                .collect()),
            other => Err(self.unexpected("list", other)),
        }
    }

    /// Read a nullable value: `None` when the value is `null` or absent,
    /// otherwise the result of `read`.
    pub fn optional<T>(
        &self,
        read: impl FnOnce(&Self) -> Result<T, DecodeError>,
    ) -> Result<Option<T>, DecodeError> {
        if self.is_null() {
            Ok(None)
        } else {
            read(self).map(Some)
        }
    }

    /// Deserialize the current value with standard JSON handling.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        self.codec.decode_at(self.value, &self.path)
    }

    fn unexpected(&self, expected: &'static str, found: &Value) -> DecodeError {
        if found.is_null() {
            DecodeError::missing(self.path.clone())
        } else {
            DecodeError::UnexpectedType {
                path: self.path.clone(),
                expected,
                found: json_kind(found),
            }
        }
    }
}

impl std::fmt::Debug for ResponseReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseReader")
            .field("path", &self.path)
            .field("value", self.value)
            .finish()
    }
}

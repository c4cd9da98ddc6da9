//! Operation variables.

use std::any::Any;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use super::Codec;
use crate::error::EncodeError;
use crate::scalar::ScalarType;

/// One variable value awaiting encoding.
pub enum VariableValue {
    /// A value already in standard JSON form.
    Json(Value),
    /// A custom scalar, encoded by the codec at call time.
    Custom {
        /// The scalar the value belongs to.
        scalar: ScalarType,
        /// The domain value.
        value: Box<dyn Any + Send + Sync>,
        /// Name of the value's Rust type, for diagnostics.
        type_name: &'static str,
    },
    /// A list of values.
    List(Vec<VariableValue>),
    /// A nested input object.
    Object(Variables),
    /// A value that failed standard serialization when it was bound.
    Invalid(String),
}

impl VariableValue {
    /// Wrap a custom scalar value.
    pub fn custom<T: Any + Send + Sync>(scalar: &ScalarType, value: T) -> Self {
        Self::Custom {
            scalar: scalar.clone(),
            value: Box::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Serialize a plain value.
    pub fn json(value: impl Serialize) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Self::Json(value),
            Err(e) => Self::Invalid(e.to_string()),
        }
    }

    fn encode(&self, codec: &Codec, name: &str) -> Result<Value, EncodeError> {
        match self {
            Self::Json(value) => Ok(value.clone()),
            Self::Custom {
                scalar,
                value,
                type_name,
            } => codec.encode_scalar_for(scalar, &**value, *type_name, name),
            Self::List(items) => items
                .iter()
                .map(|item| item.encode(codec, name))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Self::Object(vars) => vars.encode(codec).map(Value::Object),
            Self::Invalid(message) => Err(EncodeError::InvalidVariable {
                variable: name.to_string(),
                message: message.clone(),
            }),
        }
    }
}

impl fmt::Debug for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Custom {
                scalar, type_name, ..
            } => f
                .debug_struct("Custom")
                .field("scalar", scalar)
                .field("type_name", type_name)
                .finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
            Self::Object(vars) => f.debug_tuple("Object").field(vars).finish(),
            Self::Invalid(message) => f.debug_tuple("Invalid").field(message).finish(),
        }
    }
}

/// Ordered variable bindings for an operation.
///
/// # Example
///
/// ```ignore
/// let variables = Variables::new()
///     .set("id", "42")
///     .set("first", 10)
///     .custom("since", &DATE, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
///     .object("filter", Variables::new().set("active", true));
/// ```
#[derive(Debug, Default)]
pub struct Variables {
    entries: Vec<(String, VariableValue)>,
}

impl Variables {
    /// Create an empty set of variables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a plain JSON-serializable value.
    pub fn set(self, name: impl Into<String>, value: impl Serialize) -> Self {
        self.with(name, VariableValue::json(value))
    }

    /// Bind a custom scalar value.
    pub fn custom<T: Any + Send + Sync>(
        self,
        name: impl Into<String>,
        scalar: &ScalarType,
        value: T,
    ) -> Self {
        self.with(name, VariableValue::custom(scalar, value))
    }

    /// Bind a list of custom scalar values.
    pub fn custom_list<T: Any + Send + Sync>(
        self,
        name: impl Into<String>,
        scalar: &ScalarType,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        let items = values
            .into_iter()
            .map(|v| VariableValue::custom(scalar, v))
            .collect();
        self.with(name, VariableValue::List(items))
    }

    /// Bind a nested input object.
    pub fn object(self, name: impl Into<String>, value: Variables) -> Self {
        self.with(name, VariableValue::Object(value))
    }

    /// Bind an explicit `null`.
    pub fn null(self, name: impl Into<String>) -> Self {
        self.with(name, VariableValue::Json(Value::Null))
    }

    /// Bind any [`VariableValue`]. A later binding of the same name replaces
    /// the earlier one.
    pub fn with(mut self, name: impl Into<String>, value: VariableValue) -> Self {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    /// Get a bound value by name.
    pub fn get(&self, name: &str) -> Option<&VariableValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Number of bound variables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no variables are bound.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn encode(&self, codec: &Codec) -> Result<Map<String, Value>, EncodeError> {
        let mut map = Map::new();
        for (name, value) in &self.entries {
            map.insert(name.clone(), value.encode(codec, name)?);
        }
        Ok(map)
    }
}

//! Custom scalar types and their adapters.
//!
//! A GraphQL schema may declare leaf types beyond the built-in `String`,
//! `Int`, `Float`, `Boolean` and `ID` (dates, URLs, money amounts, ...). On the
//! wire every such value is a JSON string. A [`ScalarType`] names the scalar and
//! the Rust type it maps to, and a [`CustomTypeAdapter`] converts between the
//! two.
//!
//! # Example
//!
//! ```ignore
//! use horizon_graphql::{FnTypeAdapter, ScalarRegistry, ScalarType};
//!
//! let date = ScalarType::new::<chrono::NaiveDate>("Date");
//! let adapter = FnTypeAdapter::new(
//!     |d: &chrono::NaiveDate| d.format("%Y-%m-%d").to_string(),
//!     |s| Ok(chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")?),
//! );
//!
//! let mut registry = ScalarRegistry::new();
//! registry.register(date, adapter)?;
//! ```

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{BoxError, ConfigurationError};

/// Identifies a custom scalar: its schema name and the Rust type it maps to.
#[derive(Clone)]
pub struct ScalarType {
    name: Cow<'static, str>,
    type_id: TypeId,
    type_name: &'static str,
}

impl ScalarType {
    /// Create a scalar type mapping the schema scalar `name` to `T`.
    pub fn new<T: 'static>(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Get the scalar's schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the [`TypeId`] of the domain type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Get the name of the domain type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Check whether values of `T` belong to this scalar.
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl PartialEq for ScalarType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.type_id == other.type_id
    }
}

impl Eq for ScalarType {}

impl Hash for ScalarType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarType")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .finish()
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Converts a domain value to and from its wire string.
///
/// Implementations must round-trip: `decode(&encode(x))` reproduces `x` for
/// every valid `x`. `decode` receives whatever string the server sent and must
/// report unparsable input as an error rather than panic.
pub trait CustomTypeAdapter<T>: Send + Sync + 'static {
    /// Encode a domain value as its wire string.
    fn encode(&self, value: &T) -> String;

    /// Decode a wire string into a domain value.
    fn decode(&self, value: &str) -> Result<T, BoxError>;
}

type EncodeFn<T> = dyn Fn(&T) -> String + Send + Sync;
type DecodeFn<T> = dyn Fn(&str) -> Result<T, BoxError> + Send + Sync;

/// A [`CustomTypeAdapter`] built from an encode/decode function pair.
pub struct FnTypeAdapter<T> {
    encode: Arc<EncodeFn<T>>,
    decode: Arc<DecodeFn<T>>,
}

impl<T> FnTypeAdapter<T> {
    /// Create an adapter from an encode and a decode function.
    pub fn new<E, D>(encode: E, decode: D) -> Self
    where
        E: Fn(&T) -> String + Send + Sync + 'static,
        D: Fn(&str) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            encode: Arc::new(encode),
            decode: Arc::new(decode),
        }
    }
}

impl<T> Clone for FnTypeAdapter<T> {
    fn clone(&self) -> Self {
        Self {
            encode: self.encode.clone(),
            decode: self.decode.clone(),
        }
    }
}

impl<T: 'static> CustomTypeAdapter<T> for FnTypeAdapter<T> {
    fn encode(&self, value: &T) -> String {
        (self.encode)(value)
    }

    fn decode(&self, value: &str) -> Result<T, BoxError> {
        (self.decode)(value)
    }
}

impl<T> fmt::Debug for FnTypeAdapter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTypeAdapter")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

/// Type-erased view of a `CustomTypeAdapter<T>`, used by the codec.
pub(crate) trait ErasedAdapter: Send + Sync {
    fn domain_type(&self) -> TypeId;
    fn domain_type_name(&self) -> &'static str;
    fn decode_any(&self, value: &str) -> Result<Box<dyn Any + Send>, BoxError>;
    /// Returns `None` if `value` is not of the adapter's domain type.
    fn encode_any(&self, value: &dyn Any) -> Option<String>;
}

struct Typed<T, A> {
    adapter: A,
    _marker: PhantomData<fn() -> T>,
}

impl<T, A> ErasedAdapter for Typed<T, A>
where
    T: Send + 'static,
    A: CustomTypeAdapter<T>,
{
    fn domain_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn domain_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn decode_any(&self, value: &str) -> Result<Box<dyn Any + Send>, BoxError> {
        Ok(Box::new(self.adapter.decode(value)?))
    }

    fn encode_any(&self, value: &dyn Any) -> Option<String> {
        value.downcast_ref::<T>().map(|v| self.adapter.encode(v))
    }
}

#[derive(Clone)]
pub(crate) struct RegistryEntry {
    pub(crate) scalar: ScalarType,
    pub(crate) adapter: Option<Arc<dyn ErasedAdapter>>,
}

/// Ordered mapping from [`ScalarType`] to its adapter.
///
/// Iteration follows insertion order. Registering a scalar that is already
/// present replaces its adapter in place.
#[derive(Clone, Default)]
pub struct ScalarRegistry {
    entries: Vec<RegistryEntry>,
}

impl ScalarRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the adapter for `scalar`.
    ///
    /// Fails if the adapter's domain type `T` is not the type `scalar` maps to.
    pub fn register<T, A>(
        &mut self,
        scalar: ScalarType,
        adapter: A,
    ) -> Result<&mut Self, ConfigurationError>
    where
        T: Send + 'static,
        A: CustomTypeAdapter<T>,
    {
        if !scalar.is::<T>() {
            return Err(ConfigurationError::ScalarTypeMismatch {
                scalar: scalar.name().to_string(),
                expected: scalar.type_name(),
                actual: std::any::type_name::<T>(),
            });
        }

        let adapter: Arc<dyn ErasedAdapter> = Arc::new(Typed {
            adapter,
            _marker: PhantomData,
        });
        match self.position(scalar.name()) {
            Some(index) => {
                let entry = &mut self.entries[index];
                entry.scalar = scalar;
                entry.adapter = Some(adapter);
            }
            None => self.entries.push(RegistryEntry {
                scalar,
                adapter: Some(adapter),
            }),
        }
        Ok(self)
    }

    /// Declare a scalar that operations rely on without supplying its adapter.
    ///
    /// [`validate`](Self::validate) fails until an adapter is registered for it.
    pub fn declare(&mut self, scalar: ScalarType) -> &mut Self {
        if self.position(scalar.name()).is_none() {
            self.entries.push(RegistryEntry {
                scalar,
                adapter: None,
            });
        }
        self
    }

    /// Check that every declared scalar has an adapter.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self.entries.iter().find(|e| e.adapter.is_none()) {
            Some(entry) => Err(ConfigurationError::MissingScalarAdapter {
                scalar: entry.scalar.name().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Check whether a scalar with this name is known.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Check whether a scalar with this name has an adapter.
    pub fn has_adapter(&self, name: &str) -> bool {
        self.position(name)
            .is_some_and(|i| self.entries[i].adapter.is_some())
    }

    /// Iterate the known scalar types in insertion order.
    pub fn scalar_types(&self) -> impl Iterator<Item = &ScalarType> {
        self.entries.iter().map(|e| &e.scalar)
    }

    /// Number of known scalars.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no scalars are known.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.scalar.name() == name)
    }
}

impl fmt::Debug for ScalarRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| (&e.scalar, e.adapter.is_some())))
            .finish()
    }
}

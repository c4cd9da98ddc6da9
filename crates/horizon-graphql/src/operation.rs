//! Operation descriptions and response-field mappers.
//!
//! An [`Operation`] is the immutable description of one GraphQL request: its
//! document, its variables, and the [`ResponseFieldMapper`] that turns the
//! response's `data` tree into a typed value. Operations are normally
//! generated ahead of time from a schema; the trait is small enough to
//! implement by hand.
//!
//! # Example
//!
//! ```ignore
//! struct UserQuery { id: String }
//!
//! impl Operation for UserQuery {
//!     type Data = User;
//!
//!     fn document(&self) -> &str {
//!         "query User($id: ID!) { user(id: $id) { id name born } }"
//!     }
//!
//!     fn name(&self) -> &str {
//!         "User"
//!     }
//!
//!     fn variables(&self) -> Variables {
//!         Variables::new().set("id", &self.id)
//!     }
//!
//!     fn response_field_mapper(&self) -> Box<dyn ResponseFieldMapper<Data = User>> {
//!         Box::new(mapper(|data| {
//!             let user = data.field("user");
//!             Ok(User {
//!                 id: user.field("id").string()?,
//!                 name: user.field("name").string()?,
//!                 born: user.field("born").optional(|r| r.custom(&DATE))?,
//!             })
//!         }))
//!     }
//! }
//! ```

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::codec::{ResponseReader, Variables};
use crate::error::DecodeError;

pub use crate::request::OperationKind;

/// A typed GraphQL query or mutation.
pub trait Operation: Send + Sync + 'static {
    /// The typed result produced by the operation's mapper.
    type Data: Send + 'static;

    /// The operation type.
    fn kind(&self) -> OperationKind {
        OperationKind::Query
    }

    /// The GraphQL document text.
    fn document(&self) -> &str;

    /// The operation name sent as `operationName`. Empty for anonymous
    /// operations.
    fn name(&self) -> &str;

    /// The variable bindings for this instance.
    fn variables(&self) -> Variables {
        Variables::new()
    }

    /// The mapper that decodes the response's `data` tree.
    fn response_field_mapper(&self) -> Box<dyn ResponseFieldMapper<Data = Self::Data>>;
}

/// Turns a decoded `data` tree into an operation's typed result.
///
/// The reader passed to [`map`](Self::map) is positioned at the root of
/// `data`. Mappers are only invoked when `data` is present and non-null.
pub trait ResponseFieldMapper: Send + Sync {
    /// The typed result.
    type Data;

    /// Map the response tree.
    fn map(&self, data: &ResponseReader<'_>) -> Result<Self::Data, DecodeError>;
}

/// A mapper backed by a closure. Created with [`mapper`].
pub struct FnMapper<F, D> {
    f: F,
    _data: PhantomData<fn() -> D>,
}

impl<F, D> ResponseFieldMapper for FnMapper<F, D>
where
    F: Fn(&ResponseReader<'_>) -> Result<D, DecodeError> + Send + Sync,
{
    type Data = D;

    fn map(&self, data: &ResponseReader<'_>) -> Result<D, DecodeError> {
        (self.f)(data)
    }
}

impl<F, D> fmt::Debug for FnMapper<F, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMapper")
            .field("data", &std::any::type_name::<D>())
            .finish_non_exhaustive()
    }
}

/// Create a mapper from a closure over the root reader.
pub fn mapper<F, D>(f: F) -> FnMapper<F, D>
where
    F: Fn(&ResponseReader<'_>) -> Result<D, DecodeError> + Send + Sync,
{
    FnMapper {
        f,
        _data: PhantomData,
    }
}

/// A mapper that deserializes the whole `data` tree with serde.
///
/// Suitable for operations without custom scalars, or whose scalars the
/// domain type deserializes from strings itself.
pub struct DeserializeMapper<D> {
    _data: PhantomData<fn() -> D>,
}

impl<D: DeserializeOwned> ResponseFieldMapper for DeserializeMapper<D> {
    type Data = D;

    fn map(&self, data: &ResponseReader<'_>) -> Result<D, DecodeError> {
        data.deserialize()
    }
}

impl<D> fmt::Debug for DeserializeMapper<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeserializeMapper")
            .field("data", &std::any::type_name::<D>())
            .finish()
    }
}

/// Create a mapper that deserializes `data` into `D`.
pub fn deserialize_mapper<D: DeserializeOwned>() -> DeserializeMapper<D> {
    DeserializeMapper { _data: PhantomData }
}

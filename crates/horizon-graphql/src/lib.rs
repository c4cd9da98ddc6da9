//! Typed GraphQL calls for Horizon.
//!
//! This crate turns strongly-typed operation descriptions into executable
//! calls bound to a validated client configuration:
//!
//! - **Client configuration**: endpoint, transport, custom scalar adapters and
//!   a result adapter, validated once by [`GraphQLClientBuilder::build`] and
//!   frozen into a shareable [`GraphQLClient`]
//! - **Custom scalars**: [`ScalarType`] + [`CustomTypeAdapter`] pairs compiled
//!   into the client's JSON [`Codec`]
//! - **Result adapters**: the [`ResultAdapter`] bound to the client decides
//!   how each call executes and what the caller gets back
//!
//! # Building a client
//!
//! ```ignore
//! use horizon_graphql::{FnTypeAdapter, FutureAdapter, GraphQLClient, HttpTransport, ScalarType};
//!
//! let date = ScalarType::new::<chrono::NaiveDate>("Date");
//!
//! let client = GraphQLClient::builder()
//!     .transport(HttpTransport::new()?)
//!     .server_url("https://api.example.com/graphql")
//!     .result_adapter(FutureAdapter)
//!     .custom_type_adapter(
//!         date.clone(),
//!         FnTypeAdapter::new(
//!             |d: &chrono::NaiveDate| d.format("%Y-%m-%d").to_string(),
//!             |s| Ok(chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")?),
//!         ),
//!     )
//!     .build()?;
//! ```
//!
//! Missing required fields are reported in a fixed order: `transport`, then
//! `server_url`, then `result_adapter`. A malformed endpoint or a declared
//! scalar without an adapter also fails here, before any call is made.
//!
//! # Making calls
//!
//! ```ignore
//! // With FutureAdapter, new_call returns a lazy future.
//! let response = client.new_call(UserQuery { id: "42".into() }).await?;
//! if let Some(user) = response.data {
//!     println!("{} was born on {}", user.name, user.born);
//! }
//! ```
//!
//! Every call is independent: its own id, state and cancel channel. Use
//! [`RawCallAdapter`] (or [`GraphQLClient::raw_call`]) to keep full control of
//! a call, including [`RawCall::handle`] for cancellation and
//! [`RawCall::duplicate`] for retries.

mod adapter;
mod call;
mod client;
mod codec;
mod error;
mod operation;
mod request;
mod response;
pub mod runtime;
mod scalar;
pub mod transport;

pub use adapter::{
    BlockingAdapter, CallResult, FutureAdapter, RawCallAdapter, ResultAdapter, SpawnAdapter,
    SpawnedCall, StreamAdapter,
};
pub use call::{CallHandle, CallId, CallState, RawCall};
pub use client::{CallFactory, Endpoint, GraphQLClient, GraphQLClientBuilder};
pub use codec::{Codec, ResponseReader, VariableValue, Variables};
pub use error::{
    BoxError, CallError, ConfigurationError, DecodeError, EncodeError, TransportError,
};
pub use operation::{
    DeserializeMapper, FnMapper, Operation, OperationKind, ResponseFieldMapper,
    deserialize_mapper, mapper,
};
pub use request::GraphQLRequest;
pub use response::{GraphQLError, GraphQLLocation, PathSegment, Response};
pub use scalar::{CustomTypeAdapter, FnTypeAdapter, ScalarRegistry, ScalarType};
pub use transport::{
    HttpTransport, HttpTransportBuilder, HttpTransportConfig, Transport, TransportRequest,
    TransportResponse,
};

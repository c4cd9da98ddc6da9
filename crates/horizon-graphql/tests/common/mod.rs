//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use horizon_graphql::{
    FnTypeAdapter, Operation, ResponseFieldMapper, ScalarType, Transport, TransportError,
    TransportRequest, TransportResponse, Variables, mapper,
};
use parking_lot::Mutex;
use serde_json::Value;

pub const ENDPOINT: &str = "https://api.example.com/graphql";

/// In-memory transport that records requests and replays canned responses.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<MockInner>,
}

#[derive(Default)]
struct MockInner {
    requests: Mutex<Vec<TransportRequest>>,
    queued: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    fallback: Mutex<Option<TransportResponse>>,
    delay: Mutex<Duration>,
}

impl MockTransport {
    /// Answer every request with `200` and this JSON body.
    pub fn replying(body: Value) -> Self {
        let transport = Self::default();
        *transport.inner.fallback.lock() = Some(TransportResponse::new(200, body.to_string()));
        transport
    }

    /// Answer every request with this status and raw body.
    pub fn with_status(status: u16, body: &str) -> Self {
        let transport = Self::default();
        *transport.inner.fallback.lock() = Some(TransportResponse::new(status, body.to_string()));
        transport
    }

    /// Answer the next request with `result` before falling back.
    pub fn enqueue(&self, result: Result<TransportResponse, TransportError>) -> &Self {
        self.inner.queued.lock().push_back(result);
        self
    }

    /// Wait this long before answering.
    pub fn delayed(self, delay: Duration) -> Self {
        *self.inner.delay.lock() = delay;
        self
    }

    /// Number of requests received.
    pub fn sent(&self) -> usize {
        self.inner.requests.lock().len()
    }

    /// All received requests.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.inner.requests.lock().clone()
    }

    /// The JSON bodies of all received requests.
    pub fn bodies(&self) -> Vec<Value> {
        self.inner
            .requests
            .lock()
            .iter()
            .map(|r| serde_json::from_slice(&r.body).expect("request body is JSON"))
            .collect()
    }
}

impl Transport for MockTransport {
    fn execute(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'static, Result<TransportResponse, TransportError>> {
        self.inner.requests.lock().push(request);
        let delay = *self.inner.delay.lock();
        let queued = self.inner.queued.lock().pop_front();
        let result = queued.unwrap_or_else(|| {
            self.inner
                .fallback
                .lock()
                .clone()
                .ok_or_else(|| TransportError::Connection("no response configured".into()))
        });

        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        }
        .boxed()
    }
}

pub fn date() -> ScalarType {
    ScalarType::new::<NaiveDate>("Date")
}

pub fn date_adapter() -> FnTypeAdapter<NaiveDate> {
    FnTypeAdapter::new(
        |d: &NaiveDate| d.format("%Y-%m-%d").to_string(),
        |s| Ok(NaiveDate::parse_from_str(s, "%Y-%m-%d")?),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub born: Option<NaiveDate>,
}

/// `query User($id: ID!, $bornAfter: Date)`
pub struct UserQuery {
    pub id: String,
    pub born_after: Option<NaiveDate>,
}

impl UserQuery {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            born_after: None,
        }
    }
}

impl Operation for UserQuery {
    type Data = User;

    fn document(&self) -> &str {
        "query User($id: ID!, $bornAfter: Date) { user(id: $id, bornAfter: $bornAfter) { id name born } }"
    }

    fn name(&self) -> &str {
        "User"
    }

    fn variables(&self) -> Variables {
        let variables = Variables::new().set("id", &self.id);
        match self.born_after {
            Some(date_value) => variables.custom("bornAfter", &date(), date_value),
            None => variables,
        }
    }

    fn response_field_mapper(&self) -> Box<dyn ResponseFieldMapper<Data = User>> {
        Box::new(mapper(|data| {
            let user = data.field("user");
            Ok(User {
                id: user.field("id").string()?,
                name: user.field("name").string()?,
                born: user.field("born").optional(|r| r.custom(&date()))?,
            })
        }))
    }
}

pub fn user_body(born: Value) -> Value {
    serde_json::json!({
        "data": {"user": {"id": "42", "name": "Ada", "born": born}}
    })
}

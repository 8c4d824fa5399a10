//! Remote data source collaborator
//!
//! The mirror never talks HTTP itself. Every lazy lookup and every
//! create/update/delete goes through a `RemoteDataSource`, which owns
//! transport concerns (headers, rate limits, timeouts, cancellation).
//! The core only distinguishes success from `RequestFailed`.

mod memory;

pub use memory::{InMemoryRemote, RecordedRequest, RequestMethod};

use crate::core::Result;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Query parameters appended to a resource path.
pub type Params = BTreeMap<String, String>;

#[async_trait]
pub trait RemoteDataSource: Send + Sync {
    async fn fetch(&self, path: &str, params: &Params) -> Result<JsonValue>;

    async fn create(&self, path: &str, params: &Params, body: Option<&JsonValue>)
    -> Result<JsonValue>;

    async fn update(&self, path: &str, params: &Params, body: Option<&JsonValue>)
    -> Result<JsonValue>;

    async fn delete(&self, path: &str, params: &Params, body: Option<&JsonValue>)
    -> Result<JsonValue>;
}

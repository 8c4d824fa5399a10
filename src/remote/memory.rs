use super::{Params, RemoteDataSource};
use crate::core::{MirrorError, Result};
use async_trait::async_trait;
use log::debug;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestMethod {
    Fetch,
    Create,
    Update,
    Delete,
}

/// One call observed by `InMemoryRemote`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: RequestMethod,
    pub path: String,
    pub params: Params,
    pub body: Option<JsonValue>,
}

#[derive(Debug, Clone)]
enum CannedReply {
    Respond(JsonValue),
    Fail(String),
}

/// An in-memory `RemoteDataSource` serving canned replies.
///
/// Fetches without a registered reply fail with `RequestFailed`.
///
/// An update without a registered reply behaves like an accepting server:
/// the body is merged over the resource registered for `Fetch` on the same
/// path, the merged object becomes the new `Fetch` reply and is returned.
/// With nothing registered for the path the reply is the body alone, so
/// fields the body does not carry (often `id`) are absent from it. Other
/// writes without a reply echo the body (or `null`).
#[derive(Clone, Default)]
pub struct InMemoryRemote {
    replies: Arc<Mutex<HashMap<(RequestMethod, String), CannedReply>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the reply served for `method` on `path`.
    pub async fn respond(&self, method: RequestMethod, path: impl Into<String>, reply: JsonValue) {
        let mut replies = self.replies.lock().await;
        replies.insert((method, path.into()), CannedReply::Respond(reply));
    }

    /// Makes `method` on `path` fail with the given reason.
    pub async fn fail(&self, method: RequestMethod, path: impl Into<String>, reason: impl Into<String>) {
        let mut replies = self.replies.lock().await;
        replies.insert((method, path.into()), CannedReply::Fail(reason.into()));
    }

    /// Every request seen so far, in call order.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn request_count(&self, method: RequestMethod, path: &str) -> usize {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }

    async fn serve(
        &self,
        method: RequestMethod,
        path: &str,
        params: &Params,
        body: Option<&JsonValue>,
    ) -> Result<JsonValue> {
        debug!("in-memory remote {:?} {}", method, path);
        self.requests.lock().await.push(RecordedRequest {
            method,
            path: path.to_string(),
            params: params.clone(),
            body: body.cloned(),
        });

        let mut replies = self.replies.lock().await;
        let reply = replies.get(&(method, path.to_string())).cloned();
        match reply {
            Some(CannedReply::Respond(value)) => Ok(value),
            Some(CannedReply::Fail(reason)) => Err(MirrorError::request_failed(path, reason)),
            None if method == RequestMethod::Fetch => Err(MirrorError::request_failed(
                path,
                "no reply registered for path",
            )),
            None if method == RequestMethod::Update => {
                let stored = match replies.get(&(RequestMethod::Fetch, path.to_string())) {
                    Some(CannedReply::Respond(JsonValue::Object(fields))) => Some(fields.clone()),
                    _ => None,
                };
                let Some(mut fields) = stored else {
                    return Ok(body.cloned().unwrap_or(JsonValue::Null));
                };
                if let Some(JsonValue::Object(changes)) = body {
                    for (name, value) in changes {
                        fields.insert(name.clone(), value.clone());
                    }
                }
                let merged = JsonValue::Object(fields);
                replies.insert(
                    (RequestMethod::Fetch, path.to_string()),
                    CannedReply::Respond(merged.clone()),
                );
                Ok(merged)
            }
            None => Ok(body.cloned().unwrap_or(JsonValue::Null)),
        }
    }
}

#[async_trait]
impl RemoteDataSource for InMemoryRemote {
    async fn fetch(&self, path: &str, params: &Params) -> Result<JsonValue> {
        self.serve(RequestMethod::Fetch, path, params, None).await
    }

    async fn create(
        &self,
        path: &str,
        params: &Params,
        body: Option<&JsonValue>,
    ) -> Result<JsonValue> {
        self.serve(RequestMethod::Create, path, params, body).await
    }

    async fn update(
        &self,
        path: &str,
        params: &Params,
        body: Option<&JsonValue>,
    ) -> Result<JsonValue> {
        self.serve(RequestMethod::Update, path, params, body).await
    }

    async fn delete(
        &self,
        path: &str,
        params: &Params,
        body: Option<&JsonValue>,
    ) -> Result<JsonValue> {
        self.serve(RequestMethod::Delete, path, params, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn fetch_without_reply_fails() {
        let remote = InMemoryRemote::new();
        let err = remote.fetch("guilds/1", &Params::new()).await.unwrap_err();
        assert!(matches!(err, MirrorError::RequestFailed { .. }));
    }

    #[tokio::test]
    async fn writes_echo_body_and_are_recorded() {
        let remote = InMemoryRemote::new();
        let body = json!({"name": "general"});
        let reply = remote
            .update("channels/5", &Params::new(), Some(&body))
            .await
            .unwrap();

        assert_eq!(reply, body);
        assert_eq!(remote.request_count(RequestMethod::Update, "channels/5").await, 1);
        assert_eq!(remote.requests().await[0].body, Some(body));
    }

    #[tokio::test]
    async fn update_merges_over_stored_resource() {
        let remote = InMemoryRemote::new();
        remote
            .respond(
                RequestMethod::Fetch,
                "channels/2/messages/1",
                json!({"id": 1, "channel_id": 2, "content": "old"}),
            )
            .await;

        let reply = remote
            .update("channels/2/messages/1", &Params::new(), Some(&json!({"content": "new"})))
            .await
            .unwrap();
        assert_eq!(reply, json!({"id": 1, "channel_id": 2, "content": "new"}));

        let stored = remote.fetch("channels/2/messages/1", &Params::new()).await.unwrap();
        assert_eq!(stored, reply);
    }

    #[tokio::test]
    async fn canned_failure_is_request_failed() {
        let remote = InMemoryRemote::new();
        remote.fail(RequestMethod::Delete, "guilds/1", "403 forbidden").await;

        let err = remote.delete("guilds/1", &Params::new(), None).await.unwrap_err();
        assert_eq!(err, MirrorError::request_failed("guilds/1", "403 forbidden"));
    }
}

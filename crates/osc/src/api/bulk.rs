//! 📦 The `_bulk` API: many writes, one request, NDJSON all the way down.
//!
//! Every operation renders to an action line plus (except for deletes) a source line:
//!
//! ```text
//! {"index":{"_index":"logs","_id":"1"}}
//! {"msg":"hello"}
//! {"delete":{"_index":"logs","_id":"2"}}
//! ```
//!
//! ⚠️ NDJSON means one JSON document per line. A raw source that contains a newline
//! (pretty-printed, or just unlucky) would split into two bogus lines, so those get
//! re-serialized compactly before they go anywhere near the body.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::api::common::ShardStatistics;
use crate::api::{Endpoint, Names, Parameters, Refresh, RequestParts, UrlLookup};
use crate::client::Client;
use crate::error::Result;
use crate::serialization::{ErrorCause, Time};
use crate::transport::Body;

static BULK: UrlLookup = UrlLookup::new("bulk", &["/{index}/_bulk", "/_bulk"]);

/// 🎬 What a bulk line asks the cluster to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Index,
    Create,
    Update,
    Delete,
}

impl BulkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkAction::Index => "index",
            BulkAction::Create => "create",
            BulkAction::Update => "update",
            BulkAction::Delete => "delete",
        }
    }
}

/// 📄 A document source, either already text or already a JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkSource {
    Raw(String),
    Value(Value),
}

impl From<String> for BulkSource {
    fn from(raw: String) -> Self {
        BulkSource::Raw(raw)
    }
}

impl From<&str> for BulkSource {
    fn from(raw: &str) -> Self {
        BulkSource::Raw(raw.to_string())
    }
}

impl From<Value> for BulkSource {
    fn from(value: Value) -> Self {
        BulkSource::Value(value)
    }
}

/// 🧾 One operation in a bulk request.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOperation {
    action: BulkAction,
    metadata: Map<String, Value>,
    source: Option<BulkSource>,
}

impl BulkOperation {
    fn new(action: BulkAction, source: Option<BulkSource>) -> Self {
        Self {
            action,
            metadata: Map::new(),
            source,
        }
    }

    pub fn index(source: impl Into<BulkSource>) -> Self {
        Self::new(BulkAction::Index, Some(source.into()))
    }

    /// ➕ Like `index`, but fails per item when the id already exists.
    pub fn create(source: impl Into<BulkSource>) -> Self {
        Self::new(BulkAction::Create, Some(source.into()))
    }

    /// ✏️ `body` is the whole update body: `{"doc": {...}}`, `{"script": {...}}`, upserts and all.
    pub fn update(id: impl Into<String>, body: impl Into<BulkSource>) -> Self {
        Self::new(BulkAction::Update, Some(body.into())).id(id)
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Self::new(BulkAction::Delete, None).id(id)
    }

    /// 🧬 Serialize any `Serialize` as an index operation.
    pub fn index_document<T: Serialize>(document: &T) -> std::result::Result<Self, serde_json::Error> {
        Ok(Self::index(serde_json::to_value(document)?))
    }

    fn meta(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.meta("_id", Value::String(id.into()))
    }

    /// 📡 Target index for this line; overrides the request-level index.
    pub fn in_index(self, index: impl Into<String>) -> Self {
        self.meta("_index", Value::String(index.into()))
    }

    pub fn routing(self, routing: impl Into<String>) -> Self {
        self.meta("routing", Value::String(routing.into()))
    }

    pub fn pipeline(self, pipeline: impl Into<String>) -> Self {
        self.meta("pipeline", Value::String(pipeline.into()))
    }

    pub fn if_seq_no(self, seq_no: i64) -> Self {
        self.meta("if_seq_no", json!(seq_no))
    }

    pub fn if_primary_term(self, primary_term: i64) -> Self {
        self.meta("if_primary_term", json!(primary_term))
    }

    pub fn retry_on_conflict(self, retries: u32) -> Self {
        self.meta("retry_on_conflict", json!(retries))
    }

    pub fn action(&self) -> BulkAction {
        self.action
    }
}

/// 🏭 Render operations into an NDJSON bulk body, trailing newline included.
pub fn render_bulk(operations: &[BulkOperation]) -> std::result::Result<String, serde_json::Error> {
    let estimated_size: usize = operations
        .iter()
        .map(|operation| match &operation.source {
            Some(BulkSource::Raw(raw)) => raw.len() + 100,
            _ => 200,
        })
        .sum();
    let mut body = String::with_capacity(estimated_size);

    for operation in operations {
        let mut action = Map::with_capacity(1);
        action.insert(
            operation.action.as_str().to_string(),
            Value::Object(operation.metadata.clone()),
        );
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');

        match &operation.source {
            Some(BulkSource::Raw(raw)) if memchr::memchr2(b'\n', b'\r', raw.as_bytes()).is_some() => {
                // -- a pretty-printed source would break the line protocol; squash it
                let value: Value = serde_json::from_str(raw)?;
                body.push_str(&serde_json::to_string(&value)?);
                body.push('\n');
            }
            Some(BulkSource::Raw(raw)) => {
                body.push_str(raw);
                body.push('\n');
            }
            Some(BulkSource::Value(value)) => {
                body.push_str(&serde_json::to_string(value)?);
                body.push('\n');
            }
            None => {}
        }
    }
    Ok(body)
}

/// 📦 A bulk request. Operations are rendered when the request is sent.
#[derive(Debug)]
pub struct BulkRequest {
    parts: RequestParts,
    operations: Vec<BulkOperation>,
}

impl BulkRequest {
    pub fn new() -> Self {
        Self {
            parts: RequestParts::default(),
            operations: Vec::new(),
        }
    }

    /// 📡 Default index for operations that don't name one.
    pub fn index(mut self, index: impl Into<Names>) -> Self {
        self.parts.route.set("index", index.into().to_string());
        self
    }

    pub fn push(mut self, operation: BulkOperation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn operations(mut self, operations: impl IntoIterator<Item = BulkOperation>) -> Self {
        self.operations.extend(operations);
        self
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl Default for BulkRequest {
    fn default() -> Self {
        Self::new()
    }
}

query_params!(BulkRequest {
    refresh: Refresh,
    routing: String,
    timeout: Time,
    pipeline: String,
    require_alias: bool,
    wait_for_active_shards: String,
    source_includes as "_source_includes": Names,
    source_excludes as "_source_excludes": Names,
});

impl Endpoint for BulkRequest {
    fn method(&self) -> reqwest::Method {
        reqwest::Method::POST
    }

    fn urls(&self) -> &'static UrlLookup {
        &BULK
    }

    fn into_parts(self) -> RequestParts {
        let mut parts = self.parts;
        parts.body = Some(render_bulk(&self.operations).map(Body::ndjson));
        parts
    }
}

impl Parameters for BulkRequest {
    fn parts_mut(&mut self) -> &mut RequestParts {
        &mut self.parts
    }
}

/// 📬 The bulk answer. `errors: true` means *some* items failed; check each one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub ingest_took: Option<u64>,
    #[serde(default)]
    pub items: Vec<BTreeMap<String, BulkItem>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkItem {
    #[serde(rename = "_index", default)]
    pub index: Option<String>,
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(rename = "_version", default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub result: Option<String>,
    pub status: u16,
    #[serde(default)]
    pub error: Option<ErrorCause>,
    #[serde(rename = "_shards", default)]
    pub shards: Option<ShardStatistics>,
    #[serde(rename = "_seq_no", default)]
    pub seq_no: Option<i64>,
    #[serde(rename = "_primary_term", default)]
    pub primary_term: Option<i64>,
}

impl BulkResponse {
    /// 🔥 Each item is `{"<action>": {...}}`; flatten that into `(action, item)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BulkItem)> {
        self.items
            .iter()
            .flat_map(|item| item.iter().map(|(action, item)| (action.as_str(), item)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &BulkItem)> {
        self.iter().filter(|(_, item)| item.error.is_some())
    }
}

impl Client {
    /// 📦 Send a batch of writes. A 200 with `errors: true` is still an `Ok`; per-item
    /// failures are in [`BulkResponse::failed`].
    pub async fn bulk(&self, request: BulkRequest) -> Result<BulkResponse> {
        self.transport().perform(request).await?.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::into_request;
    use crate::transport::{InMemoryConnection, RequestPath};
    use std::sync::Arc;

    #[test]
    fn the_one_where_every_action_renders_its_lines() {
        let operations = vec![
            BulkOperation::index(json!({"msg": "hello"})).id("1"),
            BulkOperation::create(r#"{"msg":"raw"}"#).in_index("other").routing("r"),
            BulkOperation::update("2", json!({"doc": {"msg": "updated"}})).retry_on_conflict(3),
            BulkOperation::delete("3"),
        ];
        let body = render_bulk(&operations).unwrap();
        assert_eq!(
            body,
            concat!(
                "{\"index\":{\"_id\":\"1\"}}\n",
                "{\"msg\":\"hello\"}\n",
                "{\"create\":{\"_index\":\"other\",\"routing\":\"r\"}}\n",
                "{\"msg\":\"raw\"}\n",
                "{\"update\":{\"_id\":\"2\",\"retry_on_conflict\":3}}\n",
                "{\"doc\":{\"msg\":\"updated\"}}\n",
                "{\"delete\":{\"_id\":\"3\"}}\n",
            )
        );
    }

    #[test]
    fn the_one_where_pretty_sources_get_squashed_onto_one_line() {
        let pretty = "{\n  \"msg\": \"hello\",\n  \"n\": 1\n}";
        let body = render_bulk(&[BulkOperation::index(pretty)]).unwrap();
        assert_eq!(body, "{\"index\":{}}\n{\"msg\":\"hello\",\"n\":1}\n");

        let broken = "{\n not json";
        assert!(render_bulk(&[BulkOperation::index(broken)]).is_err());
    }

    #[test]
    fn the_one_where_the_request_is_ndjson_against_the_right_path() {
        let request = BulkRequest::new()
            .index("logs")
            .refresh(Refresh::True)
            .push(BulkOperation::delete("1"));
        let request = into_request(request).unwrap();
        assert_eq!(request.path, RequestPath::Segments(vec!["logs".into(), "_bulk".into()]));
        let body = request.body.unwrap();
        assert_eq!(body.content_type(), "application/x-ndjson");
        assert_eq!(&body.bytes()[..], b"{\"delete\":{\"_id\":\"1\"}}\n");
    }

    #[test]
    fn the_one_where_a_broken_source_fails_before_it_leaves() {
        let request = BulkRequest::new().push(BulkOperation::index("{\n not json"));
        assert!(matches!(into_request(request), Err(crate::Error::Body(_))));
    }

    #[tokio::test]
    async fn the_one_where_some_items_fail_and_we_can_tell_which() {
        let fake = Arc::new(InMemoryConnection::new());
        fake.respond(
            "http://localhost:9200",
            200,
            json!({
                "took": 30,
                "errors": true,
                "items": [
                    {"index": {"_index": "logs", "_id": "1", "_version": 1, "result": "created", "status": 201,
                               "_shards": {"total": 2, "successful": 1, "failed": 0}, "_seq_no": 0, "_primary_term": 1}},
                    {"create": {"_index": "logs", "_id": "2", "status": 409,
                                "error": {"type": "version_conflict_engine_exception",
                                          "reason": "[2]: version conflict, document already exists",
                                          "index": "logs", "shard": "0", "index_uuid": "x"}}}
                ]
            })
            .to_string(),
        );
        let client = Client::in_memory("http://localhost:9200", fake).unwrap();
        let response = client
            .bulk(BulkRequest::new().index("logs").push(BulkOperation::index(json!({}))))
            .await
            .unwrap();

        assert!(response.errors);
        assert_eq!(response.iter().count(), 2);
        let failed: Vec<_> = response.failed().collect();
        assert_eq!(failed.len(), 1);
        let (action, item) = failed[0];
        assert_eq!(action, "create");
        assert_eq!(item.status, 409);
        assert_eq!(
            item.error.as_ref().unwrap().error_type.as_deref(),
            Some("version_conflict_engine_exception")
        );
    }
}

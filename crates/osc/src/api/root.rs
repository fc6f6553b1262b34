//! 🌳 Root operations: the ones that live directly on the client.
//!
//! Document sources are generic. Ask for `Box<RawValue>` and `_source` passes through
//! untouched, ask for your own struct and serde does the rest.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::common::{ShardStatistics, WriteResponse};
use crate::api::{
    ExpandWildcards, Names, OpType, Parameters, Refresh, SortOrder, UrlLookup, VersionType,
    get_or_post, put_with_id,
};
use crate::client::Client;
use crate::error::Result;
use crate::serialization::{Time, dates};
use crate::transport::{Transport, TransportResponse};

static INFO: UrlLookup = UrlLookup::new("info", &["/"]);
static PING: UrlLookup = UrlLookup::new("ping", &["/"]);
static INDEX: UrlLookup = UrlLookup::new("index", &["/{index}/_doc/{id}", "/{index}/_doc"]);
static GET_DOC: UrlLookup = UrlLookup::new("get", &["/{index}/_doc/{id}"]);
static DELETE_DOC: UrlLookup = UrlLookup::new("delete", &["/{index}/_doc/{id}"]);
static COUNT: UrlLookup = UrlLookup::new("count", &["/{index}/_count", "/_count"]);
static SEARCH: UrlLookup = UrlLookup::new("search", &["/{index}/_search", "/_search"]);

endpoint!(InfoRequest, GET, INFO);
endpoint!(PingRequest, HEAD, PING);
endpoint!(
    /// 📝 Index one document. PUT when you pick the id, POST when the cluster does.
    IndexRequest, fn put_with_id, INDEX
);
endpoint!(GetRequest, GET, GET_DOC);
endpoint!(DeleteRequest, DELETE, DELETE_DOC);
endpoint!(CountRequest, fn get_or_post, COUNT);
endpoint!(SearchRequest, fn get_or_post, SEARCH);

impl InfoRequest {
    pub fn new() -> Self {
        Self::blank()
    }
}

impl Default for InfoRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl PingRequest {
    pub fn new() -> Self {
        Self::blank()
    }
}

impl Default for PingRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexRequest {
    pub fn new(index: &str) -> Self {
        Self::blank().route("index", index)
    }

    pub fn id(self, id: impl std::fmt::Display) -> Self {
        self.route("id", id)
    }
}

impl GetRequest {
    pub fn new(index: &str, id: impl std::fmt::Display) -> Self {
        Self::blank().route("index", index).route("id", id)
    }
}

impl DeleteRequest {
    pub fn new(index: &str, id: impl std::fmt::Display) -> Self {
        Self::blank().route("index", index).route("id", id)
    }
}

impl CountRequest {
    pub fn new() -> Self {
        Self::blank()
    }

    pub fn index(self, index: impl Into<Names>) -> Self {
        self.route("index", index.into())
    }
}

impl Default for CountRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::blank()
    }

    pub fn index(self, index: impl Into<Names>) -> Self {
        self.route("index", index.into())
    }
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self::new()
    }
}

query_params!(IndexRequest {
    refresh: Refresh,
    routing: String,
    op_type: OpType,
    version: i64,
    version_type: VersionType,
    if_seq_no: i64,
    if_primary_term: i64,
    pipeline: String,
    timeout: Time,
    wait_for_active_shards: String,
    require_alias: bool,
});

query_params!(GetRequest {
    preference: String,
    realtime: bool,
    refresh: bool,
    routing: String,
    stored_fields: Names,
    source_enabled as "_source": bool,
    source_includes as "_source_includes": Names,
    source_excludes as "_source_excludes": Names,
    version: i64,
    version_type: VersionType,
});

query_params!(DeleteRequest {
    refresh: Refresh,
    routing: String,
    timeout: Time,
    version: i64,
    version_type: VersionType,
    if_seq_no: i64,
    if_primary_term: i64,
    wait_for_active_shards: String,
});

query_params!(CountRequest {
    q: String,
    analyzer: String,
    default_operator: String,
    df: String,
    allow_no_indices: bool,
    ignore_unavailable: bool,
    expand_wildcards: ExpandWildcards,
    min_score: f64,
    routing: String,
    terminate_after: i64,
});

query_params!(SearchRequest {
    q: String,
    from: i64,
    size: i64,
    sort: Names,
    scroll: Time,
    search_type: String,
    routing: String,
    preference: String,
    timeout: Time,
    track_total_hits: bool,
    track_scores: bool,
    allow_no_indices: bool,
    ignore_unavailable: bool,
    expand_wildcards: ExpandWildcards,
    request_cache: bool,
    typed_keys: bool,
    seq_no_primary_term: bool,
    version: bool,
    source_enabled as "_source": bool,
    source_includes as "_source_includes": Names,
    source_excludes as "_source_excludes": Names,
    terminate_after: i64,
});

json_body!(IndexRequest, CountRequest, SearchRequest);

impl SearchRequest {
    /// ↕️ Shorthand for `sort=field:order`.
    pub fn sort_by(self, field: &str, order: SortOrder) -> Self {
        self.sort(format!("{field}:{order}"))
    }
}

/// 👋 `GET /`: who are you and what version do you run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoResponse {
    pub name: String,
    pub cluster_name: String,
    #[serde(default)]
    pub cluster_uuid: Option<String>,
    pub version: VersionInfo,
    #[serde(default)]
    pub tagline: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    #[serde(default)]
    pub distribution: Option<String>,
    pub number: String,
    #[serde(default)]
    pub build_type: Option<String>,
    #[serde(default)]
    pub build_hash: Option<String>,
    #[serde(default, with = "dates::flexible_opt")]
    pub build_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub build_snapshot: bool,
    #[serde(default)]
    pub lucene_version: Option<String>,
    #[serde(default)]
    pub minimum_wire_compatibility_version: Option<String>,
    #[serde(default)]
    pub minimum_index_compatibility_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetResponse<T> {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_version", default)]
    pub version: Option<i64>,
    #[serde(rename = "_seq_no", default)]
    pub seq_no: Option<i64>,
    #[serde(rename = "_primary_term", default)]
    pub primary_term: Option<i64>,
    #[serde(rename = "_routing", default)]
    pub routing: Option<String>,
    #[serde(default)]
    pub found: bool,
    #[serde(rename = "_source", default = "Option::default")]
    pub source: Option<T>,
    #[serde(default)]
    pub fields: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
    #[serde(rename = "_shards", default)]
    pub shards: ShardStatistics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse<T> {
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(rename = "_shards", default)]
    pub shards: ShardStatistics,
    pub hits: Hits<T>,
    #[serde(default)]
    pub aggregations: Option<Value>,
    #[serde(rename = "_scroll_id", default)]
    pub scroll_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hits<T> {
    #[serde(default)]
    pub total: Option<TotalHits>,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default = "Vec::new")]
    pub hits: Vec<Hit<T>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalHits {
    pub value: u64,
    /// `eq` or `gte`
    #[serde(default = "TotalHits::exact")]
    pub relation: TotalHitsRelation,
}

impl TotalHits {
    fn exact() -> TotalHitsRelation {
        TotalHitsRelation::Eq
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalHitsRelation {
    Eq,
    Gte,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit<T> {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f64>,
    #[serde(rename = "_routing", default)]
    pub routing: Option<String>,
    #[serde(rename = "_source", default = "Option::default")]
    pub source: Option<T>,
    #[serde(default)]
    pub sort: Option<Vec<Value>>,
    #[serde(default)]
    pub fields: Option<Value>,
    #[serde(default)]
    pub highlight: Option<Value>,
}

impl Client {
    /// 👋 Cluster name, version, and the tagline nobody reads.
    pub async fn info(&self, request: InfoRequest) -> Result<InfoResponse> {
        self.transport().perform(request).await?.json()
    }

    /// 🏓 `HEAD /`. `Ok(false)` on a 404, an error when nobody answered at all.
    pub async fn ping(&self, request: PingRequest) -> Result<bool> {
        self.transport().exists(request).await
    }

    pub async fn index(&self, request: IndexRequest) -> Result<WriteResponse> {
        self.transport().perform(request).await?.json()
    }

    /// 📄 Fetch one document. A missing document is `found: false`, not an error;
    /// a missing *index* is still an error.
    pub async fn get<T: DeserializeOwned>(&self, request: GetRequest) -> Result<GetResponse<T>> {
        found_or_missing(self.transport(), request).await?.json()
    }

    /// 🗑️ A missing document comes back as `result: "not_found"`, not an error.
    pub async fn delete(&self, request: DeleteRequest) -> Result<WriteResponse> {
        found_or_missing(self.transport(), request).await?.json()
    }

    pub async fn count(&self, request: CountRequest) -> Result<CountResponse> {
        self.transport().perform(request).await?.json()
    }

    pub async fn search<T: DeserializeOwned>(&self, request: SearchRequest) -> Result<SearchResponse<T>> {
        self.transport().perform(request).await?.json()
    }
}

/// 🔍 Accept a 404 that talks about the document, reject a 404 that carries a server error.
async fn found_or_missing<E>(transport: &Transport, mut request: E) -> Result<TransportResponse>
where
    E: crate::api::Endpoint + Parameters,
{
    let config = request.parts_mut().config_mut();
    if !config.allows(404) {
        config.allowed_status_codes.push(404);
    }
    let response = transport.perform(request).await?;
    if response.status == 404 && response.server_error().is_some() {
        return Err(response.into_api_error());
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::into_request;
    use crate::transport::{InMemoryConnection, RequestPath};
    use reqwest::Method;
    use serde_json::json;
    use serde_json::value::RawValue;
    use std::sync::Arc;

    fn client() -> (Client, Arc<InMemoryConnection>) {
        let fake = Arc::new(InMemoryConnection::new());
        (Client::in_memory("http://localhost:9200", Arc::clone(&fake)).unwrap(), fake)
    }

    #[test]
    fn the_one_where_index_picks_its_verb_from_the_id() {
        let with_id = into_request(IndexRequest::new("logs").id(42).refresh(Refresh::WaitFor)).unwrap();
        assert_eq!(with_id.method, Method::PUT);
        assert_eq!(
            with_id.path,
            RequestPath::Segments(vec!["logs".into(), "_doc".into(), "42".into()])
        );
        assert_eq!(with_id.query, vec![("refresh".to_string(), "wait_for".to_string())]);

        let without = into_request(IndexRequest::new("logs")).unwrap();
        assert_eq!(without.method, Method::POST);
    }

    #[test]
    fn the_one_where_search_goes_post_only_when_it_has_a_body() {
        let bare = into_request(SearchRequest::new().index(["a", "b"]).size(5)).unwrap();
        assert_eq!(bare.method, Method::GET);
        assert_eq!(bare.path, RequestPath::Segments(vec!["a,b".into(), "_search".into()]));

        let with_query = SearchRequest::new()
            .body(&json!({"query": {"match_all": {}}}))
            .sort_by("@timestamp", SortOrder::Desc);
        let with_query = into_request(with_query).unwrap();
        assert_eq!(with_query.method, Method::POST);
        assert_eq!(with_query.path, RequestPath::Segments(vec!["_search".into()]));
        assert_eq!(with_query.query, vec![("sort".to_string(), "@timestamp:desc".to_string())]);
    }

    #[tokio::test]
    async fn the_one_where_sources_pass_through_untouched() {
        let (client, fake) = client();
        fake.respond(
            "http://localhost:9200",
            200,
            r#"{"_index":"logs","_id":"1","_version":3,"found":true,"_source":{"msg":"hi",  "n":1}}"#,
        );
        let doc: GetResponse<Box<RawValue>> = client.get(GetRequest::new("logs", 1)).await.unwrap();
        assert!(doc.found);
        assert_eq!(doc.version, Some(3));
        assert_eq!(doc.source.unwrap().get(), r#"{"msg":"hi",  "n":1}"#);
    }

    #[tokio::test]
    async fn the_one_where_a_missing_document_is_not_a_missing_index() {
        let (client, fake) = client();
        fake.respond("http://localhost:9200", 404, r#"{"_index":"logs","_id":"7","found":false}"#);
        let doc: GetResponse<Value> = client.get(GetRequest::new("logs", 7)).await.unwrap();
        assert!(!doc.found);
        assert!(doc.source.is_none());

        fake.respond(
            "http://localhost:9200",
            404,
            r#"{"error":{"type":"index_not_found_exception","reason":"no such index [nope]"},"status":404}"#,
        );
        let error = client.get::<Value>(GetRequest::new("nope", 7)).await.unwrap_err();
        assert!(error.is_not_found());
        assert_eq!(
            error.server_error().unwrap().error.error_type.as_deref(),
            Some("index_not_found_exception")
        );
    }

    #[tokio::test]
    async fn the_one_where_search_hits_come_back_typed() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct LogLine {
            msg: String,
        }

        let (client, fake) = client();
        fake.respond(
            "http://localhost:9200",
            200,
            json!({
                "took": 3, "timed_out": false,
                "_shards": {"total": 1, "successful": 1, "skipped": 0, "failed": 0},
                "hits": {
                    "total": {"value": 1, "relation": "eq"},
                    "max_score": 1.0,
                    "hits": [{"_index": "logs", "_id": "1", "_score": 1.0, "_source": {"msg": "hello"}}]
                }
            })
            .to_string(),
        );
        let response: SearchResponse<LogLine> = client.search(SearchRequest::new().index("logs")).await.unwrap();
        assert_eq!(response.hits.total.unwrap().value, 1);
        assert_eq!(
            response.hits.hits[0].source,
            Some(LogLine {
                msg: "hello".into()
            })
        );
        assert_eq!(response.shards.skipped, Some(0));
    }

    #[tokio::test]
    async fn the_one_where_info_knows_the_build_date() {
        let (client, fake) = client();
        fake.respond(
            "http://localhost:9200",
            200,
            json!({
                "name": "node-1",
                "cluster_name": "prod",
                "cluster_uuid": "abc",
                "version": {
                    "distribution": "opensearch",
                    "number": "2.11.0",
                    "build_type": "tar",
                    "build_date": "2023-10-13T02:55:55.511945994Z",
                    "build_snapshot": false,
                    "lucene_version": "9.7.0"
                },
                "tagline": "The OpenSearch Project: https://opensearch.org/"
            })
            .to_string(),
        );
        let info = client.info(InfoRequest::new()).await.unwrap();
        assert_eq!(info.version.number, "2.11.0");
        assert_eq!(
            info.version.build_date.map(|date| date.timestamp()),
            Some(1_697_165_755)
        );
        assert!(client.ping(PingRequest::new()).await.unwrap());
    }
}

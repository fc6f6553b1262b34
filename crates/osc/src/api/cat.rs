//! 🐱 The `_cat` APIs: compact, column-oriented diagnostics meant for humans.
//!
//! We always ask for `format=json`, so each row comes back as an object of strings.
//! A handful of APIs get typed records; every API can be read as generic [`CatRow`]s.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::params::string_enum;
use crate::api::{Bytes, Endpoint, ExpandWildcards, HealthStatus, Names, Parameters, RequestParts, UrlLookup};
use crate::error::Result;
use crate::serialization::Time;
use crate::transport::Transport;

string_enum!(
    /// 📋 Every cat API we know how to call.
    CatApi {
        Aliases => "aliases",
        Allocation => "allocation",
        Count => "count",
        Health => "health",
        Indices => "indices",
        Nodes => "nodes",
        PendingTasks => "pending_tasks",
        Plugins => "plugins",
        Recovery => "recovery",
        Repositories => "repositories",
        Segments => "segments",
        Shards => "shards",
        Snapshots => "snapshots",
        Tasks => "tasks",
        Templates => "templates",
        ThreadPool => "thread_pool",
    }
);

static CAT_ALIASES: UrlLookup = UrlLookup::new("cat.aliases", &["/_cat/aliases/{name}", "/_cat/aliases"]);
static CAT_ALLOCATION: UrlLookup =
    UrlLookup::new("cat.allocation", &["/_cat/allocation/{node_id}", "/_cat/allocation"]);
static CAT_COUNT: UrlLookup = UrlLookup::new("cat.count", &["/_cat/count/{index}", "/_cat/count"]);
static CAT_HEALTH: UrlLookup = UrlLookup::new("cat.health", &["/_cat/health"]);
static CAT_INDICES: UrlLookup = UrlLookup::new("cat.indices", &["/_cat/indices/{index}", "/_cat/indices"]);
static CAT_NODES: UrlLookup = UrlLookup::new("cat.nodes", &["/_cat/nodes"]);
static CAT_PENDING_TASKS: UrlLookup = UrlLookup::new("cat.pending_tasks", &["/_cat/pending_tasks"]);
static CAT_PLUGINS: UrlLookup = UrlLookup::new("cat.plugins", &["/_cat/plugins"]);
static CAT_RECOVERY: UrlLookup = UrlLookup::new("cat.recovery", &["/_cat/recovery/{index}", "/_cat/recovery"]);
static CAT_REPOSITORIES: UrlLookup = UrlLookup::new("cat.repositories", &["/_cat/repositories"]);
static CAT_SEGMENTS: UrlLookup = UrlLookup::new("cat.segments", &["/_cat/segments/{index}", "/_cat/segments"]);
static CAT_SHARDS: UrlLookup = UrlLookup::new("cat.shards", &["/_cat/shards/{index}", "/_cat/shards"]);
static CAT_SNAPSHOTS: UrlLookup =
    UrlLookup::new("cat.snapshots", &["/_cat/snapshots/{repository}", "/_cat/snapshots"]);
static CAT_TASKS: UrlLookup = UrlLookup::new("cat.tasks", &["/_cat/tasks"]);
static CAT_TEMPLATES: UrlLookup = UrlLookup::new("cat.templates", &["/_cat/templates/{name}", "/_cat/templates"]);
static CAT_THREAD_POOL: UrlLookup = UrlLookup::new(
    "cat.thread_pool",
    &["/_cat/thread_pool/{thread_pool_patterns}", "/_cat/thread_pool"],
);

impl CatApi {
    pub fn urls(&self) -> &'static UrlLookup {
        match self {
            CatApi::Aliases => &CAT_ALIASES,
            CatApi::Allocation => &CAT_ALLOCATION,
            CatApi::Count => &CAT_COUNT,
            CatApi::Health => &CAT_HEALTH,
            CatApi::Indices => &CAT_INDICES,
            CatApi::Nodes => &CAT_NODES,
            CatApi::PendingTasks => &CAT_PENDING_TASKS,
            CatApi::Plugins => &CAT_PLUGINS,
            CatApi::Recovery => &CAT_RECOVERY,
            CatApi::Repositories => &CAT_REPOSITORIES,
            CatApi::Segments => &CAT_SEGMENTS,
            CatApi::Shards => &CAT_SHARDS,
            CatApi::Snapshots => &CAT_SNAPSHOTS,
            CatApi::Tasks => &CAT_TASKS,
            CatApi::Templates => &CAT_TEMPLATES,
            CatApi::ThreadPool => &CAT_THREAD_POOL,
        }
    }

    /// 🎯 The path parameter this API narrows by, if it takes one at all.
    pub fn target_key(&self) -> Option<&'static str> {
        match self {
            CatApi::Aliases | CatApi::Templates => Some("name"),
            CatApi::Allocation => Some("node_id"),
            CatApi::Count | CatApi::Indices | CatApi::Recovery | CatApi::Segments | CatApi::Shards => {
                Some("index")
            }
            CatApi::Snapshots => Some("repository"),
            CatApi::ThreadPool => Some("thread_pool_patterns"),
            CatApi::Health
            | CatApi::Nodes
            | CatApi::PendingTasks
            | CatApi::Plugins
            | CatApi::Repositories
            | CatApi::Tasks => None,
        }
    }
}

/// 🐱 One request against one cat API.
#[derive(Debug)]
pub struct CatRequest {
    api: CatApi,
    parts: RequestParts,
}

impl CatRequest {
    pub fn new(api: CatApi) -> Self {
        let mut parts = RequestParts::default();
        parts.query.set("format", "json");
        Self { api, parts }
    }

    pub fn api(&self) -> CatApi {
        self.api
    }

    /// 🎯 Narrow to an index, alias, node, repository... whatever this API narrows by.
    /// APIs that take no target fail to resolve when given one.
    pub fn target(mut self, target: impl Into<Names>) -> Self {
        let key = self.api.target_key().unwrap_or("target");
        self.parts.route.set(key, target.into().to_string());
        self
    }
}

query_params!(CatRequest {
    bytes: Bytes,
    columns as "h": Names,
    sort as "s": Names,
    verbose as "v": bool,
    local: bool,
    cluster_manager_timeout: Time,
    expand_wildcards: ExpandWildcards,
    health: HealthStatus,
    pri: bool,
    time: String,
    ts: bool,
    active_only: bool,
    detailed: bool,
    ignore_unavailable: bool,
});

impl Endpoint for CatRequest {
    fn method(&self) -> reqwest::Method {
        reqwest::Method::GET
    }

    fn urls(&self) -> &'static UrlLookup {
        self.api.urls()
    }

    fn into_parts(self) -> RequestParts {
        self.parts
    }
}

impl Parameters for CatRequest {
    fn parts_mut(&mut self) -> &mut RequestParts {
        &mut self.parts
    }
}

/// 🧾 One cat row as-is: column name to value (mostly strings, `null` for blanks).
pub type CatRow = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatAliasRecord {
    pub alias: Option<String>,
    pub index: Option<String>,
    pub filter: Option<String>,
    #[serde(rename = "routing.index")]
    pub routing_index: Option<String>,
    #[serde(rename = "routing.search")]
    pub routing_search: Option<String>,
    pub is_write_index: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatIndexRecord {
    pub health: Option<String>,
    pub status: Option<String>,
    pub index: Option<String>,
    pub uuid: Option<String>,
    pub pri: Option<String>,
    pub rep: Option<String>,
    #[serde(rename = "docs.count")]
    pub docs_count: Option<String>,
    #[serde(rename = "docs.deleted")]
    pub docs_deleted: Option<String>,
    #[serde(rename = "store.size")]
    pub store_size: Option<String>,
    #[serde(rename = "pri.store.size")]
    pub pri_store_size: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatHealthRecord {
    pub epoch: Option<String>,
    pub timestamp: Option<String>,
    pub cluster: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "node.total")]
    pub node_total: Option<String>,
    #[serde(rename = "node.data")]
    pub node_data: Option<String>,
    pub shards: Option<String>,
    pub pri: Option<String>,
    pub relo: Option<String>,
    pub init: Option<String>,
    pub unassign: Option<String>,
    pub pending_tasks: Option<String>,
    pub max_task_wait_time: Option<String>,
    pub active_shards_percent: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatNodeRecord {
    pub ip: Option<String>,
    #[serde(rename = "heap.percent")]
    pub heap_percent: Option<String>,
    #[serde(rename = "ram.percent")]
    pub ram_percent: Option<String>,
    pub cpu: Option<String>,
    pub load_1m: Option<String>,
    pub load_5m: Option<String>,
    pub load_15m: Option<String>,
    #[serde(rename = "node.role")]
    pub node_role: Option<String>,
    /// `*` on the elected cluster manager; older clusters call the column `master`
    #[serde(alias = "master")]
    pub cluster_manager: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatCountRecord {
    pub epoch: Option<String>,
    pub timestamp: Option<String>,
    pub count: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatShardRecord {
    pub index: Option<String>,
    pub shard: Option<String>,
    pub prirep: Option<String>,
    pub state: Option<String>,
    pub docs: Option<String>,
    pub store: Option<String>,
    pub ip: Option<String>,
    pub node: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatSnapshotRecord {
    pub id: Option<String>,
    pub status: Option<String>,
    pub start_epoch: Option<String>,
    pub start_time: Option<String>,
    pub end_epoch: Option<String>,
    pub end_time: Option<String>,
    pub duration: Option<String>,
    pub indices: Option<String>,
    pub successful_shards: Option<String>,
    pub failed_shards: Option<String>,
    pub total_shards: Option<String>,
}

/// 🐱 `client.cat()`
#[derive(Debug, Clone, Copy)]
pub struct Cat<'a> {
    transport: &'a Transport,
}

impl<'a> Cat<'a> {
    pub(crate) fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    /// 🧾 Any cat API, any columns, as loose rows.
    pub async fn rows(&self, request: CatRequest) -> Result<Vec<CatRow>> {
        self.records(request).await
    }

    /// 🧬 Any cat API decoded into a record type of your choosing.
    pub async fn records<T: DeserializeOwned>(&self, request: CatRequest) -> Result<Vec<T>> {
        self.transport.perform(request).await?.json()
    }

    pub async fn aliases(&self) -> Result<Vec<CatAliasRecord>> {
        self.records(CatRequest::new(CatApi::Aliases)).await
    }

    pub async fn indices(&self) -> Result<Vec<CatIndexRecord>> {
        self.records(CatRequest::new(CatApi::Indices)).await
    }

    pub async fn health(&self) -> Result<Vec<CatHealthRecord>> {
        self.records(CatRequest::new(CatApi::Health)).await
    }

    pub async fn nodes(&self) -> Result<Vec<CatNodeRecord>> {
        self.records(CatRequest::new(CatApi::Nodes)).await
    }

    pub async fn count(&self) -> Result<Vec<CatCountRecord>> {
        self.records(CatRequest::new(CatApi::Count)).await
    }

    pub async fn shards(&self) -> Result<Vec<CatShardRecord>> {
        self.records(CatRequest::new(CatApi::Shards)).await
    }

    pub async fn snapshots(&self, repository: &str) -> Result<Vec<CatSnapshotRecord>> {
        self.records(CatRequest::new(CatApi::Snapshots).target(repository)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::into_request;
    use crate::client::Client;
    use crate::error::Error;
    use crate::transport::{InMemoryConnection, RequestPath};
    use std::sync::Arc;

    #[test]
    fn the_one_where_targets_land_on_the_right_placeholder() {
        let request = into_request(CatRequest::new(CatApi::Indices).target(["logs-*", "metrics"]).verbose(true))
            .unwrap();
        assert_eq!(
            request.path,
            RequestPath::Segments(vec!["_cat".into(), "indices".into(), "logs-*,metrics".into()])
        );
        assert_eq!(
            request.query,
            vec![
                ("format".to_string(), "json".to_string()),
                ("v".to_string(), "true".to_string()),
            ]
        );

        let snapshots = into_request(CatRequest::new(CatApi::Snapshots).target("backups")).unwrap();
        assert_eq!(
            snapshots.path,
            RequestPath::Segments(vec!["_cat".into(), "snapshots".into(), "backups".into()])
        );
    }

    #[test]
    fn the_one_where_health_refuses_a_target() {
        let error = into_request(CatRequest::new(CatApi::Health).target("logs")).unwrap_err();
        assert!(matches!(error, Error::Route { .. }));
    }

    #[test]
    fn the_one_where_every_api_has_a_table() {
        for api in CatApi::ALL {
            let request = into_request(CatRequest::new(*api)).unwrap();
            assert_eq!(
                request.path,
                RequestPath::Segments(vec!["_cat".into(), api.as_str().into()])
            );
        }
    }

    #[tokio::test]
    async fn the_one_where_rows_come_back_typed_or_loose() {
        let fake = Arc::new(InMemoryConnection::new());
        let body = r#"[{"health":"green","status":"open","index":"logs","uuid":"u1","pri":"1","rep":"0",
                        "docs.count":"42","docs.deleted":"0","store.size":"10kb","pri.store.size":"10kb"}]"#;
        fake.respond("http://localhost:9200", 200, body);
        fake.respond("http://localhost:9200", 200, body);
        let client = Client::in_memory("http://localhost:9200", Arc::clone(&fake)).unwrap();

        let typed = client.cat().indices().await.unwrap();
        assert_eq!(typed[0].docs_count.as_deref(), Some("42"));
        assert_eq!(typed[0].health.as_deref(), Some("green"));

        let loose = client.cat().rows(CatRequest::new(CatApi::Indices)).await.unwrap();
        assert_eq!(loose[0]["store.size"], Value::String("10kb".into()));
        assert_eq!(fake.calls()[0].url.query(), Some("format=json"));
    }
}

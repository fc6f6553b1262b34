//! 🗂️ Index management: lifecycle, mappings, settings, aliases and composable templates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::common::{Acknowledged, ShardStatistics, ShardsAcknowledged};
use crate::api::{Endpoint, ExpandWildcards, Names, Parameters, RequestParts, UrlLookup};
use crate::error::Result;
use crate::serialization::Time;
use crate::transport::Transport;

static CREATE_INDEX: UrlLookup = UrlLookup::new("indices.create", &["/{index}"]);
static DELETE_INDEX: UrlLookup = UrlLookup::new("indices.delete", &["/{index}"]);
static INDEX_EXISTS: UrlLookup = UrlLookup::new("indices.exists", &["/{index}"]);
static GET_INDEX: UrlLookup = UrlLookup::new("indices.get", &["/{index}"]);
static REFRESH: UrlLookup = UrlLookup::new("indices.refresh", &["/{index}/_refresh", "/_refresh"]);
static OPEN: UrlLookup = UrlLookup::new("indices.open", &["/{index}/_open"]);
static CLOSE: UrlLookup = UrlLookup::new("indices.close", &["/{index}/_close"]);
static PUT_MAPPING: UrlLookup = UrlLookup::new("indices.put_mapping", &["/{index}/_mapping"]);
static GET_MAPPING: UrlLookup = UrlLookup::new("indices.get_mapping", &["/{index}/_mapping", "/_mapping"]);
static GET_SETTINGS: UrlLookup = UrlLookup::new(
    "indices.get_settings",
    &["/{index}/_settings/{name}", "/{index}/_settings", "/_settings/{name}", "/_settings"],
);
static PUT_SETTINGS: UrlLookup = UrlLookup::new("indices.put_settings", &["/{index}/_settings", "/_settings"]);
static PUT_ALIAS: UrlLookup = UrlLookup::new("indices.put_alias", &["/{index}/_alias/{name}"]);
static DELETE_ALIAS: UrlLookup = UrlLookup::new("indices.delete_alias", &["/{index}/_alias/{name}"]);
static GET_ALIAS: UrlLookup = UrlLookup::new(
    "indices.get_alias",
    &["/{index}/_alias/{name}", "/{index}/_alias", "/_alias/{name}", "/_alias"],
);
static ALIAS_EXISTS: UrlLookup =
    UrlLookup::new("indices.exists_alias", &["/{index}/_alias/{name}", "/_alias/{name}"]);
static UPDATE_ALIASES: UrlLookup = UrlLookup::new("indices.update_aliases", &["/_aliases"]);
static PUT_INDEX_TEMPLATE: UrlLookup = UrlLookup::new("indices.put_index_template", &["/_index_template/{name}"]);
static GET_INDEX_TEMPLATE: UrlLookup =
    UrlLookup::new("indices.get_index_template", &["/_index_template/{name}", "/_index_template"]);
static DELETE_INDEX_TEMPLATE: UrlLookup =
    UrlLookup::new("indices.delete_index_template", &["/_index_template/{name}"]);

endpoint!(
    /// 🆕 Create an index, optionally with settings, mappings and aliases in the body.
    CreateIndexRequest, PUT, CREATE_INDEX
);
endpoint!(DeleteIndexRequest, DELETE, DELETE_INDEX);
endpoint!(IndexExistsRequest, HEAD, INDEX_EXISTS);
endpoint!(GetIndexRequest, GET, GET_INDEX);
endpoint!(RefreshRequest, POST, REFRESH);
endpoint!(OpenIndexRequest, POST, OPEN);
endpoint!(CloseIndexRequest, POST, CLOSE);
endpoint!(PutMappingRequest, PUT, PUT_MAPPING);
endpoint!(GetMappingRequest, GET, GET_MAPPING);
endpoint!(GetIndexSettingsRequest, GET, GET_SETTINGS);
endpoint!(PutIndexSettingsRequest, PUT, PUT_SETTINGS);
endpoint!(PutAliasRequest, PUT, PUT_ALIAS);
endpoint!(DeleteAliasRequest, DELETE, DELETE_ALIAS);
endpoint!(GetAliasRequest, GET, GET_ALIAS);
endpoint!(AliasExistsRequest, HEAD, ALIAS_EXISTS);
endpoint!(PutIndexTemplateRequest, PUT, PUT_INDEX_TEMPLATE);
endpoint!(GetIndexTemplateRequest, GET, GET_INDEX_TEMPLATE);
endpoint!(DeleteIndexTemplateRequest, DELETE, DELETE_INDEX_TEMPLATE);

impl CreateIndexRequest {
    pub fn new(index: &str) -> Self {
        Self::blank().route("index", index)
    }
}

impl DeleteIndexRequest {
    pub fn new(index: impl Into<Names>) -> Self {
        Self::blank().route("index", index.into())
    }
}

impl IndexExistsRequest {
    pub fn new(index: impl Into<Names>) -> Self {
        Self::blank().route("index", index.into())
    }
}

impl GetIndexRequest {
    pub fn new(index: impl Into<Names>) -> Self {
        Self::blank().route("index", index.into())
    }
}

impl RefreshRequest {
    pub fn new() -> Self {
        Self::blank()
    }

    pub fn index(self, index: impl Into<Names>) -> Self {
        self.route("index", index.into())
    }
}

impl OpenIndexRequest {
    pub fn new(index: impl Into<Names>) -> Self {
        Self::blank().route("index", index.into())
    }
}

impl CloseIndexRequest {
    pub fn new(index: impl Into<Names>) -> Self {
        Self::blank().route("index", index.into())
    }
}

impl PutMappingRequest {
    pub fn new(index: impl Into<Names>) -> Self {
        Self::blank().route("index", index.into())
    }
}

impl GetMappingRequest {
    pub fn new() -> Self {
        Self::blank()
    }

    pub fn index(self, index: impl Into<Names>) -> Self {
        self.route("index", index.into())
    }
}

impl GetIndexSettingsRequest {
    pub fn new() -> Self {
        Self::blank()
    }

    pub fn index(self, index: impl Into<Names>) -> Self {
        self.route("index", index.into())
    }

    /// 🔍 Only settings matching these names, e.g. `index.number_of_*`.
    pub fn name(self, name: impl Into<Names>) -> Self {
        self.route("name", name.into())
    }
}

impl PutIndexSettingsRequest {
    pub fn new() -> Self {
        Self::blank()
    }

    pub fn index(self, index: impl Into<Names>) -> Self {
        self.route("index", index.into())
    }
}

impl PutAliasRequest {
    pub fn new(index: impl Into<Names>, name: &str) -> Self {
        Self::blank().route("index", index.into()).route("name", name)
    }
}

impl DeleteAliasRequest {
    pub fn new(index: impl Into<Names>, name: impl Into<Names>) -> Self {
        Self::blank().route("index", index.into()).route("name", name.into())
    }
}

impl GetAliasRequest {
    pub fn new() -> Self {
        Self::blank()
    }

    pub fn index(self, index: impl Into<Names>) -> Self {
        self.route("index", index.into())
    }

    pub fn name(self, name: impl Into<Names>) -> Self {
        self.route("name", name.into())
    }
}

impl AliasExistsRequest {
    pub fn new(name: impl Into<Names>) -> Self {
        Self::blank().route("name", name.into())
    }

    pub fn index(self, index: impl Into<Names>) -> Self {
        self.route("index", index.into())
    }
}

impl PutIndexTemplateRequest {
    pub fn new(name: &str) -> Self {
        Self::blank().route("name", name)
    }
}

impl GetIndexTemplateRequest {
    pub fn new() -> Self {
        Self::blank()
    }

    /// wildcards welcome
    pub fn name(self, name: &str) -> Self {
        self.route("name", name)
    }
}

impl DeleteIndexTemplateRequest {
    pub fn new(name: &str) -> Self {
        Self::blank().route("name", name)
    }
}

default_via_new!(
    RefreshRequest,
    GetMappingRequest,
    GetIndexSettingsRequest,
    PutIndexSettingsRequest,
    GetAliasRequest,
    GetIndexTemplateRequest,
);

query_params!(CreateIndexRequest {
    wait_for_active_shards: String,
    timeout: Time,
    cluster_manager_timeout: Time,
});

query_params!(DeleteIndexRequest {
    timeout: Time,
    cluster_manager_timeout: Time,
    ignore_unavailable: bool,
    allow_no_indices: bool,
    expand_wildcards: ExpandWildcards,
});

query_params!(IndexExistsRequest {
    local: bool,
    flat_settings: bool,
    include_defaults: bool,
    ignore_unavailable: bool,
    allow_no_indices: bool,
    expand_wildcards: ExpandWildcards,
});

query_params!(GetIndexRequest {
    local: bool,
    flat_settings: bool,
    include_defaults: bool,
    ignore_unavailable: bool,
    allow_no_indices: bool,
    expand_wildcards: ExpandWildcards,
    cluster_manager_timeout: Time,
});

query_params!(RefreshRequest {
    ignore_unavailable: bool,
    allow_no_indices: bool,
    expand_wildcards: ExpandWildcards,
});

query_params!(OpenIndexRequest {
    wait_for_active_shards: String,
    timeout: Time,
    cluster_manager_timeout: Time,
    ignore_unavailable: bool,
    allow_no_indices: bool,
    expand_wildcards: ExpandWildcards,
    wait_for_completion: bool,
});

query_params!(CloseIndexRequest {
    wait_for_active_shards: String,
    timeout: Time,
    cluster_manager_timeout: Time,
    ignore_unavailable: bool,
    allow_no_indices: bool,
    expand_wildcards: ExpandWildcards,
});

query_params!(PutMappingRequest {
    timeout: Time,
    cluster_manager_timeout: Time,
    write_index_only: bool,
    ignore_unavailable: bool,
    allow_no_indices: bool,
    expand_wildcards: ExpandWildcards,
});

query_params!(GetMappingRequest {
    local: bool,
    cluster_manager_timeout: Time,
    ignore_unavailable: bool,
    allow_no_indices: bool,
    expand_wildcards: ExpandWildcards,
});

query_params!(GetIndexSettingsRequest {
    local: bool,
    flat_settings: bool,
    include_defaults: bool,
    cluster_manager_timeout: Time,
    ignore_unavailable: bool,
    allow_no_indices: bool,
    expand_wildcards: ExpandWildcards,
});

query_params!(PutIndexSettingsRequest {
    flat_settings: bool,
    preserve_existing: bool,
    timeout: Time,
    cluster_manager_timeout: Time,
    ignore_unavailable: bool,
    allow_no_indices: bool,
    expand_wildcards: ExpandWildcards,
});

query_params!(PutAliasRequest {
    timeout: Time,
    cluster_manager_timeout: Time,
});

query_params!(DeleteAliasRequest {
    timeout: Time,
    cluster_manager_timeout: Time,
});

query_params!(GetAliasRequest {
    local: bool,
    ignore_unavailable: bool,
    allow_no_indices: bool,
    expand_wildcards: ExpandWildcards,
});

query_params!(AliasExistsRequest {
    local: bool,
    ignore_unavailable: bool,
    allow_no_indices: bool,
    expand_wildcards: ExpandWildcards,
});

query_params!(PutIndexTemplateRequest {
    create: bool,
    cause: String,
    cluster_manager_timeout: Time,
});

query_params!(GetIndexTemplateRequest {
    local: bool,
    flat_settings: bool,
    cluster_manager_timeout: Time,
});

query_params!(DeleteIndexTemplateRequest {
    timeout: Time,
    cluster_manager_timeout: Time,
});

json_body!(
    CreateIndexRequest,
    PutMappingRequest,
    PutIndexSettingsRequest,
    PutAliasRequest,
    PutIndexTemplateRequest,
);

/// 🔀 One step of an atomic `_aliases` update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasAction {
    Add(AliasTarget),
    Remove(AliasTarget),
    RemoveIndex { index: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AliasTarget {
    pub index: String,
    pub alias: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_write_index: Option<bool>,
}

impl AliasTarget {
    pub fn new(index: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            alias: alias.into(),
            ..Self::default()
        }
    }
}

/// 🔀 Swap, add and drop aliases in one atomic step. Blue/green reindexing's best friend.
#[derive(Debug, Default)]
pub struct UpdateAliasesRequest {
    parts: RequestParts,
    actions: Vec<AliasAction>,
}

impl UpdateAliasesRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action(mut self, action: AliasAction) -> Self {
        self.actions.push(action);
        self
    }

    pub fn add(self, index: impl Into<String>, alias: impl Into<String>) -> Self {
        self.action(AliasAction::Add(AliasTarget::new(index, alias)))
    }

    pub fn remove(self, index: impl Into<String>, alias: impl Into<String>) -> Self {
        self.action(AliasAction::Remove(AliasTarget::new(index, alias)))
    }

    pub fn remove_index(self, index: impl Into<String>) -> Self {
        self.action(AliasAction::RemoveIndex { index: index.into() })
    }
}

query_params!(UpdateAliasesRequest {
    timeout: Time,
    cluster_manager_timeout: Time,
});

impl Endpoint for UpdateAliasesRequest {
    fn method(&self) -> reqwest::Method {
        reqwest::Method::POST
    }

    fn urls(&self) -> &'static UrlLookup {
        &UPDATE_ALIASES
    }

    fn into_parts(self) -> RequestParts {
        let mut parts = self.parts;
        parts.set_json(&serde_json::json!({ "actions": self.actions }));
        parts
    }
}

impl Parameters for UpdateAliasesRequest {
    fn parts_mut(&mut self) -> &mut RequestParts {
        &mut self.parts
    }
}

/// 📦 What `GET /{index}` returns per index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexState {
    #[serde(default)]
    pub aliases: BTreeMap<String, AliasDefinition>,
    #[serde(default)]
    pub mappings: Value,
    #[serde(default)]
    pub settings: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AliasDefinition {
    #[serde(default)]
    pub filter: Option<Value>,
    #[serde(default)]
    pub index_routing: Option<String>,
    #[serde(default)]
    pub search_routing: Option<String>,
    #[serde(default)]
    pub is_write_index: Option<bool>,
    #[serde(default)]
    pub is_hidden: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexAliases {
    #[serde(default)]
    pub aliases: BTreeMap<String, AliasDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexMappings {
    #[serde(default)]
    pub mappings: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSettings {
    #[serde(default)]
    pub settings: Value,
    /// only with `include_defaults=true`
    #[serde(default)]
    pub defaults: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshResponse {
    #[serde(rename = "_shards", default)]
    pub shards: ShardStatistics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloseIndexResponse {
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub shards_acknowledged: bool,
    #[serde(default)]
    pub indices: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexTemplatesResponse {
    #[serde(default)]
    pub index_templates: Vec<NamedIndexTemplate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedIndexTemplate {
    pub name: String,
    pub index_template: IndexTemplate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexTemplate {
    #[serde(default)]
    pub index_patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub composed_of: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_stream: Option<Value>,
}

/// 🗂️ `client.indices()`
#[derive(Debug, Clone, Copy)]
pub struct Indices<'a> {
    transport: &'a Transport,
}

impl<'a> Indices<'a> {
    pub(crate) fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    pub async fn create(&self, request: CreateIndexRequest) -> Result<ShardsAcknowledged> {
        self.transport.perform(request).await?.json()
    }

    pub async fn delete(&self, request: DeleteIndexRequest) -> Result<Acknowledged> {
        self.transport.perform(request).await?.json()
    }

    /// ❓ `Ok(false)` on 404.
    pub async fn exists(&self, request: IndexExistsRequest) -> Result<bool> {
        self.transport.exists(request).await
    }

    /// 🔍 Keyed by concrete index name, so wildcards fan out into one entry per index.
    pub async fn get(&self, request: GetIndexRequest) -> Result<BTreeMap<String, IndexState>> {
        self.transport.perform(request).await?.json()
    }

    pub async fn refresh(&self, request: RefreshRequest) -> Result<RefreshResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn open(&self, request: OpenIndexRequest) -> Result<ShardsAcknowledged> {
        self.transport.perform(request).await?.json()
    }

    pub async fn close(&self, request: CloseIndexRequest) -> Result<CloseIndexResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn put_mapping(&self, request: PutMappingRequest) -> Result<Acknowledged> {
        self.transport.perform(request).await?.json()
    }

    pub async fn get_mapping(&self, request: GetMappingRequest) -> Result<BTreeMap<String, IndexMappings>> {
        self.transport.perform(request).await?.json()
    }

    pub async fn get_settings(&self, request: GetIndexSettingsRequest) -> Result<BTreeMap<String, IndexSettings>> {
        self.transport.perform(request).await?.json()
    }

    pub async fn put_settings(&self, request: PutIndexSettingsRequest) -> Result<Acknowledged> {
        self.transport.perform(request).await?.json()
    }

    pub async fn put_alias(&self, request: PutAliasRequest) -> Result<Acknowledged> {
        self.transport.perform(request).await?.json()
    }

    pub async fn delete_alias(&self, request: DeleteAliasRequest) -> Result<Acknowledged> {
        self.transport.perform(request).await?.json()
    }

    pub async fn get_alias(&self, request: GetAliasRequest) -> Result<BTreeMap<String, IndexAliases>> {
        self.transport.perform(request).await?.json()
    }

    pub async fn alias_exists(&self, request: AliasExistsRequest) -> Result<bool> {
        self.transport.exists(request).await
    }

    pub async fn update_aliases(&self, request: UpdateAliasesRequest) -> Result<Acknowledged> {
        self.transport.perform(request).await?.json()
    }

    pub async fn put_index_template(&self, request: PutIndexTemplateRequest) -> Result<Acknowledged> {
        self.transport.perform(request).await?.json()
    }

    pub async fn get_index_template(&self, request: GetIndexTemplateRequest) -> Result<IndexTemplatesResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn delete_index_template(&self, request: DeleteIndexTemplateRequest) -> Result<Acknowledged> {
        self.transport.perform(request).await?.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::into_request;
    use crate::client::Client;
    use crate::transport::{InMemoryConnection, RequestPath};
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;

    fn client() -> (Client, Arc<InMemoryConnection>) {
        let fake = Arc::new(InMemoryConnection::new());
        (Client::in_memory("http://localhost:9200", Arc::clone(&fake)).unwrap(), fake)
    }

    #[tokio::test]
    async fn the_one_where_an_index_is_born_with_mappings() {
        let (client, fake) = client();
        fake.respond(
            "http://localhost:9200",
            200,
            r#"{"acknowledged":true,"shards_acknowledged":true,"index":"logs"}"#,
        );
        let created = client
            .indices()
            .create(
                CreateIndexRequest::new("logs")
                    .wait_for_active_shards("1")
                    .body(&json!({"mappings": {"properties": {"msg": {"type": "text"}}}})),
            )
            .await
            .unwrap();
        assert!(created.shards_acknowledged);
        assert_eq!(created.index.as_deref(), Some("logs"));

        let call = &fake.calls()[0];
        assert_eq!(call.method, Method::PUT);
        assert_eq!(call.url.path(), "/logs");
        let sent: Value = serde_json::from_slice(call.body.as_ref().unwrap()).unwrap();
        assert_eq!(sent["mappings"]["properties"]["msg"]["type"], "text");
    }

    #[tokio::test]
    async fn the_one_where_exists_is_a_yes_or_no_question() {
        let (client, fake) = client();
        fake.respond("http://localhost:9200", 200, "");
        fake.respond("http://localhost:9200", 404, "");
        assert!(client.indices().exists(IndexExistsRequest::new("logs")).await.unwrap());
        assert!(!client.indices().exists(IndexExistsRequest::new("nope")).await.unwrap());
        assert!(fake.calls().iter().all(|call| call.method == Method::HEAD));
    }

    #[test]
    fn the_one_where_alias_routes_pick_the_tightest_template() {
        let both = into_request(GetAliasRequest::new().index("logs").name("current")).unwrap();
        assert_eq!(
            both.path,
            RequestPath::Segments(vec!["logs".into(), "_alias".into(), "current".into()])
        );
        let name_only = into_request(AliasExistsRequest::new("current")).unwrap();
        assert_eq!(name_only.method, Method::HEAD);
        assert_eq!(name_only.path, RequestPath::Segments(vec!["_alias".into(), "current".into()]));
        let everything = into_request(GetIndexSettingsRequest::new()).unwrap();
        assert_eq!(everything.path, RequestPath::Segments(vec!["_settings".into()]));
    }

    #[test]
    fn the_one_where_aliases_swap_atomically() {
        let request = UpdateAliasesRequest::new()
            .remove("logs-v1", "logs")
            .add("logs-v2", "logs")
            .remove_index("logs-v0");
        let request = into_request(request).unwrap();
        let body: Value = serde_json::from_slice(request.body.unwrap().bytes()).unwrap();
        assert_eq!(
            body,
            json!({"actions": [
                {"remove": {"index": "logs-v1", "alias": "logs"}},
                {"add": {"index": "logs-v2", "alias": "logs"}},
                {"remove_index": {"index": "logs-v0"}}
            ]})
        );
    }

    #[tokio::test]
    async fn the_one_where_aliases_and_templates_come_back_typed() {
        let (client, fake) = client();
        fake.respond(
            "http://localhost:9200",
            200,
            r#"{"logs-v2":{"aliases":{"logs":{"is_write_index":true},"recent":{"filter":{"range":{"@timestamp":{"gte":"now-1d"}}}}}}}"#,
        );
        fake.respond(
            "http://localhost:9200",
            200,
            r#"{"index_templates":[{"name":"logs","index_template":{"index_patterns":["logs-*"],"priority":100,
                "template":{"settings":{"index":{"number_of_shards":"1"}}},"composed_of":[]}}]}"#,
        );

        let aliases = client.indices().get_alias(GetAliasRequest::new().index("logs-v2")).await.unwrap();
        let logs = &aliases["logs-v2"].aliases;
        assert_eq!(logs["logs"].is_write_index, Some(true));
        assert!(logs["recent"].filter.is_some());

        let templates = client
            .indices()
            .get_index_template(GetIndexTemplateRequest::new().name("logs"))
            .await
            .unwrap();
        let template = &templates.index_templates[0];
        assert_eq!(template.name, "logs");
        assert_eq!(template.index_template.index_patterns, vec!["logs-*".to_string()]);
        assert_eq!(template.index_template.priority, Some(100));
    }
}

//! 🏥 Cluster-wide operations: health, stats, state and the settings that apply everywhere.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::common::NodeStatistics;
use crate::api::{
    ExpandWildcards, HealthStatus, Level, Names, Parameters, UrlLookup, WaitForEvents, get_or_post,
};
use crate::error::Result;
use crate::serialization::{Time, dates};
use crate::transport::Transport;

static HEALTH: UrlLookup = UrlLookup::new("cluster.health", &["/_cluster/health/{index}", "/_cluster/health"]);
static STATS: UrlLookup = UrlLookup::new(
    "cluster.stats",
    &["/_cluster/stats/nodes/{node_id}", "/_cluster/stats"],
);
static STATE: UrlLookup = UrlLookup::new(
    "cluster.state",
    &["/_cluster/state/{metric}/{index}", "/_cluster/state/{metric}", "/_cluster/state"],
);
static SETTINGS: UrlLookup = UrlLookup::new("cluster.settings", &["/_cluster/settings"]);
static PENDING_TASKS: UrlLookup = UrlLookup::new("cluster.pending_tasks", &["/_cluster/pending_tasks"]);
static ALLOCATION_EXPLAIN: UrlLookup =
    UrlLookup::new("cluster.allocation_explain", &["/_cluster/allocation/explain"]);

endpoint!(
    /// 🩺 Green, yellow or red, and optionally wait until it's the color you want.
    ClusterHealthRequest, GET, HEALTH
);
endpoint!(ClusterStatsRequest, GET, STATS);
endpoint!(ClusterStateRequest, GET, STATE);
endpoint!(ClusterGetSettingsRequest, GET, SETTINGS);
endpoint!(ClusterPutSettingsRequest, PUT, SETTINGS);
endpoint!(ClusterPendingTasksRequest, GET, PENDING_TASKS);
endpoint!(
    /// 🔎 Why is this shard unassigned? Without a body, explains the first unassigned shard found.
    AllocationExplainRequest, fn get_or_post, ALLOCATION_EXPLAIN
);

impl ClusterHealthRequest {
    pub fn new() -> Self {
        Self::blank()
    }

    pub fn index(self, index: impl Into<Names>) -> Self {
        self.route("index", index.into())
    }
}

impl ClusterStatsRequest {
    pub fn new() -> Self {
        Self::blank()
    }

    pub fn node_id(self, node_id: impl Into<Names>) -> Self {
        self.route("node_id", node_id.into())
    }
}

impl ClusterStateRequest {
    pub fn new() -> Self {
        Self::blank()
    }

    /// 🧩 `metadata`, `routing_table`, `nodes`, `blocks`... or `_all`.
    pub fn metric(self, metric: impl Into<Names>) -> Self {
        self.route("metric", metric.into())
    }

    /// only meaningful together with a metric
    pub fn index(self, index: impl Into<Names>) -> Self {
        self.route("index", index.into())
    }
}

impl ClusterGetSettingsRequest {
    pub fn new() -> Self {
        Self::blank()
    }
}

impl ClusterPutSettingsRequest {
    pub fn new() -> Self {
        Self::blank()
    }
}

impl ClusterPendingTasksRequest {
    pub fn new() -> Self {
        Self::blank()
    }
}

impl AllocationExplainRequest {
    pub fn new() -> Self {
        Self::blank()
    }
}

default_via_new!(
    ClusterHealthRequest,
    ClusterStatsRequest,
    ClusterStateRequest,
    ClusterGetSettingsRequest,
    ClusterPutSettingsRequest,
    ClusterPendingTasksRequest,
    AllocationExplainRequest
);

query_params!(ClusterHealthRequest {
    level: Level,
    local: bool,
    cluster_manager_timeout: Time,
    timeout: Time,
    wait_for_active_shards: String,
    wait_for_nodes: String,
    wait_for_events: WaitForEvents,
    wait_for_no_relocating_shards: bool,
    wait_for_no_initializing_shards: bool,
    wait_for_status: HealthStatus,
    expand_wildcards: ExpandWildcards,
});

query_params!(ClusterStatsRequest {
    flat_settings: bool,
    timeout: Time,
});

query_params!(ClusterStateRequest {
    local: bool,
    cluster_manager_timeout: Time,
    flat_settings: bool,
    wait_for_metadata_version: i64,
    wait_for_timeout: Time,
    expand_wildcards: ExpandWildcards,
    ignore_unavailable: bool,
    allow_no_indices: bool,
});

query_params!(ClusterGetSettingsRequest {
    flat_settings: bool,
    include_defaults: bool,
    cluster_manager_timeout: Time,
    timeout: Time,
});

query_params!(ClusterPutSettingsRequest {
    flat_settings: bool,
    cluster_manager_timeout: Time,
    timeout: Time,
});

query_params!(ClusterPendingTasksRequest {
    local: bool,
    cluster_manager_timeout: Time,
});

query_params!(AllocationExplainRequest {
    include_disk_info: bool,
    include_yes_decisions: bool,
});

json_body!(ClusterPutSettingsRequest, AllocationExplainRequest);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterHealthResponse {
    pub cluster_name: String,
    pub status: HealthStatus,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub number_of_nodes: u64,
    #[serde(default)]
    pub number_of_data_nodes: u64,
    #[serde(default)]
    pub discovered_cluster_manager: Option<bool>,
    #[serde(default)]
    pub active_primary_shards: u64,
    #[serde(default)]
    pub active_shards: u64,
    #[serde(default)]
    pub relocating_shards: u64,
    #[serde(default)]
    pub initializing_shards: u64,
    #[serde(default)]
    pub unassigned_shards: u64,
    #[serde(default)]
    pub delayed_unassigned_shards: u64,
    #[serde(default)]
    pub number_of_pending_tasks: u64,
    #[serde(default)]
    pub number_of_in_flight_fetch: u64,
    #[serde(default)]
    pub task_max_waiting_in_queue_millis: u64,
    #[serde(default)]
    pub active_shards_percent_as_number: f64,
    /// only with `level=indices` or `level=shards`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub indices: BTreeMap<String, IndexHealth>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexHealth {
    pub status: HealthStatus,
    #[serde(default)]
    pub number_of_shards: u64,
    #[serde(default)]
    pub number_of_replicas: u64,
    #[serde(default)]
    pub active_primary_shards: u64,
    #[serde(default)]
    pub active_shards: u64,
    #[serde(default)]
    pub relocating_shards: u64,
    #[serde(default)]
    pub initializing_shards: u64,
    #[serde(default)]
    pub unassigned_shards: u64,
}

/// 📊 The headline numbers are typed; the deep `indices`/`nodes` sections stay as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterStatsResponse {
    pub cluster_name: String,
    #[serde(default)]
    pub cluster_uuid: Option<String>,
    #[serde(with = "dates::epoch_millis")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub status: Option<HealthStatus>,
    #[serde(rename = "_nodes", default)]
    pub node_statistics: Option<NodeStatistics>,
    #[serde(default)]
    pub indices: Value,
    #[serde(default)]
    pub nodes: Value,
}

/// 🗺️ Cluster state is huge and shaped by the `metric` you asked for, so only the
/// identity is typed and every requested section lands in `sections`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterStateResponse {
    pub cluster_name: String,
    #[serde(default)]
    pub cluster_uuid: Option<String>,
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub state_uuid: Option<String>,
    #[serde(default)]
    pub cluster_manager_node: Option<String>,
    #[serde(flatten)]
    pub sections: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterSettingsResponse {
    #[serde(default)]
    pub persistent: Value,
    #[serde(default)]
    pub transient: Value,
    /// only with `include_defaults=true`
    #[serde(default)]
    pub defaults: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterPutSettingsResponse {
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub persistent: Value,
    #[serde(default)]
    pub transient: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingTasksResponse {
    #[serde(default)]
    pub tasks: Vec<PendingTask>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingTask {
    pub insert_order: i64,
    pub priority: String,
    pub source: String,
    #[serde(default)]
    pub executing: bool,
    #[serde(default)]
    pub time_in_queue_millis: u64,
    #[serde(default)]
    pub time_in_queue: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationExplainResponse {
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub shard: Option<i64>,
    #[serde(default)]
    pub primary: Option<bool>,
    #[serde(default)]
    pub current_state: Option<String>,
    #[serde(default)]
    pub current_node: Option<Value>,
    #[serde(default)]
    pub unassigned_info: Option<Value>,
    #[serde(default)]
    pub can_allocate: Option<String>,
    #[serde(default)]
    pub can_remain_on_current_node: Option<String>,
    #[serde(default)]
    pub allocate_explanation: Option<String>,
    #[serde(default)]
    pub node_allocation_decisions: Vec<Value>,
}

/// 🏥 `client.cluster()`
#[derive(Debug, Clone, Copy)]
pub struct Cluster<'a> {
    transport: &'a Transport,
}

impl<'a> Cluster<'a> {
    pub(crate) fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    /// 🩺 When a `wait_for_*` condition times out the cluster answers `408` with a normal
    /// health body and `timed_out: true`; that comes back as `Ok`, not as an error.
    pub async fn health(&self, mut request: ClusterHealthRequest) -> Result<ClusterHealthResponse> {
        let config = request.parts_mut().config_mut();
        if !config.allows(408) {
            config.allowed_status_codes.push(408);
        }
        self.transport.perform(request).await?.json()
    }

    pub async fn stats(&self, request: ClusterStatsRequest) -> Result<ClusterStatsResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn state(&self, request: ClusterStateRequest) -> Result<ClusterStateResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn get_settings(&self, request: ClusterGetSettingsRequest) -> Result<ClusterSettingsResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn put_settings(&self, request: ClusterPutSettingsRequest) -> Result<ClusterPutSettingsResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn pending_tasks(&self, request: ClusterPendingTasksRequest) -> Result<PendingTasksResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn allocation_explain(&self, request: AllocationExplainRequest) -> Result<AllocationExplainResponse> {
        self.transport.perform(request).await?.json()
    }
}

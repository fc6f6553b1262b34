//! 🖥️ Per-node views: info, stats, usage, hot threads.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::common::NodeStatistics;
use crate::api::{Level, Names, UrlLookup};
use crate::error::Result;
use crate::serialization::{ErrorCause, Time, dates};
use crate::transport::Transport;

static INFO: UrlLookup = UrlLookup::new(
    "nodes.info",
    &["/_nodes/{node_id}/{metric}", "/_nodes/{node_id}", "/_nodes/{metric}", "/_nodes"],
);
static STATS: UrlLookup = UrlLookup::new(
    "nodes.stats",
    &[
        "/_nodes/{node_id}/stats/{metric}/{index_metric}",
        "/_nodes/{node_id}/stats/{metric}",
        "/_nodes/{node_id}/stats",
        "/_nodes/stats/{metric}/{index_metric}",
        "/_nodes/stats/{metric}",
        "/_nodes/stats",
    ],
);
static HOT_THREADS: UrlLookup =
    UrlLookup::new("nodes.hot_threads", &["/_nodes/{node_id}/hot_threads", "/_nodes/hot_threads"]);
static USAGE: UrlLookup = UrlLookup::new(
    "nodes.usage",
    &[
        "/_nodes/{node_id}/usage/{metric}",
        "/_nodes/{node_id}/usage",
        "/_nodes/usage/{metric}",
        "/_nodes/usage",
    ],
);
static RELOAD_SECURE_SETTINGS: UrlLookup = UrlLookup::new(
    "nodes.reload_secure_settings",
    &["/_nodes/{node_id}/reload_secure_settings", "/_nodes/reload_secure_settings"],
);

endpoint!(NodesInfoRequest, GET, INFO);
endpoint!(NodesStatsRequest, GET, STATS);
endpoint!(
    /// 🔥 Plain text, not JSON: a thread dump of whatever is burning CPU.
    HotThreadsRequest, GET, HOT_THREADS
);
endpoint!(NodesUsageRequest, GET, USAGE);
endpoint!(ReloadSecureSettingsRequest, POST, RELOAD_SECURE_SETTINGS);

macro_rules! node_filter {
    ($($name:ident),+) => {
        $(impl $name {
            pub fn new() -> Self {
                Self::blank()
            }

            /// 🎯 `_local`, `_all`, node ids, names, or attribute filters like `data:true`.
            pub fn node_id(self, node_id: impl Into<Names>) -> Self {
                self.route("node_id", node_id.into())
            }
        })+

        default_via_new!($($name),+);
    };
}

node_filter!(
    NodesInfoRequest,
    NodesStatsRequest,
    HotThreadsRequest,
    NodesUsageRequest,
    ReloadSecureSettingsRequest
);

impl NodesInfoRequest {
    /// 🧩 `settings`, `os`, `process`, `jvm`, `thread_pool`, `http`, `plugins`, `ingest`...
    pub fn metric(self, metric: impl Into<Names>) -> Self {
        self.route("metric", metric.into())
    }
}

impl NodesStatsRequest {
    pub fn metric(self, metric: impl Into<Names>) -> Self {
        self.route("metric", metric.into())
    }

    /// only together with `metric("indices")`
    pub fn index_metric(self, index_metric: impl Into<Names>) -> Self {
        self.route("index_metric", index_metric.into())
    }
}

impl NodesUsageRequest {
    pub fn metric(self, metric: impl Into<Names>) -> Self {
        self.route("metric", metric.into())
    }
}

query_params!(NodesInfoRequest {
    flat_settings: bool,
    timeout: Time,
});

query_params!(NodesStatsRequest {
    level: Level,
    completion_fields: Names,
    fielddata_fields: Names,
    fields: Names,
    groups: Names,
    include_segment_file_sizes: bool,
    timeout: Time,
});

query_params!(HotThreadsRequest {
    interval: Time,
    snapshots: i64,
    threads: i64,
    ignore_idle_threads: bool,
    thread_type as "type": String,
    timeout: Time,
});

query_params!(NodesUsageRequest {
    timeout: Time,
});

query_params!(ReloadSecureSettingsRequest {
    timeout: Time,
});

json_body!(ReloadSecureSettingsRequest);

/// 🖥️ Every nodes API answers with the same envelope around a per-node map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodesResponse<T> {
    #[serde(rename = "_nodes", default)]
    pub node_statistics: Option<NodeStatistics>,
    #[serde(default)]
    pub cluster_name: Option<String>,
    pub nodes: BTreeMap<String, T>,
}

/// 🏷️ Identity is typed; the requested metric sections land in `sections`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    #[serde(default)]
    pub transport_address: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub build_type: Option<String>,
    #[serde(default)]
    pub build_hash: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(flatten)]
    pub sections: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStats {
    pub name: String,
    #[serde(with = "dates::epoch_millis_opt", default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub transport_address: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(flatten)]
    pub sections: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeUsage {
    #[serde(with = "dates::epoch_millis_opt", default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(with = "dates::epoch_millis_opt", default)]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rest_actions: BTreeMap<String, u64>,
    #[serde(default)]
    pub aggregations: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecureSettingsReload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub reload_exception: Option<ErrorCause>,
}

/// 🖥️ `client.nodes()`
#[derive(Debug, Clone, Copy)]
pub struct Nodes<'a> {
    transport: &'a Transport,
}

impl<'a> Nodes<'a> {
    pub(crate) fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    pub async fn info(&self, request: NodesInfoRequest) -> Result<NodesResponse<NodeInfo>> {
        self.transport.perform(request).await?.json()
    }

    pub async fn stats(&self, request: NodesStatsRequest) -> Result<NodesResponse<NodeStats>> {
        self.transport.perform(request).await?.json()
    }

    pub async fn hot_threads(&self, request: HotThreadsRequest) -> Result<String> {
        Ok(self.transport.perform(request).await?.text())
    }

    pub async fn usage(&self, request: NodesUsageRequest) -> Result<NodesResponse<NodeUsage>> {
        self.transport.perform(request).await?.json()
    }

    /// 🔐 Per-node failures show up in `reload_exception`, not as an error.
    pub async fn reload_secure_settings(
        &self,
        request: ReloadSecureSettingsRequest,
    ) -> Result<NodesResponse<SecureSettingsReload>> {
        self.transport.perform(request).await?.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::into_request;
    use crate::client::Client;
    use crate::transport::{InMemoryConnection, RequestPath};
    use std::sync::Arc;

    fn client() -> (Client, Arc<InMemoryConnection>) {
        let fake = Arc::new(InMemoryConnection::new());
        (Client::in_memory("http://localhost:9200", Arc::clone(&fake)).unwrap(), fake)
    }

    #[test]
    fn the_one_where_node_ids_and_metrics_do_not_get_confused() {
        let by_metric = into_request(NodesInfoRequest::new().metric("jvm")).unwrap();
        assert_eq!(by_metric.path, RequestPath::Segments(vec!["_nodes".into(), "jvm".into()]));

        let both = into_request(NodesStatsRequest::new().node_id("_local").metric("indices").index_metric("docs"))
            .unwrap();
        assert_eq!(
            both.path,
            RequestPath::Segments(vec![
                "_nodes".into(),
                "_local".into(),
                "stats".into(),
                "indices".into(),
                "docs".into()
            ])
        );

        let hot = into_request(HotThreadsRequest::new().thread_type("cpu").threads(3)).unwrap();
        assert_eq!(
            hot.query,
            vec![("threads".to_string(), "3".to_string()), ("type".to_string(), "cpu".to_string())]
        );
    }

    #[tokio::test]
    async fn the_one_where_info_keeps_the_sections_it_does_not_model() {
        let (client, fake) = client();
        fake.respond(
            "http://localhost:9200",
            200,
            r#"{"_nodes":{"total":1,"successful":1,"failed":0},"cluster_name":"docker-cluster",
               "nodes":{"abc123":{"name":"node-1","transport_address":"10.0.0.1:9300","host":"10.0.0.1",
               "ip":"10.0.0.1","version":"2.11.0","roles":["cluster_manager","data","ingest"],
               "attributes":{"shard_indexing_pressure_enabled":"true"},
               "jvm":{"pid":1,"version":"17.0.8"}}}}"#,
        );
        let info = client.nodes().info(NodesInfoRequest::new().metric("jvm")).await.unwrap();
        assert_eq!(info.cluster_name.as_deref(), Some("docker-cluster"));
        let node = &info.nodes["abc123"];
        assert_eq!(node.name, "node-1");
        assert_eq!(node.roles, vec!["cluster_manager", "data", "ingest"]);
        assert_eq!(node.sections["jvm"]["version"], "17.0.8");
        assert!(!node.sections.contains_key("name"));
    }

    #[tokio::test]
    async fn the_one_where_hot_threads_is_just_text() {
        let (client, fake) = client();
        fake.respond(
            "http://localhost:9200",
            200,
            "::: {node-1}{abc123}\n   Hot threads at 2023-10-13T03:35:55Z, interval=500ms, busiestThreads=3:\n",
        );
        let dump = client.nodes().hot_threads(HotThreadsRequest::new()).await.unwrap();
        assert!(dump.starts_with("::: {node-1}"));
    }
}

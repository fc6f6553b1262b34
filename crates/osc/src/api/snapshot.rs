//! 📸 Snapshots and the repositories they live in.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::common::{Acknowledged, ShardStatistics};
use crate::api::{Names, UrlLookup};
use crate::error::Result;
use crate::serialization::{Time, dates};
use crate::transport::Transport;

static CREATE_REPOSITORY: UrlLookup = UrlLookup::new("snapshot.create_repository", &["/_snapshot/{repository}"]);
static GET_REPOSITORY: UrlLookup =
    UrlLookup::new("snapshot.get_repository", &["/_snapshot/{repository}", "/_snapshot"]);
static DELETE_REPOSITORY: UrlLookup = UrlLookup::new("snapshot.delete_repository", &["/_snapshot/{repository}"]);
static VERIFY_REPOSITORY: UrlLookup =
    UrlLookup::new("snapshot.verify_repository", &["/_snapshot/{repository}/_verify"]);
static CLEANUP_REPOSITORY: UrlLookup =
    UrlLookup::new("snapshot.cleanup_repository", &["/_snapshot/{repository}/_cleanup"]);
static CREATE_SNAPSHOT: UrlLookup = UrlLookup::new("snapshot.create", &["/_snapshot/{repository}/{snapshot}"]);
static GET_SNAPSHOT: UrlLookup = UrlLookup::new("snapshot.get", &["/_snapshot/{repository}/{snapshot}"]);
static DELETE_SNAPSHOT: UrlLookup = UrlLookup::new("snapshot.delete", &["/_snapshot/{repository}/{snapshot}"]);
static RESTORE: UrlLookup = UrlLookup::new("snapshot.restore", &["/_snapshot/{repository}/{snapshot}/_restore"]);
static STATUS: UrlLookup = UrlLookup::new(
    "snapshot.status",
    &[
        "/_snapshot/{repository}/{snapshot}/_status",
        "/_snapshot/{repository}/_status",
        "/_snapshot/_status",
    ],
);
static CLONE_SNAPSHOT: UrlLookup = UrlLookup::new(
    "snapshot.clone",
    &["/_snapshot/{repository}/{snapshot}/_clone/{target_snapshot}"],
);

endpoint!(CreateRepositoryRequest, PUT, CREATE_REPOSITORY);
endpoint!(GetRepositoryRequest, GET, GET_REPOSITORY);
endpoint!(DeleteRepositoryRequest, DELETE, DELETE_REPOSITORY);
endpoint!(VerifyRepositoryRequest, POST, VERIFY_REPOSITORY);
endpoint!(
    /// 🧹 Delete blobs no snapshot refers to anymore.
    CleanupRepositoryRequest, POST, CLEANUP_REPOSITORY
);
endpoint!(CreateSnapshotRequest, PUT, CREATE_SNAPSHOT);
endpoint!(GetSnapshotRequest, GET, GET_SNAPSHOT);
endpoint!(DeleteSnapshotRequest, DELETE, DELETE_SNAPSHOT);
endpoint!(RestoreRequest, POST, RESTORE);
endpoint!(
    /// ⏳ Shard-level progress of running snapshots, or the final tally of finished ones.
    SnapshotStatusRequest, GET, STATUS
);
endpoint!(CloneSnapshotRequest, PUT, CLONE_SNAPSHOT);

impl CreateRepositoryRequest {
    pub fn new(repository: &str) -> Self {
        Self::blank().route("repository", repository)
    }
}

impl GetRepositoryRequest {
    pub fn new() -> Self {
        Self::blank()
    }

    pub fn repository(self, repository: impl Into<Names>) -> Self {
        self.route("repository", repository.into())
    }
}

impl DeleteRepositoryRequest {
    pub fn new(repository: impl Into<Names>) -> Self {
        Self::blank().route("repository", repository.into())
    }
}

impl VerifyRepositoryRequest {
    pub fn new(repository: &str) -> Self {
        Self::blank().route("repository", repository)
    }
}

impl CleanupRepositoryRequest {
    pub fn new(repository: &str) -> Self {
        Self::blank().route("repository", repository)
    }
}

impl CreateSnapshotRequest {
    pub fn new(repository: &str, snapshot: &str) -> Self {
        Self::blank().route("repository", repository).route("snapshot", snapshot)
    }
}

impl GetSnapshotRequest {
    /// 🔍 `snapshot` takes names, wildcards, or `_all`.
    pub fn new(repository: &str, snapshot: impl Into<Names>) -> Self {
        Self::blank().route("repository", repository).route("snapshot", snapshot.into())
    }
}

impl DeleteSnapshotRequest {
    pub fn new(repository: &str, snapshot: impl Into<Names>) -> Self {
        Self::blank().route("repository", repository).route("snapshot", snapshot.into())
    }
}

impl RestoreRequest {
    pub fn new(repository: &str, snapshot: &str) -> Self {
        Self::blank().route("repository", repository).route("snapshot", snapshot)
    }
}

impl SnapshotStatusRequest {
    /// ⏳ Without a repository: every snapshot currently running anywhere.
    pub fn new() -> Self {
        Self::blank()
    }

    pub fn repository(self, repository: &str) -> Self {
        self.route("repository", repository)
    }

    /// only together with a repository
    pub fn snapshot(self, snapshot: impl Into<Names>) -> Self {
        self.route("snapshot", snapshot.into())
    }
}

impl CloneSnapshotRequest {
    pub fn new(repository: &str, snapshot: &str, target_snapshot: &str) -> Self {
        Self::blank()
            .route("repository", repository)
            .route("snapshot", snapshot)
            .route("target_snapshot", target_snapshot)
    }
}

default_via_new!(GetRepositoryRequest, SnapshotStatusRequest);

query_params!(CreateRepositoryRequest {
    verify: bool,
    timeout: Time,
    cluster_manager_timeout: Time,
});

query_params!(GetRepositoryRequest {
    local: bool,
    cluster_manager_timeout: Time,
});

query_params!(DeleteRepositoryRequest {
    timeout: Time,
    cluster_manager_timeout: Time,
});

query_params!(VerifyRepositoryRequest {
    timeout: Time,
    cluster_manager_timeout: Time,
});

query_params!(CleanupRepositoryRequest {
    timeout: Time,
    cluster_manager_timeout: Time,
});

query_params!(CreateSnapshotRequest {
    wait_for_completion: bool,
    cluster_manager_timeout: Time,
});

query_params!(GetSnapshotRequest {
    ignore_unavailable: bool,
    verbose: bool,
    cluster_manager_timeout: Time,
});

query_params!(DeleteSnapshotRequest {
    cluster_manager_timeout: Time,
});

query_params!(RestoreRequest {
    wait_for_completion: bool,
    cluster_manager_timeout: Time,
});

query_params!(SnapshotStatusRequest {
    ignore_unavailable: bool,
    cluster_manager_timeout: Time,
});

query_params!(CloneSnapshotRequest {
    cluster_manager_timeout: Time,
});

json_body!(CreateRepositoryRequest, CreateSnapshotRequest, RestoreRequest, CloneSnapshotRequest);

/// 🗄️ A repository definition: `{"type": "fs", "settings": {"location": "/mnt/backups"}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    #[serde(rename = "type")]
    pub repository_type: String,
    #[serde(default)]
    pub settings: Value,
}

impl Repository {
    pub fn fs(location: impl Into<String>) -> Self {
        Self {
            repository_type: "fs".to_string(),
            settings: serde_json::json!({ "location": location.into() }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifyRepositoryResponse {
    #[serde(default)]
    pub nodes: BTreeMap<String, VerifiedNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerifiedNode {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanupRepositoryResponse {
    pub results: CleanupResults,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanupResults {
    #[serde(default)]
    pub deleted_bytes: u64,
    #[serde(default)]
    pub deleted_blobs: u64,
}

/// 📸 Without `wait_for_completion` the cluster only says `accepted: true`; with it,
/// `snapshot` carries the finished snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateSnapshotResponse {
    #[serde(default)]
    pub accepted: Option<bool>,
    #[serde(default)]
    pub snapshot: Option<SnapshotInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetSnapshotResponse {
    #[serde(default)]
    pub snapshots: Vec<SnapshotInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub snapshot: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub version_id: Option<i64>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub indices: Vec<String>,
    #[serde(default)]
    pub data_streams: Vec<String>,
    #[serde(default)]
    pub include_global_state: Option<bool>,
    /// `IN_PROGRESS`, `SUCCESS`, `FAILED`, `PARTIAL` or `INCOMPATIBLE`
    #[serde(default)]
    pub state: Option<String>,
    #[serde(with = "dates::flexible_opt", default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(with = "dates::epoch_millis_opt", default)]
    pub start_time_in_millis: Option<DateTime<Utc>>,
    #[serde(with = "dates::flexible_opt", default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(with = "dates::epoch_millis_opt", default)]
    pub end_time_in_millis: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_in_millis: Option<u64>,
    #[serde(default)]
    pub failures: Vec<Value>,
    #[serde(default)]
    pub shards: Option<ShardStatistics>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestoreResponse {
    #[serde(default)]
    pub accepted: Option<bool>,
    #[serde(default)]
    pub snapshot: Option<RestoreInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestoreInfo {
    pub snapshot: String,
    #[serde(default)]
    pub indices: Vec<String>,
    #[serde(default)]
    pub shards: ShardStatistics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotStatusResponse {
    #[serde(default)]
    pub snapshots: Vec<SnapshotStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotStatus {
    pub snapshot: String,
    pub repository: String,
    #[serde(default)]
    pub uuid: Option<String>,
    /// `INIT`, `STARTED`, `SUCCESS`, `FAILED`, `ABORTED`...
    pub state: String,
    #[serde(default)]
    pub include_global_state: Option<bool>,
    #[serde(default)]
    pub shards_stats: ShardsStats,
    #[serde(default)]
    pub stats: SnapshotStats,
    #[serde(default)]
    pub indices: BTreeMap<String, Value>,
}

impl SnapshotStatus {
    /// 📈 Finished shards over total shards, `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        let stats = &self.shards_stats;
        if stats.total == 0 {
            return 0.0;
        }
        (stats.done + stats.failed) as f64 / stats.total as f64
    }

    /// 🏁 Whether the snapshot has stopped moving, for better or worse.
    pub fn is_finished(&self) -> bool {
        matches!(self.state.as_str(), "SUCCESS" | "FAILED" | "ABORTED" | "PARTIAL")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShardsStats {
    #[serde(default)]
    pub initializing: u64,
    #[serde(default)]
    pub started: u64,
    #[serde(default)]
    pub finalizing: u64,
    #[serde(default)]
    pub done: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotStats {
    #[serde(default)]
    pub incremental: FileStats,
    #[serde(default)]
    pub total: FileStats,
    #[serde(with = "dates::epoch_millis_opt", default)]
    pub start_time_in_millis: Option<DateTime<Utc>>,
    #[serde(default)]
    pub time_in_millis: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileStats {
    #[serde(default)]
    pub file_count: u64,
    #[serde(default)]
    pub size_in_bytes: u64,
}

/// 📸 `client.snapshot()`
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    transport: &'a Transport,
}

impl<'a> Snapshot<'a> {
    pub(crate) fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    pub async fn create_repository(&self, request: CreateRepositoryRequest) -> Result<Acknowledged> {
        self.transport.perform(request).await?.json()
    }

    pub async fn get_repository(&self, request: GetRepositoryRequest) -> Result<BTreeMap<String, Repository>> {
        self.transport.perform(request).await?.json()
    }

    pub async fn delete_repository(&self, request: DeleteRepositoryRequest) -> Result<Acknowledged> {
        self.transport.perform(request).await?.json()
    }

    pub async fn verify_repository(&self, request: VerifyRepositoryRequest) -> Result<VerifyRepositoryResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn cleanup_repository(&self, request: CleanupRepositoryRequest) -> Result<CleanupRepositoryResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn create(&self, request: CreateSnapshotRequest) -> Result<CreateSnapshotResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn get(&self, request: GetSnapshotRequest) -> Result<GetSnapshotResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn delete(&self, request: DeleteSnapshotRequest) -> Result<Acknowledged> {
        self.transport.perform(request).await?.json()
    }

    pub async fn restore(&self, request: RestoreRequest) -> Result<RestoreResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn status(&self, request: SnapshotStatusRequest) -> Result<SnapshotStatusResponse> {
        self.transport.perform(request).await?.json()
    }

    /// 🐑 Copy some or all indices of a snapshot into a new snapshot in the same repository.
    pub async fn clone_snapshot(&self, request: CloneSnapshotRequest) -> Result<Acknowledged> {
        self.transport.perform(request).await?.json()
    }
}

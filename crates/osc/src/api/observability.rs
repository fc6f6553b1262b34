//! 🔭 Observability (`_plugins/_observability`): saved notebooks, queries, visualizations
//! and operational panels.
//!
//! This plugin speaks camelCase on the wire, unlike nearly everything else.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{Names, SortOrder, UrlLookup};
use crate::error::Result;
use crate::serialization::dates;
use crate::transport::Transport;

static CREATE_OBJECT: UrlLookup = UrlLookup::new("observability.create_object", &["/_plugins/_observability/object"]);
static GET_OBJECT: UrlLookup =
    UrlLookup::new("observability.get_object", &["/_plugins/_observability/object/{object_id}"]);
static GET_OBJECTS: UrlLookup = UrlLookup::new("observability.get_objects", &["/_plugins/_observability/object"]);
static UPDATE_OBJECT: UrlLookup =
    UrlLookup::new("observability.update_object", &["/_plugins/_observability/object/{object_id}"]);
static DELETE_OBJECT: UrlLookup =
    UrlLookup::new("observability.delete_object", &["/_plugins/_observability/object/{object_id}"]);
static DELETE_OBJECTS: UrlLookup =
    UrlLookup::new("observability.delete_objects", &["/_plugins/_observability/object"]);
static GET_LOCAL_STATS: UrlLookup =
    UrlLookup::new("observability.get_localstats", &["/_plugins/_observability/_local/stats"]);

endpoint!(CreateObjectRequest, POST, CREATE_OBJECT);
endpoint!(GetObjectRequest, GET, GET_OBJECT);
endpoint!(GetObjectsRequest, GET, GET_OBJECTS);
endpoint!(UpdateObjectRequest, PUT, UPDATE_OBJECT);
endpoint!(DeleteObjectRequest, DELETE, DELETE_OBJECT);
endpoint!(
    /// 🗑️ Delete several objects by id in one go (`objectIdList`).
    DeleteObjectsRequest, DELETE, DELETE_OBJECTS
);
endpoint!(GetLocalStatsRequest, GET, GET_LOCAL_STATS);

impl CreateObjectRequest {
    pub fn new() -> Self {
        Self::blank()
    }
}

impl GetObjectRequest {
    pub fn new(object_id: &str) -> Self {
        Self::blank().route("object_id", object_id)
    }
}

impl GetObjectsRequest {
    pub fn new() -> Self {
        Self::blank()
    }
}

impl UpdateObjectRequest {
    pub fn new(object_id: &str) -> Self {
        Self::blank().route("object_id", object_id)
    }
}

impl DeleteObjectRequest {
    pub fn new(object_id: &str) -> Self {
        Self::blank().route("object_id", object_id)
    }
}

impl DeleteObjectsRequest {
    pub fn new(object_ids: impl Into<Names>) -> Self {
        Self::blank().object_id_list(object_ids)
    }
}

impl GetLocalStatsRequest {
    pub fn new() -> Self {
        Self::blank()
    }
}

default_via_new!(CreateObjectRequest, GetObjectsRequest, GetLocalStatsRequest);

query_params!(GetObjectsRequest {
    object_type as "objectType": Names,
    object_id_list as "objectIdList": Names,
    name: String,
    from_index as "fromIndex": i64,
    max_items as "maxItems": i64,
    sort_field as "sortField": String,
    sort_order as "sortOrder": SortOrder,
});

query_params!(DeleteObjectsRequest {
    object_id_list as "objectIdList": Names,
});

json_body!(CreateObjectRequest, UpdateObjectRequest);

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectIdResponse {
    pub object_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectsResponse {
    #[serde(default)]
    pub start_index: u64,
    #[serde(default)]
    pub total_hits: u64,
    #[serde(default)]
    pub total_hit_relation: Option<String>,
    #[serde(default)]
    pub observability_object_list: Vec<ObservabilityObject>,
}

/// 📒 One saved object. Its payload sits under a key naming its type
/// (`savedQuery`, `savedVisualization`, `operationalPanel`, `notebook`...), kept in `object`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservabilityObject {
    pub object_id: String,
    #[serde(with = "dates::epoch_millis_opt", default)]
    pub last_updated_time_ms: Option<DateTime<Utc>>,
    #[serde(with = "dates::epoch_millis_opt", default)]
    pub created_time_ms: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tenant: Option<String>,
    #[serde(flatten)]
    pub object: BTreeMap<String, Value>,
}

impl ObservabilityObject {
    /// 🏷️ The type key of the payload, e.g. `savedQuery`.
    pub fn object_type(&self) -> Option<&str> {
        self.object.keys().next().map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteObjectsResponse {
    /// object id to `OK` (or the failure the plugin reported for it)
    #[serde(default)]
    pub delete_response_list: BTreeMap<String, String>,
}

/// 🔭 `client.observability()`
#[derive(Debug, Clone, Copy)]
pub struct Observability<'a> {
    transport: &'a Transport,
}

impl<'a> Observability<'a> {
    pub(crate) fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    pub async fn create_object(&self, request: CreateObjectRequest) -> Result<ObjectIdResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn get_object(&self, request: GetObjectRequest) -> Result<ObjectsResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn get_objects(&self, request: GetObjectsRequest) -> Result<ObjectsResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn update_object(&self, request: UpdateObjectRequest) -> Result<ObjectIdResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn delete_object(&self, request: DeleteObjectRequest) -> Result<DeleteObjectsResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn delete_objects(&self, request: DeleteObjectsRequest) -> Result<DeleteObjectsResponse> {
        self.transport.perform(request).await?.json()
    }

    /// 📈 Plugin-local counters, shape varies by version.
    pub async fn get_local_stats(&self, request: GetLocalStatsRequest) -> Result<Value> {
        self.transport.perform(request).await?.json()
    }
}

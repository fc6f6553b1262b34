//! 🤖 ML Commons (`_plugins/_ml`): model groups, models, deployment and the tasks behind them.
//!
//! Registering and deploying are asynchronous. The cluster answers with a `task_id`;
//! poll [`Ml::get_task`] until its state says it's done.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::common::WriteResponse;
use crate::api::root::SearchResponse;
use crate::api::{UrlLookup, get_or_post};
use crate::error::Result;
use crate::serialization::dates;
use crate::transport::Transport;

static REGISTER_MODEL_GROUP: UrlLookup =
    UrlLookup::new("ml.register_model_group", &["/_plugins/_ml/model_groups/_register"]);
static DELETE_MODEL_GROUP: UrlLookup =
    UrlLookup::new("ml.delete_model_group", &["/_plugins/_ml/model_groups/{model_group_id}"]);
static REGISTER_MODEL: UrlLookup = UrlLookup::new("ml.register_model", &["/_plugins/_ml/models/_register"]);
static GET_MODEL: UrlLookup = UrlLookup::new("ml.get_model", &["/_plugins/_ml/models/{model_id}"]);
static DELETE_MODEL: UrlLookup = UrlLookup::new("ml.delete_model", &["/_plugins/_ml/models/{model_id}"]);
static DEPLOY_MODEL: UrlLookup = UrlLookup::new("ml.deploy_model", &["/_plugins/_ml/models/{model_id}/_deploy"]);
static UNDEPLOY_MODEL: UrlLookup = UrlLookup::new(
    "ml.undeploy_model",
    &["/_plugins/_ml/models/{model_id}/_undeploy", "/_plugins/_ml/models/_undeploy"],
);
static GET_TASK: UrlLookup = UrlLookup::new("ml.get_task", &["/_plugins/_ml/tasks/{task_id}"]);
static SEARCH_MODELS: UrlLookup = UrlLookup::new("ml.search_models", &["/_plugins/_ml/models/_search"]);

endpoint!(RegisterModelGroupRequest, POST, REGISTER_MODEL_GROUP);
endpoint!(DeleteModelGroupRequest, DELETE, DELETE_MODEL_GROUP);
endpoint!(
    /// 📥 Register a model from the pretrained catalog, a URL, or a remote connector.
    RegisterModelRequest, POST, REGISTER_MODEL
);
endpoint!(GetModelRequest, GET, GET_MODEL);
endpoint!(DeleteModelRequest, DELETE, DELETE_MODEL);
endpoint!(DeployModelRequest, POST, DEPLOY_MODEL);
endpoint!(UndeployModelRequest, POST, UNDEPLOY_MODEL);
endpoint!(GetTaskRequest, GET, GET_TASK);
endpoint!(SearchModelsRequest, fn get_or_post, SEARCH_MODELS);

impl RegisterModelGroupRequest {
    pub fn new() -> Self {
        Self::blank()
    }
}

impl DeleteModelGroupRequest {
    pub fn new(model_group_id: &str) -> Self {
        Self::blank().route("model_group_id", model_group_id)
    }
}

impl RegisterModelRequest {
    pub fn new() -> Self {
        Self::blank()
    }
}

impl GetModelRequest {
    pub fn new(model_id: &str) -> Self {
        Self::blank().route("model_id", model_id)
    }
}

impl DeleteModelRequest {
    pub fn new(model_id: &str) -> Self {
        Self::blank().route("model_id", model_id)
    }
}

impl DeployModelRequest {
    pub fn new(model_id: &str) -> Self {
        Self::blank().route("model_id", model_id)
    }
}

impl UndeployModelRequest {
    /// 🧊 Without a model id, undeploys whatever the body names (`model_ids`, `node_ids`).
    pub fn new() -> Self {
        Self::blank()
    }

    pub fn model_id(self, model_id: &str) -> Self {
        self.route("model_id", model_id)
    }
}

impl GetTaskRequest {
    pub fn new(task_id: &str) -> Self {
        Self::blank().route("task_id", task_id)
    }
}

impl SearchModelsRequest {
    pub fn new() -> Self {
        Self::blank()
    }
}

default_via_new!(
    RegisterModelGroupRequest,
    RegisterModelRequest,
    UndeployModelRequest,
    SearchModelsRequest,
);

query_params!(RegisterModelRequest {
    deploy: bool,
});

json_body!(
    RegisterModelGroupRequest,
    RegisterModelRequest,
    DeployModelRequest,
    UndeployModelRequest,
    SearchModelsRequest,
);

/// 🗃️ Body of a model group registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelGroup {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `public`, `private` or `restricted`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backend_roles: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegisterModelGroupResponse {
    pub model_group_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// 🎟️ What async ML operations hand back: a task to poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MlTaskHandle {
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// remote models are registered synchronously and answer with the id straight away
    #[serde(default)]
    pub model_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model_group_id: Option<String>,
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub model_format: Option<String>,
    /// `REGISTERED`, `DEPLOYING`, `DEPLOYED`, `PARTIALLY_DEPLOYED`, `UNDEPLOYED`...
    #[serde(default)]
    pub model_state: Option<String>,
    #[serde(default)]
    pub model_content_size_in_bytes: Option<u64>,
    #[serde(default)]
    pub model_content_hash_value: Option<String>,
    #[serde(default)]
    pub model_config: Option<Value>,
    #[serde(with = "dates::epoch_millis_opt", default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(with = "dates::epoch_millis_opt", default)]
    pub last_updated_time: Option<DateTime<Utc>>,
    #[serde(with = "dates::epoch_millis_opt", default)]
    pub last_registered_time: Option<DateTime<Utc>>,
    #[serde(with = "dates::epoch_millis_opt", default)]
    pub last_deployed_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_chunks: Option<u64>,
    #[serde(default)]
    pub planning_worker_node_count: Option<u64>,
    #[serde(default)]
    pub current_worker_node_count: Option<u64>,
    #[serde(default)]
    pub planning_worker_nodes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MlTask {
    #[serde(default)]
    pub model_id: Option<String>,
    /// `REGISTER_MODEL`, `DEPLOY_MODEL`...
    #[serde(default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub function_name: Option<String>,
    /// `CREATED`, `RUNNING`, `COMPLETED`, `FAILED`...
    pub state: String,
    #[serde(default)]
    pub worker_node: Vec<String>,
    #[serde(with = "dates::epoch_millis_opt", default)]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(with = "dates::epoch_millis_opt", default)]
    pub last_update_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub is_async: Option<bool>,
}

impl MlTask {
    pub fn is_finished(&self) -> bool {
        matches!(
            self.state.as_str(),
            "COMPLETED" | "COMPLETED_WITH_ERROR" | "FAILED" | "CANCELLED"
        )
    }
}

/// 🧊 Per node: per model: what happened to it.
pub type UndeployModelResponse = BTreeMap<String, Value>;

/// 🤖 `client.ml()`
#[derive(Debug, Clone, Copy)]
pub struct Ml<'a> {
    transport: &'a Transport,
}

impl<'a> Ml<'a> {
    pub(crate) fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    pub async fn register_model_group(&self, request: RegisterModelGroupRequest) -> Result<RegisterModelGroupResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn delete_model_group(&self, request: DeleteModelGroupRequest) -> Result<WriteResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn register_model(&self, request: RegisterModelRequest) -> Result<MlTaskHandle> {
        self.transport.perform(request).await?.json()
    }

    pub async fn get_model(&self, request: GetModelRequest) -> Result<Model> {
        self.transport.perform(request).await?.json()
    }

    pub async fn delete_model(&self, request: DeleteModelRequest) -> Result<WriteResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn deploy_model(&self, request: DeployModelRequest) -> Result<MlTaskHandle> {
        self.transport.perform(request).await?.json()
    }

    pub async fn undeploy_model(&self, request: UndeployModelRequest) -> Result<UndeployModelResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn get_task(&self, request: GetTaskRequest) -> Result<MlTask> {
        self.transport.perform(request).await?.json()
    }

    /// 🔍 Regular query DSL over the model index; model chunks show up as hits too.
    pub async fn search_models(&self, request: SearchModelsRequest) -> Result<SearchResponse<Model>> {
        self.transport.perform(request).await?.json()
    }
}

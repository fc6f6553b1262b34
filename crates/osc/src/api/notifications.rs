//! 🔔 Notifications (`_plugins/_notifications`): channels to Slack, Chime, webhooks, SNS, email...

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::{Names, SortOrder, UrlLookup};
use crate::error::Result;
use crate::serialization::dates;
use crate::transport::Transport;

static CREATE_CONFIG: UrlLookup = UrlLookup::new("notifications.create_config", &["/_plugins/_notifications/configs"]);
static GET_CONFIG: UrlLookup =
    UrlLookup::new("notifications.get_config", &["/_plugins/_notifications/configs/{config_id}"]);
static GET_CONFIGS: UrlLookup = UrlLookup::new("notifications.get_configs", &["/_plugins/_notifications/configs"]);
static UPDATE_CONFIG: UrlLookup =
    UrlLookup::new("notifications.update_config", &["/_plugins/_notifications/configs/{config_id}"]);
static DELETE_CONFIG: UrlLookup =
    UrlLookup::new("notifications.delete_config", &["/_plugins/_notifications/configs/{config_id}"]);
static LIST_FEATURES: UrlLookup = UrlLookup::new("notifications.list_features", &["/_plugins/_notifications/features"]);
static LIST_CHANNELS: UrlLookup = UrlLookup::new("notifications.list_channels", &["/_plugins/_notifications/channels"]);
static SEND_TEST: UrlLookup =
    UrlLookup::new("notifications.send_test", &["/_plugins/_notifications/feature/test/{config_id}"]);

endpoint!(CreateConfigRequest, POST, CREATE_CONFIG);
endpoint!(GetConfigRequest, GET, GET_CONFIG);
endpoint!(
    /// 📋 Paged, filterable listing of channel configs.
    GetConfigsRequest, GET, GET_CONFIGS
);
endpoint!(UpdateConfigRequest, PUT, UPDATE_CONFIG);
endpoint!(DeleteConfigRequest, DELETE, DELETE_CONFIG);
endpoint!(ListFeaturesRequest, GET, LIST_FEATURES);
endpoint!(ListChannelsRequest, GET, LIST_CHANNELS);
endpoint!(
    /// 📣 Fire a test message through a channel.
    SendTestRequest, POST, SEND_TEST
);

impl CreateConfigRequest {
    pub fn new() -> Self {
        Self::blank()
    }
}

impl GetConfigRequest {
    pub fn new(config_id: &str) -> Self {
        Self::blank().route("config_id", config_id)
    }
}

impl GetConfigsRequest {
    pub fn new() -> Self {
        Self::blank()
    }
}

impl UpdateConfigRequest {
    pub fn new(config_id: &str) -> Self {
        Self::blank().route("config_id", config_id)
    }
}

impl DeleteConfigRequest {
    pub fn new(config_id: &str) -> Self {
        Self::blank().route("config_id", config_id)
    }
}

impl ListFeaturesRequest {
    pub fn new() -> Self {
        Self::blank()
    }
}

impl ListChannelsRequest {
    pub fn new() -> Self {
        Self::blank()
    }
}

impl SendTestRequest {
    pub fn new(config_id: &str) -> Self {
        Self::blank().route("config_id", config_id)
    }
}

default_via_new!(CreateConfigRequest, GetConfigsRequest, ListFeaturesRequest, ListChannelsRequest);

query_params!(GetConfigsRequest {
    config_id_list: Names,
    config_type: Names,
    is_enabled: bool,
    name: String,
    query: String,
    from_index: i64,
    max_items: i64,
    sort_field: String,
    sort_order: SortOrder,
});

json_body!(CreateConfigRequest, UpdateConfigRequest);

/// 📡 A channel config. The type-specific section (`slack`, `webhook`, `sns`...) is kept
/// as-is in `settings`, keyed by its type name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub config_type: String,
    #[serde(default = "enabled")]
    pub is_enabled: bool,
    #[serde(flatten)]
    pub settings: BTreeMap<String, Value>,
}

fn enabled() -> bool {
    true
}

impl ChannelConfig {
    /// 💬 A Slack channel, the one everybody sets up first.
    pub fn slack(name: impl Into<String>, webhook_url: impl Into<String>) -> Self {
        let mut settings = BTreeMap::new();
        settings.insert("slack".to_string(), serde_json::json!({ "url": webhook_url.into() }));
        Self {
            name: name.into(),
            description: None,
            config_type: "slack".to_string(),
            is_enabled: true,
            settings,
        }
    }
}

/// 📮 The create/update body: an optional id plus the config itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_id: Option<String>,
    pub config: ChannelConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigIdResponse {
    pub config_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigsResponse {
    #[serde(default)]
    pub start_index: u64,
    #[serde(default)]
    pub total_hits: u64,
    #[serde(default)]
    pub total_hit_relation: Option<String>,
    #[serde(default)]
    pub config_list: Vec<ConfigEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub config_id: String,
    #[serde(with = "dates::epoch_millis_opt", default)]
    pub last_updated_time_ms: Option<DateTime<Utc>>,
    #[serde(with = "dates::epoch_millis_opt", default)]
    pub created_time_ms: Option<DateTime<Utc>>,
    pub config: ChannelConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteConfigResponse {
    /// config id to `OK` (or whatever status the plugin reported for it)
    #[serde(default)]
    pub delete_response_list: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeaturesResponse {
    #[serde(default)]
    pub allowed_config_type_list: Vec<String>,
    #[serde(default)]
    pub plugin_features: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelsResponse {
    #[serde(default)]
    pub start_index: u64,
    #[serde(default)]
    pub total_hits: u64,
    #[serde(default)]
    pub total_hit_relation: Option<String>,
    #[serde(default)]
    pub channel_list: Vec<Channel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub config_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub config_type: String,
    #[serde(default)]
    pub is_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendTestResponse {
    #[serde(default)]
    pub event_source: Value,
    #[serde(default)]
    pub status_list: Vec<DeliveryReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub config_id: String,
    #[serde(default)]
    pub config_type: Option<String>,
    #[serde(default)]
    pub config_name: Option<String>,
    #[serde(default)]
    pub email_recipient_status: Vec<Value>,
    pub delivery_status: DeliveryStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryStatus {
    /// the remote end's HTTP status, as a string
    pub status_code: String,
    #[serde(default)]
    pub status_text: String,
}

impl DeliveryReport {
    pub fn delivered(&self) -> bool {
        self.delivery_status.status_code == "200"
    }
}

/// 🔔 `client.notifications()`
#[derive(Debug, Clone, Copy)]
pub struct Notifications<'a> {
    transport: &'a Transport,
}

impl<'a> Notifications<'a> {
    pub(crate) fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    pub async fn create_config(&self, request: CreateConfigRequest) -> Result<ConfigIdResponse> {
        self.transport.perform(request).await?.json()
    }

    /// 🔍 Same envelope as [`Notifications::get_configs`], with a single entry.
    pub async fn get_config(&self, request: GetConfigRequest) -> Result<ConfigsResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn get_configs(&self, request: GetConfigsRequest) -> Result<ConfigsResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn update_config(&self, request: UpdateConfigRequest) -> Result<ConfigIdResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn delete_config(&self, request: DeleteConfigRequest) -> Result<DeleteConfigResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn list_features(&self, request: ListFeaturesRequest) -> Result<FeaturesResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn list_channels(&self, request: ListChannelsRequest) -> Result<ChannelsResponse> {
        self.transport.perform(request).await?.json()
    }

    /// 📣 A failed delivery is still an `Ok`; check [`DeliveryReport::delivered`].
    pub async fn send_test(&self, request: SendTestRequest) -> Result<SendTestResponse> {
        self.transport.perform(request).await?.json()
    }
}

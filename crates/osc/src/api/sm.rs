//! ⏰ Snapshot Management (`_plugins/_sm`): cron-driven snapshot creation and retention.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::common::{Acknowledged, WriteResponse};
use crate::api::{SortOrder, UrlLookup};
use crate::error::Result;
use crate::transport::Transport;

static CREATE_POLICY: UrlLookup = UrlLookup::new("sm.create_policy", &["/_plugins/_sm/policies/{policy_name}"]);
static UPDATE_POLICY: UrlLookup = UrlLookup::new("sm.update_policy", &["/_plugins/_sm/policies/{policy_name}"]);
static GET_POLICY: UrlLookup = UrlLookup::new("sm.get_policy", &["/_plugins/_sm/policies/{policy_name}"]);
static GET_POLICIES: UrlLookup = UrlLookup::new("sm.get_policies", &["/_plugins/_sm/policies"]);
static DELETE_POLICY: UrlLookup = UrlLookup::new("sm.delete_policy", &["/_plugins/_sm/policies/{policy_name}"]);
static EXPLAIN_POLICY: UrlLookup =
    UrlLookup::new("sm.explain_policy", &["/_plugins/_sm/policies/{policy_name}/_explain"]);
static START_POLICY: UrlLookup = UrlLookup::new("sm.start_policy", &["/_plugins/_sm/policies/{policy_name}/_start"]);
static STOP_POLICY: UrlLookup = UrlLookup::new("sm.stop_policy", &["/_plugins/_sm/policies/{policy_name}/_stop"]);

endpoint!(CreatePolicyRequest, POST, CREATE_POLICY);
endpoint!(
    /// ✏️ Optimistic concurrency: pass the `_seq_no`/`_primary_term` you read.
    UpdatePolicyRequest, PUT, UPDATE_POLICY
);
endpoint!(GetPolicyRequest, GET, GET_POLICY);
endpoint!(GetPoliciesRequest, GET, GET_POLICIES);
endpoint!(DeletePolicyRequest, DELETE, DELETE_POLICY);
endpoint!(ExplainPolicyRequest, GET, EXPLAIN_POLICY);
endpoint!(StartPolicyRequest, POST, START_POLICY);
endpoint!(StopPolicyRequest, POST, STOP_POLICY);

macro_rules! by_policy_name {
    ($($name:ident),+) => {
        $(impl $name {
            pub fn new(policy_name: &str) -> Self {
                Self::blank().route("policy_name", policy_name)
            }
        })+
    };
}

by_policy_name!(
    CreatePolicyRequest,
    UpdatePolicyRequest,
    GetPolicyRequest,
    DeletePolicyRequest,
    ExplainPolicyRequest,
    StartPolicyRequest,
    StopPolicyRequest
);

impl GetPoliciesRequest {
    pub fn new() -> Self {
        Self::blank()
    }
}

default_via_new!(GetPoliciesRequest);

query_params!(UpdatePolicyRequest {
    if_seq_no: i64,
    if_primary_term: i64,
});

query_params!(GetPoliciesRequest {
    from: i64,
    size: i64,
    query_string as "queryString": String,
    sort_field as "sortField": String,
    sort_order as "sortOrder": SortOrder,
});

json_body!(CreatePolicyRequest, UpdatePolicyRequest);

/// ⏰ A snapshot management policy. Schedules and conditions stay as JSON; their
/// shapes are documented per plugin version and change more often than this crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SmPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<i64>,
    /// `{"schedule": {"cron": {"expression": "0 8 * * *", "timezone": "UTC"}}, "time_limit": "1h"}`
    pub creation: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion: Option<Value>,
    /// `{"repository": "backups", "indices": "logs-*", "date_format": "yyyy-MM-dd-HH:mm"}`
    pub snapshot_config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_time: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyResponse {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_version", default)]
    pub version: Option<i64>,
    #[serde(rename = "_seq_no", default)]
    pub seq_no: Option<i64>,
    #[serde(rename = "_primary_term", default)]
    pub primary_term: Option<i64>,
    pub sm_policy: SmPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoliciesResponse {
    #[serde(default)]
    pub policies: Vec<PolicyResponse>,
    #[serde(default)]
    pub total_policies: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplainResponse {
    #[serde(default)]
    pub policies: Vec<PolicyExplanation>,
}

/// 🔎 Where a policy's state machines are, and when they'll fire next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyExplanation {
    pub name: String,
    #[serde(default)]
    pub creation: Option<Value>,
    #[serde(default)]
    pub deletion: Option<Value>,
    #[serde(default)]
    pub policy_seq_no: Option<i64>,
    #[serde(default)]
    pub policy_primary_term: Option<i64>,
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// ⏰ `client.sm()`
#[derive(Debug, Clone, Copy)]
pub struct Sm<'a> {
    transport: &'a Transport,
}

impl<'a> Sm<'a> {
    pub(crate) fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    pub async fn create_policy(&self, request: CreatePolicyRequest) -> Result<PolicyResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn update_policy(&self, request: UpdatePolicyRequest) -> Result<PolicyResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn get_policy(&self, request: GetPolicyRequest) -> Result<PolicyResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn get_policies(&self, request: GetPoliciesRequest) -> Result<PoliciesResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn delete_policy(&self, request: DeletePolicyRequest) -> Result<WriteResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn explain_policy(&self, request: ExplainPolicyRequest) -> Result<ExplainResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn start_policy(&self, request: StartPolicyRequest) -> Result<Acknowledged> {
        self.transport.perform(request).await?.json()
    }

    pub async fn stop_policy(&self, request: StopPolicyRequest) -> Result<Acknowledged> {
        self.transport.perform(request).await?.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::into_request;
    use crate::client::Client;
    use crate::transport::InMemoryConnection;
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;

    fn client() -> (Client, Arc<InMemoryConnection>) {
        let fake = Arc::new(InMemoryConnection::new());
        (Client::in_memory("http://localhost:9200", Arc::clone(&fake)).unwrap(), fake)
    }

    fn nightly() -> SmPolicy {
        SmPolicy {
            description: Some("nightly logs".into()),
            creation: json!({"schedule": {"cron": {"expression": "0 8 * * *", "timezone": "UTC"}}}),
            deletion: Some(json!({"condition": {"max_count": 7}})),
            snapshot_config: json!({"repository": "backups", "indices": "logs-*"}),
            ..SmPolicy::default()
        }
    }

    #[tokio::test]
    async fn the_one_where_a_policy_is_created_then_updated_with_its_seq_no() {
        let (client, fake) = client();
        let stored = json!({
            "_id": "nightly-sm-policy", "_version": 1, "_seq_no": 5, "_primary_term": 1,
            "sm_policy": {"name": "nightly", "description": "nightly logs", "schema_version": 15,
                          "creation": {"schedule": {"cron": {"expression": "0 8 * * *", "timezone": "UTC"}}},
                          "deletion": {"condition": {"max_count": 7}},
                          "snapshot_config": {"repository": "backups", "indices": "logs-*"},
                          "enabled": true, "last_updated_time": 1697168155000i64, "enabled_time": 1697168155000i64}
        })
        .to_string();
        fake.respond("http://localhost:9200", 201, stored.clone());
        fake.respond("http://localhost:9200", 200, stored);

        let sm = client.sm();
        let created = sm
            .create_policy(CreatePolicyRequest::new("nightly").body(&nightly()))
            .await
            .unwrap();
        assert_eq!(created.id, "nightly-sm-policy");
        assert_eq!(created.sm_policy.enabled, Some(true));

        sm.update_policy(
            UpdatePolicyRequest::new("nightly")
                .if_seq_no(created.seq_no.unwrap())
                .if_primary_term(created.primary_term.unwrap())
                .body(&nightly()),
        )
        .await
        .unwrap();

        let calls = fake.calls();
        assert_eq!(calls[0].method, Method::POST);
        assert_eq!(calls[0].url.path(), "/_plugins/_sm/policies/nightly");
        let sent: Value = serde_json::from_slice(calls[0].body.as_ref().unwrap()).unwrap();
        assert!(sent.get("name").is_none());
        assert_eq!(sent["deletion"]["condition"]["max_count"], 7);
        assert_eq!(calls[1].method, Method::PUT);
        assert_eq!(calls[1].url.query(), Some("if_primary_term=1&if_seq_no=5"));
    }

    #[test]
    fn the_one_where_listing_speaks_camel_case_on_the_query_string() {
        let request = into_request(
            GetPoliciesRequest::new()
                .size(20)
                .sort_field("sm_policy.name")
                .sort_order(SortOrder::Asc),
        )
        .unwrap();
        assert_eq!(
            request.query,
            vec![
                ("size".to_string(), "20".to_string()),
                ("sortField".to_string(), "sm_policy.name".to_string()),
                ("sortOrder".to_string(), "asc".to_string()),
            ]
        );
        let start = into_request(StartPolicyRequest::new("nightly")).unwrap();
        assert_eq!(start.method, Method::POST);
    }
}

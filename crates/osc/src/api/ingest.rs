//! 🧪 Ingest pipelines: transform documents on the way in.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::common::Acknowledged;
use crate::api::UrlLookup;
use crate::error::Result;
use crate::serialization::{ErrorCause, Time};
use crate::transport::Transport;

static PUT_PIPELINE: UrlLookup = UrlLookup::new("ingest.put_pipeline", &["/_ingest/pipeline/{id}"]);
static GET_PIPELINE: UrlLookup =
    UrlLookup::new("ingest.get_pipeline", &["/_ingest/pipeline/{id}", "/_ingest/pipeline"]);
static DELETE_PIPELINE: UrlLookup = UrlLookup::new("ingest.delete_pipeline", &["/_ingest/pipeline/{id}"]);
static SIMULATE: UrlLookup = UrlLookup::new(
    "ingest.simulate",
    &["/_ingest/pipeline/{id}/_simulate", "/_ingest/pipeline/_simulate"],
);
static PROCESSOR_GROK: UrlLookup = UrlLookup::new("ingest.processor_grok", &["/_ingest/processor/grok"]);

endpoint!(PutPipelineRequest, PUT, PUT_PIPELINE);
endpoint!(GetPipelineRequest, GET, GET_PIPELINE);
endpoint!(DeletePipelineRequest, DELETE, DELETE_PIPELINE);
endpoint!(
    /// 🧫 Dry-run a pipeline (stored, or inline in the body) against sample documents.
    SimulatePipelineRequest, POST, SIMULATE
);
endpoint!(GrokPatternsRequest, GET, PROCESSOR_GROK);

impl PutPipelineRequest {
    pub fn new(id: &str) -> Self {
        Self::blank().route("id", id)
    }
}

impl GetPipelineRequest {
    pub fn new() -> Self {
        Self::blank()
    }

    /// wildcards and comma lists both work
    pub fn id(self, id: &str) -> Self {
        self.route("id", id)
    }
}

impl DeletePipelineRequest {
    pub fn new(id: &str) -> Self {
        Self::blank().route("id", id)
    }
}

impl SimulatePipelineRequest {
    pub fn new() -> Self {
        Self::blank()
    }

    /// 🧫 Simulate a stored pipeline instead of one defined in the body.
    pub fn id(self, id: &str) -> Self {
        self.route("id", id)
    }
}

impl GrokPatternsRequest {
    pub fn new() -> Self {
        Self::blank()
    }
}

default_via_new!(GetPipelineRequest, SimulatePipelineRequest, GrokPatternsRequest);

query_params!(PutPipelineRequest {
    timeout: Time,
    cluster_manager_timeout: Time,
});

query_params!(GetPipelineRequest {
    cluster_manager_timeout: Time,
});

query_params!(DeletePipelineRequest {
    timeout: Time,
    cluster_manager_timeout: Time,
});

query_params!(SimulatePipelineRequest {
    verbose: bool,
});

json_body!(PutPipelineRequest, SimulatePipelineRequest);

/// 🧪 A pipeline definition. Processors stay as JSON, there are dozens of kinds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub processors: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub on_failure: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulatePipelineResponse {
    #[serde(default)]
    pub docs: Vec<SimulatedDocument>,
}

/// 🧫 One sample document after the pipeline had its way with it. With `verbose=true`
/// the per-processor steps are in `processor_results` instead of `doc`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulatedDocument {
    #[serde(default)]
    pub doc: Option<IngestedDocument>,
    #[serde(default)]
    pub error: Option<ErrorCause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub processor_results: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestedDocument {
    #[serde(rename = "_index", default)]
    pub index: Option<String>,
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(rename = "_source", default)]
    pub source: Value,
    #[serde(rename = "_ingest", default)]
    pub ingest: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrokPatternsResponse {
    #[serde(default)]
    pub patterns: BTreeMap<String, String>,
}

/// 🧪 `client.ingest()`
#[derive(Debug, Clone, Copy)]
pub struct Ingest<'a> {
    transport: &'a Transport,
}

impl<'a> Ingest<'a> {
    pub(crate) fn new(transport: &'a Transport) -> Self {
        Self { transport }
    }

    pub async fn put_pipeline(&self, request: PutPipelineRequest) -> Result<Acknowledged> {
        self.transport.perform(request).await?.json()
    }

    pub async fn get_pipeline(&self, request: GetPipelineRequest) -> Result<BTreeMap<String, Pipeline>> {
        self.transport.perform(request).await?.json()
    }

    pub async fn delete_pipeline(&self, request: DeletePipelineRequest) -> Result<Acknowledged> {
        self.transport.perform(request).await?.json()
    }

    pub async fn simulate(&self, request: SimulatePipelineRequest) -> Result<SimulatePipelineResponse> {
        self.transport.perform(request).await?.json()
    }

    pub async fn processor_grok(&self, request: GrokPatternsRequest) -> Result<GrokPatternsResponse> {
        self.transport.perform(request).await?.json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::transport::InMemoryConnection;
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;

    fn client() -> (Client, Arc<InMemoryConnection>) {
        let fake = Arc::new(InMemoryConnection::new());
        (Client::in_memory("http://localhost:9200", Arc::clone(&fake)).unwrap(), fake)
    }

    #[tokio::test]
    async fn the_one_where_a_pipeline_goes_in_and_comes_back() {
        let (client, fake) = client();
        fake.respond("http://localhost:9200", 200, r#"{"acknowledged":true}"#);
        fake.respond(
            "http://localhost:9200",
            200,
            r#"{"lowercase-msg":{"description":"shh","processors":[{"lowercase":{"field":"msg"}}],"version":2}}"#,
        );

        let pipeline = Pipeline {
            description: Some("shh".into()),
            processors: vec![json!({"lowercase": {"field": "msg"}})],
            version: Some(2),
            ..Pipeline::default()
        };
        let put = client
            .ingest()
            .put_pipeline(PutPipelineRequest::new("lowercase-msg").body(&pipeline))
            .await
            .unwrap();
        assert!(put.acknowledged);

        let fetched = client
            .ingest()
            .get_pipeline(GetPipelineRequest::new().id("lowercase-msg"))
            .await
            .unwrap();
        assert_eq!(fetched["lowercase-msg"], pipeline);

        let calls = fake.calls();
        assert_eq!(calls[0].method, Method::PUT);
        assert_eq!(calls[0].url.path(), "/_ingest/pipeline/lowercase-msg");
        assert_eq!(calls[1].method, Method::GET);
    }

    #[tokio::test]
    async fn the_one_where_the_simulation_reports_per_document_failures() {
        let (client, fake) = client();
        fake.respond(
            "http://localhost:9200",
            200,
            r#"{"docs":[
                {"doc":{"_index":"_index","_id":"_id","_source":{"msg":"hello"},"_ingest":{"timestamp":"2023-10-13T03:35:55.000Z"}}},
                {"error":{"root_cause":[{"type":"illegal_argument_exception","reason":"field [msg] not present"}],
                          "type":"illegal_argument_exception","reason":"field [msg] not present"}}
            ]}"#,
        );
        let simulated = client
            .ingest()
            .simulate(SimulatePipelineRequest::new().id("lowercase-msg").body(&json!({
                "docs": [{"_source": {"msg": "HELLO"}}, {"_source": {}}]
            })))
            .await
            .unwrap();

        assert_eq!(simulated.docs.len(), 2);
        assert_eq!(simulated.docs[0].doc.as_ref().unwrap().source["msg"], "hello");
        let error = simulated.docs[1].error.as_ref().unwrap();
        assert_eq!(error.error_type.as_deref(), Some("illegal_argument_exception"));
        assert_eq!(fake.calls()[0].url.path(), "/_ingest/pipeline/lowercase-msg/_simulate");
    }
}

//! # 📡 THE TRANSPORT
//!
//! Every typed call and every raw call ends up in [`Transport::send`]. It picks a node,
//! pings it if it just came back from the dead, sends the request, and when the node
//! answers with a 502/503/504 or doesn't answer at all, marks it dead and moves on to
//! the next one. Occasionally it asks the cluster what it looks like now (sniffing) and
//! reseeds the pool with the answer.
//!
//! ```text
//!   send ──► sniff on startup? ──► sniff if stale? ──► view ──► [ping] ──► request
//!                                                      ▲                     │
//!                                                      └── mark dead, next ◄─┘ 502/503/504, conn error
//! ```
//!
//! Everything that happens along the way is written into the [`AuditTrail`] that comes back
//! with the response (or with the error). 🕵️

pub mod audit;
pub mod connection;
pub mod connection_pool;
pub mod node;
pub mod request;
pub mod response;
pub mod sniff;

use std::io::Write;
use std::time::{Duration, Instant};

use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use futures::future::join_all;
use reqwest::header::{
    ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue,
};
use tokio::sync::Mutex;
use tracing::{Instrument, debug, debug_span, warn};
use url::Url;

use crate::api::Endpoint;
use crate::client_config::ClientConfig;
use crate::error::{ConnectionError, Error, PipelineError, PipelineFailure, Result};

pub use audit::{Audit, AuditEvent, AuditTrail};
pub use connection::{
    Auth, Connection, ConnectionBackend, HttpConnection, InMemoryConnection, Outcome,
    PreparedRequest, RawResponse, RecordedRequest,
};
pub use connection_pool::{ConnectionPool, NodeView, PoolKind};
pub use node::{Node, NodeRoles};
pub use request::{Body, RequestConfig, RequestPath, TransportRequest};
pub use response::TransportResponse;

/// 🛠️ For low-level callers building a [`TransportRequest`] by hand.
pub use reqwest::Method;

/// 🔧 Knobs for the pipeline. Defaults match what a cluster operator would expect.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub ping_timeout: Duration,
    pub dead_timeout: Duration,
    pub max_dead_timeout: Duration,
    /// `None` lets the pool decide (node count - 1)
    pub max_retries: Option<usize>,
    /// `None` means the request timeout
    pub max_retry_timeout: Option<Duration>,
    pub sniff_on_startup: bool,
    pub sniff_on_connection_fault: bool,
    /// `None` never re-sniffs because of age alone
    pub sniff_lifespan: Option<Duration>,
    pub disable_pings: bool,
    pub http_compression: bool,
    pub pretty_json: bool,
    pub skip_cluster_manager_only_nodes: bool,
    pub auth: Option<Auth>,
    pub proxy: Option<String>,
    pub headers: Vec<(String, String)>,
    pub query_params: Vec<(String, String)>,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            ping_timeout: Duration::from_secs(2),
            dead_timeout: Duration::from_secs(60),
            max_dead_timeout: Duration::from_secs(30 * 60),
            max_retries: None,
            max_retry_timeout: None,
            sniff_on_startup: true,
            sniff_on_connection_fault: true,
            sniff_lifespan: None,
            disable_pings: false,
            http_compression: false,
            pretty_json: false,
            skip_cluster_manager_only_nodes: true,
            auth: None,
            proxy: None,
            headers: Vec::new(),
            query_params: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct SniffState {
    started: bool,
    last_sniff: Instant,
}

/// 🏓 How one node answered `ping_all`.
#[derive(Debug)]
pub struct PingOutcome {
    pub node: Url,
    pub took: Duration,
    pub result: std::result::Result<u16, ConnectionError>,
}

impl PingOutcome {
    pub fn is_alive(&self) -> bool {
        matches!(self.result, Ok(status) if (200..300).contains(&status))
    }
}

/// 📦 A request body after compression, shared across retries.
#[derive(Debug, Clone)]
struct EncodedBody {
    bytes: Bytes,
    content_type: String,
    gzipped: bool,
}

/// 🧮 Per-request numbers, resolved once from settings and overrides.
#[derive(Debug, Clone, Copy)]
struct Limits {
    request_timeout: Duration,
    ping_timeout: Duration,
    max_retries: usize,
    max_retry_timeout: Duration,
}

#[derive(Debug)]
pub struct Transport {
    pool: ConnectionPool,
    connection: ConnectionBackend,
    settings: TransportSettings,
    sniff_state: Mutex<SniffState>,
}

impl Transport {
    pub fn new(pool: ConnectionPool, connection: ConnectionBackend, settings: TransportSettings) -> Self {
        Self {
            pool,
            connection,
            settings,
            sniff_state: Mutex::new(SniffState {
                started: false,
                last_sniff: Instant::now(),
            }),
        }
    }

    /// 🏗️ Pool, HTTP connection and settings, all from one config.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let settings = config.transport_settings()?;
        let uris = config.node_urls()?;
        let kind = config.pool_kind();
        let pool = ConnectionPool::new(kind, uris)?;
        let connection = ConnectionBackend::Http(HttpConnection::new(
            settings.connect_timeout,
            settings.proxy.as_deref(),
        )?);
        debug!(?kind, nodes = pool.len(), "🏗️ transport ready");
        Ok(Self::new(pool, connection, settings))
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    /// 🚀 Send one request through the pipeline. Any status the cluster returns is a
    /// successful *transport*; only exhausted retries and dead clusters are errors here.
    pub async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let span = debug_span!("osc.request", method = %request.method, path = %request.path);
        self.pipeline(request).instrument(span).await
    }

    /// 🎯 Resolve a typed endpoint, send it, and turn unexpected statuses into [`Error::Api`].
    pub async fn perform<E: Endpoint>(&self, endpoint: E) -> Result<TransportResponse> {
        let request = crate::api::into_request(endpoint)?;
        let config = request.config.clone();
        let response = self.send(request).await?;
        if response.is_success() || config.allows(response.status) {
            Ok(response)
        } else {
            Err(response.into_api_error())
        }
    }

    /// ❓ HEAD-style existence check: 2xx is `true`, 404 is `false`, anything else is an error.
    pub async fn exists<E: Endpoint>(&self, endpoint: E) -> Result<bool> {
        let request = crate::api::into_request(endpoint)?;
        let response = self.send(request).await?;
        match response.status {
            200..=299 => Ok(true),
            404 => Ok(false),
            _ => Err(response.into_api_error()),
        }
    }

    /// 🏓 Ping every node in the pool at once, ignoring health bookkeeping.
    pub async fn ping_all(&self) -> Vec<PingOutcome> {
        let nodes = self.pool.nodes();
        let pings = nodes.iter().map(|node| async move {
            let began = Instant::now();
            let result = match self.ping_request(node.uri(), self.settings.ping_timeout) {
                Ok(request) => self
                    .connection
                    .execute(request)
                    .await
                    .map(|response| response.status),
                Err(error) => Err(ConnectionError::Connect(error.to_string())),
            };
            PingOutcome {
                node: node.uri().clone(),
                took: began.elapsed(),
                result,
            }
        });
        join_all(pings).await
    }

    async fn pipeline(&self, request: TransportRequest) -> Result<TransportResponse> {
        let began = Instant::now();
        let mut audit = AuditTrail::default();
        let limits = self.limits(&request.config);
        let body = self.encode_body(request.body.as_ref())?;

        if let Some(forced) = request.config.force_node.clone() {
            return self.send_forced(&request, body.as_ref(), forced, limits, audit, began).await;
        }

        self.sniff_on_startup(&request.config, limits, &mut audit, began).await?;
        self.sniff_if_stale(&request.config, limits, &mut audit).await;

        let mut tried = 0usize;
        let mut sniffed_on_fault = false;
        let mut last_status = None;
        let mut last_error = None;

        'views: loop {
            let mut view = self.pool.create_view();
            while let Some(node) = view.next(&mut audit) {
                if began.elapsed() > limits.max_retry_timeout {
                    audit.record(AuditEvent::MaxTimeoutReached, None, None);
                    return Err(pipeline_error(
                        PipelineFailure::MaxTimeoutReached,
                        tried,
                        began,
                        last_status,
                        last_error,
                        audit,
                    ));
                }
                if tried > limits.max_retries {
                    audit.record(AuditEvent::MaxRetriesReached, None, None);
                    return Err(pipeline_error(
                        PipelineFailure::MaxRetriesReached,
                        tried,
                        began,
                        last_status,
                        last_error,
                        audit,
                    ));
                }
                tried += 1;

                if self.should_ping(&node, &request.config) {
                    if let Err(error) = self.ping(&node, limits.ping_timeout, &mut audit).await {
                        node.mark_dead(self.settings.dead_timeout, self.settings.max_dead_timeout);
                        last_error = Some(error);
                        if self.sniff_on_fault(&request.config, &mut sniffed_on_fault, limits, &mut audit).await {
                            continue 'views;
                        }
                        continue;
                    }
                }

                let prepared = self.prepare(
                    node.uri(),
                    &request.method,
                    &request.path,
                    &request.query,
                    body.as_ref(),
                    &request.config,
                    limits.request_timeout,
                )?;
                let attempt_began = Instant::now();
                match self.connection.execute(prepared).await {
                    Ok(raw) if is_retryable(raw.status) => {
                        audit.record_timed(
                            AuditEvent::BadResponse,
                            Some(node.uri()),
                            attempt_began,
                            Some(format!("status {}", raw.status)),
                        );
                        node.mark_dead(self.settings.dead_timeout, self.settings.max_dead_timeout);
                        last_status = Some(raw.status);
                    }
                    Ok(raw) => {
                        node.mark_alive();
                        let event = if (200..300).contains(&raw.status) {
                            AuditEvent::HealthyResponse
                        } else {
                            AuditEvent::BadRequest
                        };
                        audit.record_timed(
                            event,
                            Some(node.uri()),
                            attempt_began,
                            Some(format!("status {}", raw.status)),
                        );
                        return self.respond(&request, node.uri(), raw, audit);
                    }
                    Err(error) => {
                        audit.record_timed(
                            AuditEvent::BadResponse,
                            Some(node.uri()),
                            attempt_began,
                            Some(error.to_string()),
                        );
                        node.mark_dead(self.settings.dead_timeout, self.settings.max_dead_timeout);
                        last_error = Some(error);
                    }
                }

                if self.sniff_on_fault(&request.config, &mut sniffed_on_fault, limits, &mut audit).await {
                    continue 'views;
                }
            }
            break;
        }

        let failure = if tried == 0 {
            audit.record(AuditEvent::NoNodesAttempted, None, None);
            PipelineFailure::NoNodesAttempted
        } else if tried > limits.max_retries {
            audit.record(AuditEvent::MaxRetriesReached, None, None);
            PipelineFailure::MaxRetriesReached
        } else {
            audit.record(AuditEvent::FailedOverAllNodes, None, None);
            PipelineFailure::FailedOverAllNodes
        };
        Err(pipeline_error(failure, tried, began, last_status, last_error, audit))
    }

    /// 🎯 One shot at one node. No pool, no ping, no sniff, no second chances.
    async fn send_forced(
        &self,
        request: &TransportRequest,
        body: Option<&EncodedBody>,
        forced: Url,
        limits: Limits,
        mut audit: AuditTrail,
        began: Instant,
    ) -> Result<TransportResponse> {
        let prepared = self.prepare(
            &forced,
            &request.method,
            &request.path,
            &request.query,
            body,
            &request.config,
            limits.request_timeout,
        )?;
        let attempt_began = Instant::now();
        match self.connection.execute(prepared).await {
            Ok(raw) => {
                let event = match raw.status {
                    200..=299 => AuditEvent::HealthyResponse,
                    status if is_retryable(status) => AuditEvent::BadResponse,
                    _ => AuditEvent::BadRequest,
                };
                audit.record_timed(event, Some(&forced), attempt_began, Some(format!("status {}", raw.status)));
                self.respond(request, &forced, raw, audit)
            }
            Err(error) => {
                audit.record_timed(AuditEvent::BadResponse, Some(&forced), attempt_began, Some(error.to_string()));
                Err(pipeline_error(PipelineFailure::BadResponse, 1, began, None, Some(error), audit))
            }
        }
    }

    fn limits(&self, config: &RequestConfig) -> Limits {
        let request_timeout = config.request_timeout.unwrap_or(self.settings.request_timeout);
        let max_retries = match self.pool.kind() {
            PoolKind::Single => 0,
            _ => config
                .max_retries
                .or(self.settings.max_retries)
                .unwrap_or_else(|| self.pool.max_retries()),
        };
        Limits {
            request_timeout,
            ping_timeout: config.ping_timeout.unwrap_or(self.settings.ping_timeout),
            max_retries,
            max_retry_timeout: self.settings.max_retry_timeout.unwrap_or(request_timeout),
        }
    }

    fn should_ping(&self, node: &Node, config: &RequestConfig) -> bool {
        node.is_resurrected()
            && self.pool.supports_pinging()
            && !self.settings.disable_pings
            && !config.disable_ping
    }

    async fn ping(
        &self,
        node: &Node,
        timeout: Duration,
        audit: &mut AuditTrail,
    ) -> std::result::Result<(), ConnectionError> {
        let began = Instant::now();
        let request = self
            .ping_request(node.uri(), timeout)
            .map_err(|error| ConnectionError::Connect(error.to_string()))?;
        let outcome = match self.connection.execute(request).await {
            Ok(raw) if (200..300).contains(&raw.status) => Ok(()),
            Ok(raw) => Err(ConnectionError::Connect(format!("ping returned status {}", raw.status))),
            Err(error) => Err(error),
        };
        match &outcome {
            Ok(()) => audit.record_timed(AuditEvent::PingSuccess, Some(node.uri()), began, None),
            Err(error) => audit.record_timed(
                AuditEvent::PingFailure,
                Some(node.uri()),
                began,
                Some(error.to_string()),
            ),
        }
        outcome
    }

    fn ping_request(&self, node: &Url, timeout: Duration) -> Result<PreparedRequest> {
        self.prepare(
            node,
            &Method::HEAD,
            &RequestPath::Raw("/".to_string()),
            &[],
            None,
            &RequestConfig::default(),
            timeout,
        )
    }

    async fn sniff_on_startup(
        &self,
        config: &RequestConfig,
        limits: Limits,
        audit: &mut AuditTrail,
        began: Instant,
    ) -> Result<()> {
        if !self.pool.supports_reseeding() || !self.settings.sniff_on_startup || config.disable_sniff {
            return Ok(());
        }
        // -- held across the sniff on purpose: concurrent first requests wait for one sniff
        let mut state = self.sniff_state.lock().await;
        if state.started {
            return Ok(());
        }
        state.started = true;
        audit.record(AuditEvent::SniffOnStartup, None, None);
        match self.sniff(limits.ping_timeout, audit).await {
            Ok(()) => {
                state.last_sniff = Instant::now();
                Ok(())
            }
            Err(source) => {
                let failure = PipelineFailure::CouldNotStartSniffOnStartup;
                let error = pipeline_error(failure, 0, began, None, source, std::mem::take(audit));
                Err(error)
            }
        }
    }

    async fn sniff_if_stale(&self, config: &RequestConfig, limits: Limits, audit: &mut AuditTrail) {
        let Some(lifespan) = self.settings.sniff_lifespan else {
            return;
        };
        if !self.pool.supports_reseeding() || config.disable_sniff {
            return;
        }
        let mut state = self.sniff_state.lock().await;
        if state.last_sniff.elapsed() < lifespan {
            return;
        }
        audit.record(AuditEvent::SniffOnStaleCluster, None, None);
        match self.sniff(limits.ping_timeout, audit).await {
            Ok(()) => state.last_sniff = Instant::now(),
            Err(_) => warn!("👃 stale cluster sniff failed, carrying on with the nodes we have"),
        }
    }

    /// Returns whether the pool was reseeded and the view should start over.
    async fn sniff_on_fault(
        &self,
        config: &RequestConfig,
        sniffed_on_fault: &mut bool,
        limits: Limits,
        audit: &mut AuditTrail,
    ) -> bool {
        if *sniffed_on_fault
            || !self.settings.sniff_on_connection_fault
            || !self.pool.supports_reseeding()
            || config.disable_sniff
        {
            return false;
        }
        *sniffed_on_fault = true;
        audit.record(AuditEvent::SniffOnFail, None, None);
        match self.sniff(limits.ping_timeout, audit).await {
            Ok(()) => {
                self.sniff_state.lock().await.last_sniff = Instant::now();
                true
            }
            Err(_) => false,
        }
    }

    /// 👃 Ask each known node in turn for the cluster's node list until one answers.
    async fn sniff(
        &self,
        ping_timeout: Duration,
        audit: &mut AuditTrail,
    ) -> std::result::Result<(), Option<ConnectionError>> {
        let query = sniff::sniff_query(ping_timeout);
        let path = RequestPath::Raw(sniff::SNIFF_PATH.to_string());
        let mut last_error = None;
        let mut nodes = self.pool.nodes();
        // -- ask the living first; the node that just failed us goes to the back of the line
        nodes.sort_by_key(|node| !node.is_alive());

        for node in nodes {
            let began = Instant::now();
            let prepared = match self.prepare(
                node.uri(),
                &Method::GET,
                &path,
                &query,
                None,
                &RequestConfig::default(),
                ping_timeout,
            ) {
                Ok(prepared) => prepared,
                Err(error) => {
                    audit.record(AuditEvent::SniffFailure, Some(node.uri()), Some(error.to_string()));
                    continue;
                }
            };
            let detail = match self.connection.execute(prepared).await {
                Ok(raw) if (200..300).contains(&raw.status) => {
                    match sniff::parse_nodes(&raw.body, node.uri(), self.settings.skip_cluster_manager_only_nodes) {
                        Ok(nodes) => {
                            let count = nodes.len();
                            self.pool.reseed(nodes);
                            audit.record_timed(
                                AuditEvent::SniffSuccess,
                                Some(node.uri()),
                                began,
                                Some(format!("{count} node(s)")),
                            );
                            return Ok(());
                        }
                        Err(error) => error.to_string(),
                    }
                }
                Ok(raw) => format!("status {}", raw.status),
                Err(error) => {
                    let detail = error.to_string();
                    last_error = Some(error);
                    detail
                }
            };
            audit.record_timed(AuditEvent::SniffFailure, Some(node.uri()), began, Some(detail));
        }
        Err(last_error)
    }

    fn encode_body(&self, body: Option<&Body>) -> Result<Option<EncodedBody>> {
        let Some(body) = body else {
            return Ok(None);
        };
        let content_type = body.content_type().to_string();
        if !self.settings.http_compression {
            return Ok(Some(EncodedBody {
                bytes: body.bytes().clone(),
                content_type,
                gzipped: false,
            }));
        }
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(body.bytes())?;
        Ok(Some(EncodedBody {
            bytes: Bytes::from(encoder.finish()?),
            content_type,
            gzipped: true,
        }))
    }

    /// 🧰 Node url + path + query + headers + auth, ready for a connection.
    #[allow(clippy::too_many_arguments)]
    fn prepare(
        &self,
        node: &Url,
        method: &Method,
        path: &RequestPath,
        query: &[(String, String)],
        body: Option<&EncodedBody>,
        config: &RequestConfig,
        timeout: Duration,
    ) -> Result<PreparedRequest> {
        let mut url = node.clone();
        path.apply(&mut url)?;
        let pretty = self.settings.pretty_json && !query.iter().any(|(key, _)| key == "pretty");
        let pairs: Vec<(&str, &str)> = self
            .settings
            .query_params
            .iter()
            .chain(query.iter())
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .chain(pretty.then_some(("pretty", "true")))
            .collect();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        let mut headers = HeaderMap::new();
        for (name, value) in self.settings.headers.iter().chain(config.headers.iter()) {
            headers.insert(header_name(name)?, header_value(name, value)?);
        }
        if let Some(opaque_id) = &config.opaque_id {
            headers.insert(HeaderName::from_static("x-opaque-id"), header_value("X-Opaque-Id", opaque_id)?);
        }
        if self.settings.http_compression {
            headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        }
        if let Some(body) = body {
            headers.insert(CONTENT_TYPE, header_value("Content-Type", &body.content_type)?);
            if body.gzipped {
                headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            }
        }

        Ok(PreparedRequest {
            method: method.clone(),
            url,
            headers,
            body: body.map(|body| body.bytes.clone()),
            timeout,
            auth: self.settings.auth.clone(),
        })
    }

    fn respond(
        &self,
        request: &TransportRequest,
        node: &Url,
        raw: RawResponse,
        audit: AuditTrail,
    ) -> Result<TransportResponse> {
        let mut url = node.clone();
        request.path.apply(&mut url)?;
        Ok(TransportResponse {
            method: request.method.clone(),
            url,
            status: raw.status,
            headers: raw.headers,
            body: raw.body,
            audit,
        })
    }
}

fn is_retryable(status: u16) -> bool {
    matches!(status, 502..=504)
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| Error::Config(format!("'{name}' is not a valid header name")))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| Error::Config(format!("value of header '{name}' is not valid header text")))
}

fn pipeline_error(
    failure: PipelineFailure,
    attempts: usize,
    began: Instant,
    last_status: Option<u16>,
    source: Option<ConnectionError>,
    audit: AuditTrail,
) -> Error {
    Error::Pipeline(Box::new(PipelineError {
        failure,
        attempts,
        elapsed: began.elapsed(),
        last_status,
        source,
        audit,
    }))
}

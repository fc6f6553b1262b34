//! 🔌 Connections: the thing that actually puts bytes on the wire. Or pretends to.
//!
//! Same shape as the rest of the crate's plumbing: a trait, a couple of concrete
//! implementations, and an enum that dispatches between them so the transport never
//! has to box anything.
//!
//! - [`HttpConnection`]: reqwest, for real clusters.
//! - [`InMemoryConnection`]: a scripted fake cluster. Knows nothing, records everything.

use std::collections::{HashMap, HashSet, VecDeque};
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use flate2::read::GzDecoder;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_ENCODING, HeaderMap};
use tracing::trace;
use url::Url;

use crate::error::{ConnectionError, Error, Result};

pub const USER_AGENT: &str = concat!("osc/", env!("CARGO_PKG_VERSION"), " (rust)");

/// 🔒 Credentials. API key beats basic auth when both are configured; that is decided upstream.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    Basic {
        username: String,
        password: Option<String>,
    },
    ApiKey(String),
}

impl std::fmt::Debug for Auth {
    // -- secrets stay out of the logs
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Basic { username, .. } => write!(f, "Basic({username}, ***)"),
            Auth::ApiKey(_) => f.write_str("ApiKey(***)"),
        }
    }
}

/// 📨 A request with everything decided: which node, which headers, how long to wait.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub timeout: Duration,
    pub auth: Option<Auth>,
}

impl PreparedRequest {
    pub(crate) fn is_ping(&self) -> bool {
        self.method == Method::HEAD && self.url.path() == "/"
    }
}

/// 📬 Whatever the node sent back, before anyone decides whether it was good news.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// 🔌 Execute one prepared request against one node. No retries, no opinions.
#[async_trait]
pub trait Connection: std::fmt::Debug + Send + Sync {
    async fn execute(&self, request: PreparedRequest) -> std::result::Result<RawResponse, ConnectionError>;
}

/// 📡 The real thing, over reqwest.
#[derive(Debug, Clone)]
pub struct HttpConnection {
    client: reqwest::Client,
}

impl HttpConnection {
    pub fn new(connect_timeout: Duration, proxy: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(USER_AGENT);
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy).map_err(Error::Client)?);
        }
        // 💀 usually a TLS backend that refused to initialize. nothing to retry here.
        let client = builder.build().map_err(Error::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Connection for HttpConnection {
    async fn execute(&self, request: PreparedRequest) -> std::result::Result<RawResponse, ConnectionError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers)
            .timeout(request.timeout);
        match &request.auth {
            Some(Auth::ApiKey(api_key)) => {
                builder = builder.header(AUTHORIZATION, format!("ApiKey {api_key}"));
            }
            Some(Auth::Basic { username, password }) => {
                builder = builder.basic_auth(username, password.as_ref());
            }
            None => {}
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        let body = if is_gzipped(&headers) {
            inflate(&body).map_err(ConnectionError::Decompress)?
        } else {
            body
        };
        trace!(status, bytes = body.len(), "📬 node answered");
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

fn is_gzipped(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|encoding| encoding.eq_ignore_ascii_case("gzip"))
}

/// 🫁 Un-squish a gzip body.
pub(crate) fn inflate(compressed: &[u8]) -> std::io::Result<Bytes> {
    let mut inflated = Vec::with_capacity(compressed.len() * 4);
    GzDecoder::new(compressed).read_to_end(&mut inflated)?;
    Ok(Bytes::from(inflated))
}

/// 🎬 What a scripted node does next.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Respond { status: u16, body: Bytes },
    /// the connection dies before any response arrives
    Fail(String),
}

/// 🧾 A request the fake cluster received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub auth: Option<Auth>,
}

/// 🧪 A cluster that lives entirely in memory.
///
/// Each node has a queue of scripted outcomes, consumed in order by every non-ping
/// request sent to it. When the queue is empty the default outcome applies.
/// Pings (`HEAD /`) succeed unless the node was told to fail them.
#[derive(Debug)]
pub struct InMemoryConnection {
    scripts: Mutex<HashMap<String, VecDeque<Outcome>>>,
    failing_pings: Mutex<HashSet<String>>,
    default: Outcome,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl Default for InMemoryConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryConnection {
    /// 🐣 Every node answers `200 {}` until told otherwise.
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            failing_pings: Mutex::new(HashSet::new()),
            default: Outcome::Respond {
                status: 200,
                body: Bytes::from_static(b"{}"),
            },
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_default(mut self, outcome: Outcome) -> Self {
        self.default = outcome;
        self
    }

    /// 📝 Queue an outcome for `node` (any url on that host and port).
    pub fn script(&self, node: &str, outcome: Outcome) -> &Self {
        lock(&self.scripts)
            .entry(key_of(node))
            .or_default()
            .push_back(outcome);
        self
    }

    pub fn respond(&self, node: &str, status: u16, body: impl Into<Bytes>) -> &Self {
        self.script(
            node,
            Outcome::Respond {
                status,
                body: body.into(),
            },
        )
    }

    pub fn fail(&self, node: &str, reason: impl Into<String>) -> &Self {
        self.script(node, Outcome::Fail(reason.into()))
    }

    /// 💀 Every ping to `node` fails from now on.
    pub fn fail_pings(&self, node: &str) -> &Self {
        lock(&self.failing_pings).insert(key_of(node));
        self
    }

    /// 🧾 Everything received so far, pings included, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    /// 🧾 Only the requests that were not pings.
    pub fn calls(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| !(request.method == Method::HEAD && request.url.path() == "/"))
            .collect()
    }
}

#[async_trait]
impl Connection for InMemoryConnection {
    async fn execute(&self, request: PreparedRequest) -> std::result::Result<RawResponse, ConnectionError> {
        let key = node_key(&request.url);
        let is_ping = request.is_ping();
        lock(&self.requests).push(RecordedRequest {
            method: request.method.clone(),
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
            auth: request.auth.clone(),
        });

        let outcome = if is_ping {
            if lock(&self.failing_pings).contains(&key) {
                Outcome::Fail(format!("ping to {key} refused"))
            } else {
                Outcome::Respond {
                    status: 200,
                    body: Bytes::new(),
                }
            }
        } else {
            lock(&self.scripts)
                .get_mut(&key)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| self.default.clone())
        };

        match outcome {
            Outcome::Respond { status, body } => Ok(RawResponse {
                status,
                headers: HeaderMap::new(),
                body,
            }),
            Outcome::Fail(reason) => Err(ConnectionError::Simulated(reason)),
        }
    }
}

/// 🎭 Enum dispatch over the connections we know how to build.
#[derive(Debug, Clone)]
pub enum ConnectionBackend {
    Http(HttpConnection),
    InMemory(Arc<InMemoryConnection>),
}

#[async_trait]
impl Connection for ConnectionBackend {
    async fn execute(&self, request: PreparedRequest) -> std::result::Result<RawResponse, ConnectionError> {
        match self {
            ConnectionBackend::Http(connection) => connection.execute(request).await,
            ConnectionBackend::InMemory(connection) => connection.execute(request).await,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn node_key(url: &Url) -> String {
    format!(
        "{}:{}",
        url.host_str().unwrap_or_default(),
        url.port_or_known_default().unwrap_or_default()
    )
}

fn key_of(node: &str) -> String {
    match Url::parse(node) {
        Ok(url) => node_key(&url),
        Err(_) => node.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn prepared(method: Method, url: &str) -> PreparedRequest {
        PreparedRequest {
            method,
            url: Url::parse(url).unwrap(),
            headers: HeaderMap::new(),
            body: None,
            timeout: Duration::from_secs(1),
            auth: None,
        }
    }

    #[tokio::test]
    async fn the_one_where_the_fake_cluster_follows_its_script() {
        let connection = InMemoryConnection::new();
        connection
            .respond("http://10.0.0.1:9200", 503, "busy")
            .fail("http://10.0.0.1:9200", "connection reset");
        connection.fail_pings("http://10.0.0.2:9200");

        let first = connection
            .execute(prepared(Method::GET, "http://10.0.0.1:9200/_search"))
            .await
            .unwrap();
        assert_eq!(first.status, 503);
        assert!(matches!(
            connection
                .execute(prepared(Method::GET, "http://10.0.0.1:9200/_search"))
                .await,
            Err(ConnectionError::Simulated(_))
        ));
        let third = connection
            .execute(prepared(Method::GET, "http://10.0.0.1:9200/_search"))
            .await
            .unwrap();
        assert_eq!(third.status, 200);
        assert_eq!(third.body.as_ref(), b"{}");

        assert!(connection.execute(prepared(Method::HEAD, "http://10.0.0.2:9200/")).await.is_err());
        assert!(connection.execute(prepared(Method::HEAD, "http://10.0.0.1:9200/")).await.is_ok());

        assert_eq!(connection.requests().len(), 5);
        assert_eq!(connection.calls().len(), 3);
    }

    #[test]
    fn the_one_where_squished_bodies_get_unsquished() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(br#"{"acknowledged":true}"#).unwrap();
        let compressed = encoder.finish().unwrap();
        assert_eq!(inflate(&compressed).unwrap().as_ref(), br#"{"acknowledged":true}"#);
        assert!(inflate(b"definitely not gzip").is_err());
    }

    #[test]
    fn the_one_where_secrets_stay_out_of_debug_output() {
        let basic = Auth::Basic {
            username: "admin".into(),
            password: Some("hunter2".into()),
        };
        assert_eq!(format!("{basic:?}"), "Basic(admin, ***)");
        assert_eq!(format!("{:?}", Auth::ApiKey("s3cret".into())), "ApiKey(***)");
    }
}

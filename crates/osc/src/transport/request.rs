//! 📨 What goes into the pipeline: method, path, query, body, and per-request overrides.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use url::Url;

use crate::error::{Error, Result};

/// 📦 A request body, already turned into bytes so retries can resend it for free.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Bytes),
    /// newline-delimited JSON, for `_bulk` and friends
    Ndjson(Bytes),
    Raw { bytes: Bytes, content_type: String },
}

impl Body {
    pub fn json<T: Serialize + ?Sized>(value: &T) -> std::result::Result<Body, serde_json::Error> {
        serde_json::to_vec(value).map(|bytes| Body::Json(Bytes::from(bytes)))
    }

    pub fn ndjson(text: impl Into<String>) -> Body {
        Body::Ndjson(Bytes::from(text.into()))
    }

    pub fn raw(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Body {
        Body::Raw {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    pub fn content_type(&self) -> &str {
        match self {
            Body::Json(_) => "application/json",
            Body::Ndjson(_) => "application/x-ndjson",
            Body::Raw { content_type, .. } => content_type,
        }
    }

    pub fn bytes(&self) -> &Bytes {
        match self {
            Body::Json(bytes) | Body::Ndjson(bytes) | Body::Raw { bytes, .. } => bytes,
        }
    }
}

/// 🎛️ Per-request overrides of the transport settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestConfig {
    pub request_timeout: Option<Duration>,
    pub ping_timeout: Option<Duration>,
    pub max_retries: Option<usize>,
    pub disable_ping: bool,
    pub disable_sniff: bool,
    /// skip the pool entirely and send exactly once to this node
    pub force_node: Option<Url>,
    /// non-2xx statuses that should still count as success for typed calls
    pub allowed_status_codes: Vec<u16>,
    pub opaque_id: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl RequestConfig {
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn ping_timeout(mut self, timeout: Duration) -> Self {
        self.ping_timeout = Some(timeout);
        self
    }

    pub fn max_retries(mut self, retries: usize) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn disable_ping(mut self) -> Self {
        self.disable_ping = true;
        self
    }

    pub fn disable_sniff(mut self) -> Self {
        self.disable_sniff = true;
        self
    }

    pub fn force_node(mut self, node: Url) -> Self {
        self.force_node = Some(node);
        self
    }

    pub fn allow_status(mut self, status: u16) -> Self {
        self.allowed_status_codes.push(status);
        self
    }

    pub fn opaque_id(mut self, opaque_id: impl Into<String>) -> Self {
        self.opaque_id = Some(opaque_id.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub(crate) fn allows(&self, status: u16) -> bool {
        self.allowed_status_codes.contains(&status)
    }
}

/// 🛣️ Either a path somebody typed, or segments the API layer resolved.
///
/// Typed paths are trusted to be encoded already. Resolved segments are raw values
/// (index names, document ids) and get percent-encoded one by one when the URL is built.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestPath {
    Raw(String),
    Segments(Vec<String>),
}

impl RequestPath {
    /// 🔗 Append this path to the node's URL, keeping any prefix the node already has.
    pub(crate) fn apply(&self, url: &mut Url) -> Result<()> {
        match self {
            RequestPath::Raw(path) => {
                let joined = format!(
                    "{}/{}",
                    url.path().trim_end_matches('/'),
                    path.trim_start_matches('/')
                );
                url.set_path(&joined);
            }
            RequestPath::Segments(segments) => {
                let node = url.to_string();
                url.path_segments_mut()
                    .map_err(|_| Error::Config(format!("node url {node} cannot carry a path")))?
                    .pop_if_empty()
                    .extend(segments);
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for RequestPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestPath::Raw(path) if path.starts_with('/') => f.write_str(path),
            RequestPath::Raw(path) => write!(f, "/{path}"),
            RequestPath::Segments(segments) => write!(f, "/{}", segments.join("/")),
        }
    }
}

/// 📨 One logical request. The pipeline may send it to several nodes.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub path: RequestPath,
    pub query: Vec<(String, String)>,
    pub body: Option<Body>,
    pub config: RequestConfig,
}

impl TransportRequest {
    /// 🛠️ A low-level request. `path` may carry its own `?query=string`.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (
                path.to_string(),
                url::form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect(),
            ),
            None => (path, Vec::new()),
        };
        Self {
            method,
            path: RequestPath::Raw(path),
            query,
            body: None,
            config: RequestConfig::default(),
        }
    }

    pub(crate) fn from_segments(method: Method, segments: Vec<String>) -> Self {
        Self {
            method,
            path: RequestPath::Segments(segments),
            query: Vec::new(),
            body: None,
            config: RequestConfig::default(),
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        Ok(self.body(Body::json(value).map_err(Error::Body)?))
    }

    pub fn config(mut self, config: RequestConfig) -> Self {
        self.config = config;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_raw_paths_bring_their_own_query_string() {
        let request = TransportRequest::new(Method::GET, "/_cat/indices?v=true&h=index,health");
        assert_eq!(request.path, RequestPath::Raw("/_cat/indices".into()));
        assert_eq!(
            request.query,
            vec![
                ("v".to_string(), "true".to_string()),
                ("h".to_string(), "index,health".to_string())
            ]
        );
    }

    #[test]
    fn the_one_where_segments_are_encoded_and_prefixes_survive() {
        let mut url = Url::parse("http://proxy:8080/search/").unwrap();
        RequestPath::Segments(vec!["my index".into(), "_doc".into(), "a/b?c".into()])
            .apply(&mut url)
            .unwrap();
        assert_eq!(url.as_str(), "http://proxy:8080/search/my%20index/_doc/a%2Fb%3Fc");

        let mut url = Url::parse("http://localhost:9200").unwrap();
        RequestPath::Raw("_cluster/health".into()).apply(&mut url).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9200/_cluster/health");
    }

    #[test]
    fn the_one_where_bodies_know_their_content_type() {
        let body = Body::json(&serde_json::json!({"a": 1})).unwrap();
        assert_eq!(body.content_type(), "application/json");
        assert_eq!(body.bytes().as_ref(), br#"{"a":1}"#);
        assert_eq!(Body::ndjson("{}\n").content_type(), "application/x-ndjson");
        assert_eq!(Body::raw("x", "text/plain").content_type(), "text/plain");
    }
}

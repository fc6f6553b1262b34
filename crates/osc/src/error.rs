//! 💀 Errors: every way a request can go sideways, typed.
//!
//! Two families matter in practice:
//! - [`ApiError`]: the cluster answered, and the answer was "no". Status + parsed [`ServerError`].
//! - [`PipelineError`]: we never got a usable answer. Nodes were dead, retries ran out,
//!   the clock ran out, or sniffing could not find anybody home.
//!
//! Both carry the [`AuditTrail`] so you can see exactly which node said what, and when.

use std::fmt;
use std::time::Duration;

use reqwest::Method;
use thiserror::Error;
use url::Url;

use crate::serialization::ServerError;
use crate::transport::audit::AuditTrail;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("invalid url '{url}': {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("no url template of `{api}` accepts route values [{provided}]; templates: {candidates}")]
    Route {
        api: &'static str,
        provided: String,
        candidates: String,
    },

    #[error("failed to serialize the request body: {0}")]
    Body(#[source] serde_json::Error),

    #[error("failed to deserialize the response body: {source}; body started with: {snippet}")]
    Deserialize {
        #[source]
        source: serde_json::Error,
        snippet: String,
    },

    #[error(transparent)]
    Api(Box<ApiError>),

    #[error(transparent)]
    Pipeline(Box<PipelineError>),

    #[error("failed to build the http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("io error while (de)compressing a body: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// 🔢 The HTTP status behind this error, if the cluster answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(api) => Some(api.status),
            Error::Pipeline(pipeline) => pipeline.last_status,
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn server_error(&self) -> Option<&ServerError> {
        match self {
            Error::Api(api) => api.server_error.as_ref(),
            _ => None,
        }
    }

    pub fn audit_trail(&self) -> Option<&AuditTrail> {
        match self {
            Error::Api(api) => Some(&api.audit),
            Error::Pipeline(pipeline) => Some(&pipeline.audit),
            _ => None,
        }
    }
}

/// 🚨 The cluster responded with a status we were not told to accept.
#[derive(Debug)]
pub struct ApiError {
    pub status: u16,
    pub method: Method,
    pub url: Url,
    pub server_error: Option<ServerError>,
    pub body: String,
    pub audit: AuditTrail,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} returned {}", self.method, self.url, self.status)?;
        match &self.server_error {
            Some(server_error) => write!(f, ": {}", server_error.error),
            None if self.body.is_empty() => Ok(()),
            None => write!(f, ": {}", snippet(&self.body)),
        }
    }
}

impl std::error::Error for ApiError {}

/// 🧭 Why the request pipeline gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PipelineFailure {
    #[error("the node returned a retryable response")]
    BadResponse,
    #[error("pinging the node failed")]
    PingFailure,
    #[error("sniffing the cluster failed")]
    SniffFailure,
    #[error("could not sniff the cluster on startup")]
    CouldNotStartSniffOnStartup,
    #[error("maximum retry timeout reached")]
    MaxTimeoutReached,
    #[error("maximum number of retries reached")]
    MaxRetriesReached,
    #[error("failed over all nodes without a usable response")]
    FailedOverAllNodes,
    #[error("no nodes were available to attempt the request")]
    NoNodesAttempted,
}

/// 🪦 The request never produced a response worth returning.
#[derive(Debug)]
pub struct PipelineError {
    pub failure: PipelineFailure,
    pub attempts: usize,
    pub elapsed: Duration,
    pub last_status: Option<u16>,
    pub source: Option<ConnectionError>,
    pub audit: AuditTrail,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} after {} attempt(s) in {:?}",
            self.failure, self.attempts, self.elapsed
        )?;
        if let Some(status) = self.last_status {
            write!(f, ", last status {status}")?;
        }
        if let Some(source) = &self.source {
            write!(f, ", last error: {source}")?;
        }
        Ok(())
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source as &(dyn std::error::Error + 'static))
    }
}

/// 🔌 One attempt against one node failed before an HTTP response arrived.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("request timed out")]
    Timeout,
    #[error("could not connect: {0}")]
    Connect(String),
    #[error(transparent)]
    Http(reqwest::Error),
    #[error("{0}")]
    Simulated(String),
    #[error("failed to inflate gzip response: {0}")]
    Decompress(#[source] std::io::Error),
}

impl From<reqwest::Error> for ConnectionError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ConnectionError::Timeout
        } else if error.is_connect() {
            ConnectionError::Connect(error.to_string())
        } else {
            ConnectionError::Http(error)
        }
    }
}

/// ✂️ First couple hundred characters of a body, for error messages that fit on a screen.
pub(crate) fn snippet(body: &str) -> String {
    const MAX: usize = 256;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut cut = MAX;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &body[..cut])
}

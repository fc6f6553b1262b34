//! 📬 What comes out of the pipeline: status, headers, the raw bytes, and the story of how we got them.

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{ApiError, Error, Result, snippet};
use crate::serialization::ServerError;
use crate::transport::audit::AuditTrail;

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub method: Method,
    /// the url of the node that finally answered
    pub url: Url,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub audit: AuditTrail,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 🦆 Deserialize the body. On failure the error carries the first bytes of what we got.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|source| Error::Deserialize {
            source,
            snippet: snippet(&self.text()),
        })
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn server_error(&self) -> Option<ServerError> {
        ServerError::from_body(&self.body, self.status)
    }

    pub fn audit_trail(&self) -> &AuditTrail {
        &self.audit
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub(crate) fn into_api_error(self) -> Error {
        let server_error = self.server_error();
        let body = self.text();
        Error::Api(Box::new(ApiError {
            status: self.status,
            method: self.method,
            url: self.url,
            server_error,
            body,
            audit: self.audit,
        }))
    }
}

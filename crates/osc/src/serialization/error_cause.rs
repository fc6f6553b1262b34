//! 💀 Error causes: the server's way of telling us what went wrong, in nested JSON.
//!
//! An error body looks like `{"error": {...}, "status": 400}`, except when it looks like
//! `{"error": "no handler found", "status": 400}`, except when `status` is missing, except
//! when `resource.id` is an array. Every cause can have a `caused_by` which can have a
//! `caused_by` which... you get it. Turtles. All the way down. 🐢
//!
//! Keys we don't model land in `metadata`, so nothing the server says gets dropped.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 🧾 One error, possibly wrapping another one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorCause {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caused_by: Option<Box<ErrorCause>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub root_cause: Vec<ErrorCause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_shards: Vec<ShardFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_uuid: Option<String>,
    // -- sometimes 3, sometimes "3", sometimes "_na_". we take them all as text
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub shard: Option<String>,
    #[serde(
        rename = "resource.id",
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub resource_id: Vec<String>,
    #[serde(rename = "resource.type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub script_stack: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<ScriptPosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouped: Option<bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub header: BTreeMap<String, Value>,
    /// 📦 Everything else. Plugins love inventing keys.
    #[serde(flatten)]
    pub metadata: BTreeMap<String, Value>,
}

/// 📍 Where in the painless script things went sideways.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptPosition {
    pub offset: i64,
    pub start: i64,
    pub end: i64,
}

/// 🧩 A single shard that failed while the rest of the request carried on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShardFailure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(default, deserialize_with = "string_or_number", skip_serializing_if = "Option::is_none")]
    pub shard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "cause_or_text")]
    pub reason: ErrorCause,
}

/// 🚨 The envelope around a failed request: `{"error": ..., "status": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerError {
    pub error: ErrorCause,
    pub status: u16,
}

impl ServerError {
    /// 🔍 Try to read a server error out of a response body.
    ///
    /// Returns `None` when the body is not JSON or carries no `error` key, which happens
    /// with proxies, load balancers, and HEAD requests (no body at all, very zen).
    /// A missing `status` in the body is filled from the HTTP status.
    pub fn from_body(body: &[u8], http_status: u16) -> Option<ServerError> {
        #[derive(Deserialize)]
        struct Envelope {
            #[serde(default)]
            error: Option<CauseRepr>,
            #[serde(default)]
            status: Option<u16>,
        }

        let envelope: Envelope = serde_json::from_slice(body).ok()?;
        let error = envelope.error?.into_cause();
        Some(ServerError {
            error,
            status: envelope.status.unwrap_or(http_status),
        })
    }
}

impl ErrorCause {
    /// 🐢 The innermost cause. Usually the one worth reading.
    pub fn innermost(&self) -> &ErrorCause {
        let mut current = self;
        while let Some(next) = current.caused_by.as_deref() {
            current = next;
        }
        current
    }

    fn from_reason(reason: String) -> Self {
        ErrorCause {
            reason: Some(reason),
            ..Default::default()
        }
    }
}

impl fmt::Display for ErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error_type, &self.reason) {
            (Some(kind), Some(reason)) => write!(f, "{kind}: {reason}")?,
            (Some(kind), None) => f.write_str(kind)?,
            (None, Some(reason)) => f.write_str(reason)?,
            (None, None) => f.write_str("unknown error")?,
        }
        if let Some(inner) = &self.caused_by {
            write!(f, " (caused by: {inner})")?;
        }
        Ok(())
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status, self.error)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CauseRepr {
    Text(String),
    Full(Box<ErrorCause>),
}

impl CauseRepr {
    fn into_cause(self) -> ErrorCause {
        match self {
            CauseRepr::Text(reason) => ErrorCause::from_reason(reason),
            CauseRepr::Full(cause) => *cause,
        }
    }
}

fn cause_or_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ErrorCause, D::Error> {
    CauseRepr::deserialize(deserializer).map(CauseRepr::into_cause)
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(one)) => vec![one],
        Some(OneOrMany::Many(many)) => many,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn the_one_where_the_turtles_go_all_the_way_down() {
        let body = json!({
            "error": {
                "root_cause": [{"type": "parse_exception", "reason": "bad json"}],
                "type": "search_phase_execution_exception",
                "reason": "all shards failed",
                "phase": "query",
                "grouped": true,
                "failed_shards": [{
                    "shard": 0,
                    "index": "logs",
                    "node": "n1",
                    "reason": {"type": "query_shard_exception", "reason": "failed to create query"}
                }],
                "caused_by": {
                    "type": "illegal_argument_exception",
                    "reason": "field [x] is not aggregatable",
                    "caused_by": {"type": "number_format_exception", "reason": "For input string: \"x\""}
                }
            },
            "status": 400
        });
        let server_error = ServerError::from_body(body.to_string().as_bytes(), 500).unwrap();

        assert_eq!(server_error.status, 400);
        let cause = &server_error.error;
        assert_eq!(cause.error_type.as_deref(), Some("search_phase_execution_exception"));
        assert_eq!(cause.root_cause.len(), 1);
        assert_eq!(cause.failed_shards[0].shard.as_deref(), Some("0"));
        assert_eq!(
            cause.failed_shards[0].reason.error_type.as_deref(),
            Some("query_shard_exception")
        );
        assert_eq!(cause.innermost().error_type.as_deref(), Some("number_format_exception"));
        assert_eq!(cause.grouped, Some(true));
        assert!(cause.to_string().starts_with("search_phase_execution_exception: all shards failed (caused by: illegal_argument_exception"));
    }

    #[test]
    fn the_one_where_the_error_is_just_a_string() {
        let body = br#"{"error":"no handler found for uri [/nope] and method [GET]"}"#;
        let server_error = ServerError::from_body(body, 400).unwrap();
        assert_eq!(server_error.status, 400, "status falls back to the http status");
        assert_eq!(server_error.error.error_type, None);
        assert_eq!(
            server_error.error.reason.as_deref(),
            Some("no handler found for uri [/nope] and method [GET]")
        );
    }

    #[test]
    fn the_one_where_resource_ids_come_in_bulk_and_extra_keys_are_kept() {
        let body = json!({
            "error": {
                "type": "index_not_found_exception",
                "reason": "no such index [a,b]",
                "resource.type": "index_or_alias",
                "resource.id": ["a", "b"],
                "index_uuid": "_na_",
                "index": "a",
                "shard": "_na_",
                "bytes_wanted": 1024
            },
            "status": 404
        });
        let server_error = ServerError::from_body(body.to_string().as_bytes(), 404).unwrap();
        let cause = server_error.error;
        assert_eq!(cause.resource_id, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(cause.resource_type.as_deref(), Some("index_or_alias"));
        assert_eq!(cause.shard.as_deref(), Some("_na_"));
        assert_eq!(cause.metadata.get("bytes_wanted"), Some(&json!(1024)));

        let single: ErrorCause =
            serde_json::from_value(json!({"type": "x", "resource.id": "only-one"})).unwrap();
        assert_eq!(single.resource_id, vec!["only-one".to_string()]);
    }

    #[test]
    fn the_one_where_non_errors_are_not_errors() {
        assert_eq!(ServerError::from_body(b"", 404), None);
        assert_eq!(ServerError::from_body(b"<html>bad gateway</html>", 502), None);
        assert_eq!(ServerError::from_body(br#"{"acknowledged":true}"#, 200), None);
    }
}

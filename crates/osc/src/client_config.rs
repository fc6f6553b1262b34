//! 🔧 Client configuration: which nodes, which pool, which credentials, which timeouts.
//!
//! Loaded with Figment from `OSC_*` environment variables and an optional TOML file.
//! Durations use the cluster's own time-unit syntax (`"30s"`, `"1m"`, `"1.5h"`), so the
//! same strings you'd put in a query string work here too.
//!
//! ```toml
//! nodes = ["https://node-1:9200", "https://node-2:9200"]
//! pool = "sniffing"
//! username = "admin"
//! password = "admin"
//!
//! [headers]
//! x-team = "search"
//!
//! [transport]
//! request_timeout = "30s"
//! sniff_lifespan = "5m"
//! http_compression = true
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;
use url::Url;

use crate::error::{Error, Result};
use crate::serialization::Time;
use crate::transport::{Auth, PoolKind, TransportSettings};

pub const DEFAULT_NODE: &str = "http://localhost:9200";

/// 📦 Everything a [`Client`](crate::Client) needs to know before its first request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// 🌐 Seed nodes. `OSC_NODES` may be a comma-separated string.
    #[serde(deserialize_with = "list_or_commas")]
    pub nodes: Vec<String>,
    /// absent: `single` for one node, `static` for more
    pub pool: Option<PoolKind>,
    pub username: Option<String>,
    pub password: Option<String>,
    /// base64 `id:key`, sent as `Authorization: ApiKey ...`; beats basic auth
    pub api_key: Option<String>,
    pub proxy: Option<String>,
    /// sent with every request
    pub headers: BTreeMap<String, String>,
    /// appended to every request's query string
    pub query_params: BTreeMap<String, String>,
    pub transport: TransportConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            nodes: vec![DEFAULT_NODE.to_string()],
            pool: None,
            username: None,
            password: None,
            api_key: None,
            proxy: None,
            headers: BTreeMap::new(),
            query_params: BTreeMap::new(),
            transport: TransportConfig::default(),
        }
    }
}

/// ⏱️ The `[transport]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub request_timeout: Time,
    pub connect_timeout: Time,
    pub ping_timeout: Time,
    pub dead_timeout: Time,
    pub max_dead_timeout: Time,
    pub max_retries: Option<usize>,
    pub max_retry_timeout: Option<Time>,
    pub sniff_on_startup: bool,
    pub sniff_on_connection_fault: bool,
    /// `-1` or absent: never re-sniff just because time passed
    pub sniff_lifespan: Option<Time>,
    pub disable_pings: bool,
    pub http_compression: bool,
    pub pretty_json: bool,
    pub skip_cluster_manager_only_nodes: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: Time::minutes(1.0),
            connect_timeout: Time::seconds(10.0),
            ping_timeout: Time::seconds(2.0),
            dead_timeout: Time::minutes(1.0),
            max_dead_timeout: Time::minutes(30.0),
            max_retries: None,
            max_retry_timeout: None,
            sniff_on_startup: true,
            sniff_on_connection_fault: true,
            sniff_lifespan: None,
            disable_pings: false,
            http_compression: false,
            pretty_json: false,
            skip_cluster_manager_only_nodes: true,
        }
    }
}

impl ClientConfig {
    /// 🌐 Defaults everywhere, these nodes.
    pub fn for_nodes<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            nodes: nodes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn node_urls(&self) -> Result<Vec<Url>> {
        if self.nodes.is_empty() {
            return Err(Error::Config("no nodes configured".to_string()));
        }
        self.nodes
            .iter()
            .map(|node| {
                Url::parse(node).map_err(|source| Error::Url {
                    url: node.clone(),
                    source,
                })
            })
            .collect()
    }

    pub fn pool_kind(&self) -> PoolKind {
        match self.pool {
            Some(kind) => kind,
            None if self.nodes.len() == 1 => PoolKind::Single,
            None => PoolKind::Static,
        }
    }

    /// 🔒 API key first, then basic auth, then nothing.
    pub fn auth(&self) -> Result<Option<Auth>> {
        if let Some(api_key) = &self.api_key {
            return Ok(Some(Auth::ApiKey(api_key.clone())));
        }
        match (&self.username, &self.password) {
            (Some(username), password) => Ok(Some(Auth::Basic {
                username: username.clone(),
                password: password.clone(),
            })),
            (None, Some(_)) => Err(Error::Config("a password was configured without a username".to_string())),
            (None, None) => Ok(None),
        }
    }

    /// 🔧 Resolve the config into the settings the transport runs on.
    pub fn transport_settings(&self) -> Result<TransportSettings> {
        let transport = &self.transport;
        Ok(TransportSettings {
            request_timeout: required("request_timeout", &transport.request_timeout)?,
            connect_timeout: required("connect_timeout", &transport.connect_timeout)?,
            ping_timeout: required("ping_timeout", &transport.ping_timeout)?,
            dead_timeout: required("dead_timeout", &transport.dead_timeout)?,
            max_dead_timeout: required("max_dead_timeout", &transport.max_dead_timeout)?,
            max_retries: transport.max_retries,
            max_retry_timeout: transport
                .max_retry_timeout
                .as_ref()
                .map(|time| required("max_retry_timeout", time))
                .transpose()?,
            sniff_on_startup: transport.sniff_on_startup,
            sniff_on_connection_fault: transport.sniff_on_connection_fault,
            sniff_lifespan: transport.sniff_lifespan.as_ref().and_then(Time::to_duration),
            disable_pings: transport.disable_pings,
            http_compression: transport.http_compression,
            pretty_json: transport.pretty_json,
            skip_cluster_manager_only_nodes: transport.skip_cluster_manager_only_nodes,
            auth: self.auth()?,
            proxy: self.proxy.clone(),
            headers: self.headers.clone().into_iter().collect(),
            query_params: self.query_params.clone().into_iter().collect(),
        })
    }
}

fn required(name: &str, time: &Time) -> Result<Duration> {
    time.to_duration()
        .ok_or_else(|| Error::Config(format!("transport.{name} must be a finite duration, not {time}")))
}

/// 🌐 `["a", "b"]` from TOML, or `"a,b"` from an env var.
fn list_or_commas<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    struct NodesVisitor;

    impl<'de> Visitor<'de> for NodesVisitor {
        type Value = Vec<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of node urls or a comma-separated string")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Self::Value, E> {
            Ok(value
                .split(',')
                .map(str::trim)
                .filter(|node| !node.is_empty())
                .map(str::to_string)
                .collect())
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
            let mut nodes = Vec::new();
            while let Some(node) = seq.next_element::<String>()? {
                nodes.push(node);
            }
            Ok(nodes)
        }
    }

    deserializer.deserialize_any(NodesVisitor)
}

/// 🚀 Load the config from `OSC_*` env vars plus an optional TOML file (the file wins).
///
/// Nested keys use `__`: `OSC_TRANSPORT__REQUEST_TIMEOUT=30s`. No file means env only;
/// no env either means every default, which is one node on `localhost:9200`.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<ClientConfig> {
    info!(file = ?config_file_name, "🔧 loading client configuration");

    let config = Figment::new().merge(Env::prefixed("OSC_").split("__"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse client configuration from '{}' and environment variables (OSC_*)",
            path.display()
        ),
        None => "💀 Failed to parse client configuration from environment variables (OSC_*)".to_string(),
    };

    config.extract().context(context_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("💀 no temp file for us today");
        file.write_all(contents.as_bytes()).expect("💀 the temp file refused our bytes");
        file
    }

    #[test]
    fn the_one_where_the_file_fills_in_everything() {
        let file = write_config(
            r#"
            nodes = ["https://node-1:9200", "https://node-2:9200"]
            pool = "sniffing"
            username = "admin"
            password = "hunter2"

            [headers]
            x-team = "search"

            [query_params]
            routing = "tenant-a"

            [transport]
            request_timeout = "30s"
            ping_timeout = "500ms"
            max_retries = 5
            sniff_lifespan = "5m"
            http_compression = true
            "#,
        );

        let config = load_config(Some(file.path())).expect("💀 the config should parse");
        assert_eq!(config.pool_kind(), PoolKind::Sniffing);
        assert_eq!(config.node_urls().unwrap().len(), 2);

        let settings = config.transport_settings().unwrap();
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.ping_timeout, Duration::from_millis(500));
        assert_eq!(settings.connect_timeout, Duration::from_secs(10));
        assert_eq!(settings.max_retries, Some(5));
        assert_eq!(settings.sniff_lifespan, Some(Duration::from_secs(300)));
        assert!(settings.http_compression);
        assert!(settings.sniff_on_startup);
        assert_eq!(settings.headers, vec![("x-team".to_string(), "search".to_string())]);
        assert_eq!(settings.query_params, vec![("routing".to_string(), "tenant-a".to_string())]);
        assert_eq!(
            settings.auth,
            Some(Auth::Basic {
                username: "admin".into(),
                password: Some("hunter2".into())
            })
        );
    }

    #[test]
    fn the_one_where_an_empty_file_means_localhost() {
        let file = write_config("");
        let config = load_config(Some(file.path())).expect("💀 an empty file is still a file");
        assert_eq!(config.nodes, vec![DEFAULT_NODE.to_string()]);
        assert_eq!(config.pool_kind(), PoolKind::Single);

        let settings = config.transport_settings().unwrap();
        assert_eq!(settings.request_timeout, Duration::from_secs(60));
        assert_eq!(settings.max_dead_timeout, Duration::from_secs(30 * 60));
        assert_eq!(settings.sniff_lifespan, None);
        assert!(settings.auth.is_none());
    }

    #[test]
    fn the_one_where_forever_is_not_a_timeout() {
        let file = write_config(
            r#"
            [transport]
            request_timeout = -1
            "#,
        );
        let config = load_config(Some(file.path())).unwrap();
        let error = config.transport_settings().unwrap_err();
        assert!(error.to_string().contains("transport.request_timeout"));
    }

    #[test]
    fn the_one_where_the_api_key_outranks_the_password() {
        let config = ClientConfig {
            username: Some("admin".into()),
            password: Some("admin".into()),
            api_key: Some("aWQ6a2V5".into()),
            ..ClientConfig::default()
        };
        assert_eq!(config.auth().unwrap(), Some(Auth::ApiKey("aWQ6a2V5".into())));

        let orphan = ClientConfig {
            password: Some("who am i".into()),
            ..ClientConfig::default()
        };
        assert!(matches!(orphan.auth(), Err(Error::Config(_))));
    }

    #[test]
    fn the_one_where_nodes_arrive_as_one_comma_separated_string() {
        let config: ClientConfig = Figment::new()
            .merge(figment::providers::Serialized::default(
                "nodes",
                "http://a:9200, http://b:9200",
            ))
            .extract()
            .unwrap();
        assert_eq!(config.nodes, vec!["http://a:9200", "http://b:9200"]);
        assert_eq!(config.pool_kind(), PoolKind::Static);

        let broken = ClientConfig::for_nodes(["not a url"]);
        assert!(matches!(broken.node_urls(), Err(Error::Url { .. })));
    }
}

//! 👃 Sniffing: ask the cluster who is in it, and believe the answer.
//!
//! The nodes info API reports every node's `http.publish_address` in one of three shapes:
//! `10.0.0.1:9200`, `search-1.internal/10.0.0.1:9200` (hostname wins, TLS certs like
//! hostnames), or `[::1]:9200`. The scheme is not reported at all, so it is inherited
//! from whichever node we sniffed.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::serialization::Time;
use crate::transport::node::{Node, NodeRoles};

/// 🛣️ The path and query of the sniff request.
pub(crate) const SNIFF_PATH: &str = "_nodes/http,settings";

pub(crate) fn sniff_query(ping_timeout: Duration) -> Vec<(String, String)> {
    vec![
        ("flat_settings".to_string(), "true".to_string()),
        ("timeout".to_string(), Time::from(ping_timeout).to_string()),
    ]
}

#[derive(Debug, Error)]
pub enum SniffParseError {
    #[error("sniff response is not a nodes info response: {0}")]
    Body(#[from] serde_json::Error),
    #[error("sniff response listed no node with a usable http publish address")]
    NoNodes,
}

#[derive(Debug, Deserialize)]
struct NodesInfo {
    #[serde(default)]
    nodes: BTreeMap<String, NodeInfo>,
}

#[derive(Debug, Deserialize)]
struct NodeInfo {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    roles: Option<Vec<String>>,
    #[serde(default)]
    http: Option<HttpInfo>,
    #[serde(default)]
    settings: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct HttpInfo {
    publish_address: String,
}

impl NodeInfo {
    fn roles(&self) -> NodeRoles {
        match &self.roles {
            Some(names) => NodeRoles::from_names(names.iter().map(String::as_str)),
            // -- old clusters have no roles array, just node.master / node.data flags
            None => NodeRoles {
                cluster_manager_eligible: self.cluster_manager_eligible(),
                data: self.flag("node.data"),
                ingest: self.flag("node.ingest"),
                http_enabled: self.flag("http.enabled"),
            },
        }
    }

    // -- renamed setting: either spelling saying yes is enough, neither present means yes
    fn cluster_manager_eligible(&self) -> bool {
        match (self.explicit_flag("node.master"), self.explicit_flag("node.cluster_manager")) {
            (None, None) => true,
            (master, cluster_manager) => master.unwrap_or(false) || cluster_manager.unwrap_or(false),
        }
    }

    fn flag(&self, key: &str) -> bool {
        self.explicit_flag(key).unwrap_or(true)
    }

    fn explicit_flag(&self, key: &str) -> Option<bool> {
        match self.settings.get(key)? {
            Value::Bool(value) => Some(*value),
            Value::String(value) => Some(!value.eq_ignore_ascii_case("false")),
            _ => Some(true),
        }
    }
}

/// 🧾 Turn a nodes info body into pool nodes.
pub(crate) fn parse_nodes(
    body: &[u8],
    sniffed_from: &Url,
    skip_cluster_manager_only: bool,
) -> Result<Vec<Node>, SniffParseError> {
    let info: NodesInfo = serde_json::from_slice(body)?;
    let scheme = sniffed_from.scheme();
    let nodes: Vec<Node> = info
        .nodes
        .into_iter()
        .filter_map(|(id, node)| {
            let uri = parse_publish_address(&node.http.as_ref()?.publish_address, scheme)?;
            let roles = node.roles();
            if !roles.http_enabled {
                return None;
            }
            Some(Node::with_details(uri, Some(id), node.name, roles))
        })
        .filter(|node| !(skip_cluster_manager_only && node.is_cluster_manager_only()))
        .collect();
    if nodes.is_empty() {
        return Err(SniffParseError::NoNodes);
    }
    Ok(nodes)
}

/// 📍 `ip:port`, `fqdn/ip:port` or `[ipv6]:port` into a URL with `scheme`.
pub fn parse_publish_address(address: &str, scheme: &str) -> Option<Url> {
    let (fqdn, address) = match address.split_once('/') {
        Some((fqdn, rest)) => (Some(fqdn).filter(|fqdn| !fqdn.is_empty()), rest),
        None => (None, address),
    };
    let (ip, port) = address.rsplit_once(':')?;
    let port: u16 = port.parse().ok()?;
    let host = fqdn.unwrap_or(ip);
    Url::parse(&format!("{scheme}://{host}:{port}")).ok()
}

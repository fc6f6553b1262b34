//! 🏊 Connection pools: which nodes a request may try, and in what order.
//!
//! Four flavours, one enum, no trait objects:
//! - `SingleNode`: one node. Never pinged, never sniffed, never retried.
//! - `Static`: a fixed list, round-robin, skipping nodes that are dead.
//! - `Sniffing`: `Static` that can be reseeded with whatever the cluster says it looks like today.
//! - `Sticky`: a fixed list that always starts from the first healthy node. Failover, not balance.
//!
//! A request never iterates the pool directly; it asks for a [`NodeView`], which decides
//! lazily which node comes next and writes `Resurrection` / `AllNodesDead` into the audit trail.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::transport::audit::{AuditEvent, AuditTrail};
use crate::transport::node::Node;

/// 🏷️ Which pool to build. Lowercase in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    #[serde(alias = "single_node")]
    Single,
    Static,
    Sniffing,
    Sticky,
}

/// 🔁 Nodes plus a shared cursor, for the pools that round-robin.
#[derive(Debug)]
pub struct NodeRing {
    nodes: Vec<Arc<Node>>,
    cursor: AtomicUsize,
}

impl NodeRing {
    fn new(nodes: Vec<Arc<Node>>) -> Self {
        Self {
            nodes,
            cursor: AtomicUsize::new(0),
        }
    }

    fn next_start(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        self.cursor.fetch_add(1, Ordering::Relaxed) % self.nodes.len()
    }
}

#[derive(Debug)]
pub enum ConnectionPool {
    SingleNode(Arc<Node>),
    Static(NodeRing),
    // -- the ring is swapped wholesale on reseed; in-flight views keep the old one alive
    Sniffing(RwLock<Arc<NodeRing>>),
    Sticky(Vec<Arc<Node>>),
}

impl ConnectionPool {
    /// 🏗️ Build a pool of `kind` over `uris`.
    pub fn new(kind: PoolKind, uris: Vec<Url>) -> Result<Self> {
        if uris.is_empty() {
            return Err(Error::Config(
                "a connection pool needs at least one node".to_string(),
            ));
        }
        let nodes: Vec<Arc<Node>> = uris.into_iter().map(|uri| Arc::new(Node::new(uri))).collect();
        Ok(match kind {
            PoolKind::Single => {
                if nodes.len() > 1 {
                    return Err(Error::Config(format!(
                        "a single node pool got {} nodes; use the static, sniffing or sticky pool",
                        nodes.len()
                    )));
                }
                ConnectionPool::SingleNode(Arc::clone(&nodes[0]))
            }
            PoolKind::Static => ConnectionPool::Static(NodeRing::new(nodes)),
            PoolKind::Sniffing => ConnectionPool::Sniffing(RwLock::new(Arc::new(NodeRing::new(nodes)))),
            PoolKind::Sticky => ConnectionPool::Sticky(nodes),
        })
    }

    pub fn kind(&self) -> PoolKind {
        match self {
            ConnectionPool::SingleNode(_) => PoolKind::Single,
            ConnectionPool::Static(_) => PoolKind::Static,
            ConnectionPool::Sniffing(_) => PoolKind::Sniffing,
            ConnectionPool::Sticky(_) => PoolKind::Sticky,
        }
    }

    /// 📋 A snapshot of every node, dead or alive, in pool order.
    pub fn nodes(&self) -> Vec<Arc<Node>> {
        match self {
            ConnectionPool::SingleNode(node) => vec![Arc::clone(node)],
            ConnectionPool::Static(ring) => ring.nodes.clone(),
            ConnectionPool::Sniffing(ring) => read_ring(ring).nodes.clone(),
            ConnectionPool::Sticky(nodes) => nodes.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ConnectionPool::SingleNode(_) => 1,
            ConnectionPool::Static(ring) => ring.nodes.len(),
            ConnectionPool::Sniffing(ring) => read_ring(ring).nodes.len(),
            ConnectionPool::Sticky(nodes) => nodes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 🔄 How many times a request may move on to another node. One less than there are nodes.
    pub fn max_retries(&self) -> usize {
        match self {
            ConnectionPool::SingleNode(_) => 0,
            _ => self.len().saturating_sub(1),
        }
    }

    pub fn supports_reseeding(&self) -> bool {
        matches!(self, ConnectionPool::Sniffing(_))
    }

    pub fn supports_pinging(&self) -> bool {
        !matches!(self, ConnectionPool::SingleNode(_))
    }

    /// 🌱 Replace the node list with a freshly sniffed one. Only the sniffing pool listens.
    ///
    /// Returns whether the pool actually changed.
    pub fn reseed(&self, nodes: Vec<Node>) -> bool {
        let ConnectionPool::Sniffing(ring) = self else {
            debug!("🌱 reseed ignored, {:?} pool does not reseed", self.kind());
            return false;
        };
        if nodes.is_empty() {
            debug!("🌱 reseed ignored, sniff returned zero usable nodes");
            return false;
        }
        let mut guard = ring.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        // -- a node the cluster lists again keeps its health; only its details are refreshed
        let nodes = nodes
            .into_iter()
            .map(|node| {
                if let Some(known) = guard.nodes.iter().find(|known| known.uri() == node.uri()) {
                    node.inherit_health(known);
                }
                Arc::new(node)
            })
            .collect();
        *guard = Arc::new(NodeRing::new(nodes));
        true
    }

    /// 👀 The ordered candidates for one request.
    pub fn create_view(&self) -> NodeView {
        let (nodes, start, always_yield) = match self {
            ConnectionPool::SingleNode(node) => (vec![Arc::clone(node)], 0, true),
            ConnectionPool::Static(ring) => (ring.nodes.clone(), ring.next_start(), false),
            ConnectionPool::Sniffing(ring) => {
                let ring = read_ring(ring);
                let start = ring.next_start();
                (ring.nodes.clone(), start, false)
            }
            ConnectionPool::Sticky(nodes) => (nodes.clone(), 0, false),
        };
        NodeView {
            nodes,
            start,
            offset: 0,
            yielded: 0,
            always_yield,
        }
    }
}

fn read_ring(ring: &RwLock<Arc<NodeRing>>) -> Arc<NodeRing> {
    Arc::clone(&ring.read().unwrap_or_else(|poisoned| poisoned.into_inner()))
}

/// 👀 A lazy walk over the pool for one request.
///
/// Health is checked when a node is reached, not when the view is created, so a node
/// that dies halfway through the walk is skipped by the next request, not this one.
#[derive(Debug)]
pub struct NodeView {
    nodes: Vec<Arc<Node>>,
    start: usize,
    offset: usize,
    yielded: usize,
    always_yield: bool,
}

impl NodeView {
    /// ⏭️ The next node worth trying, or `None` when the view is spent.
    pub fn next(&mut self, audit: &mut AuditTrail) -> Option<Arc<Node>> {
        let len = self.nodes.len();
        let now = Instant::now();
        while self.offset < len {
            let node = &self.nodes[(self.start + self.offset) % len];
            self.offset += 1;
            if self.always_yield || node.is_alive() {
                self.yielded += 1;
                return Some(Arc::clone(node));
            }
            if node.is_eligible(now) {
                node.resurrect();
                audit.record(AuditEvent::Resurrection, Some(node.uri()), None);
                self.yielded += 1;
                return Some(Arc::clone(node));
            }
        }

        // 💀 everybody is dead. try the one that has been dead the longest, it's our best shot
        if self.yielded == 0 && len > 0 {
            self.yielded += 1;
            audit.record(AuditEvent::AllNodesDead, None, None);
            let node = self
                .nodes
                .iter()
                .min_by_key(|node| node.dead_until())
                .map(Arc::clone)?;
            node.resurrect();
            audit.record(AuditEvent::Resurrection, Some(node.uri()), None);
            return Some(node);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::node::NodeRoles;
    use std::time::Duration;

    fn uris(count: usize) -> Vec<Url> {
        (0..count)
            .map(|i| Url::parse(&format!("http://10.0.0.{}:9200", i + 1)).unwrap())
            .collect()
    }

    fn hosts(pool: &ConnectionPool, audit: &mut AuditTrail) -> Vec<String> {
        let mut view = pool.create_view();
        let mut seen = Vec::new();
        while let Some(node) = view.next(audit) {
            seen.push(node.uri().host_str().unwrap().to_string());
        }
        seen
    }

    fn kill(node: &Node) {
        node.mark_dead(Duration::from_secs(60), Duration::from_secs(1800));
    }

    #[test]
    fn the_one_where_static_pools_take_turns() {
        let pool = ConnectionPool::new(PoolKind::Static, uris(3)).unwrap();
        let mut audit = AuditTrail::default();
        assert_eq!(hosts(&pool, &mut audit), vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
        assert_eq!(hosts(&pool, &mut audit), vec!["10.0.0.2", "10.0.0.3", "10.0.0.1"]);
        assert_eq!(hosts(&pool, &mut audit), vec!["10.0.0.3", "10.0.0.1", "10.0.0.2"]);
        assert_eq!(pool.max_retries(), 2);
        assert!(audit.is_empty());
    }

    #[test]
    fn the_one_where_dead_nodes_are_skipped_and_sticky_stays_put() {
        let pool = ConnectionPool::new(PoolKind::Sticky, uris(3)).unwrap();
        kill(&pool.nodes()[0]);
        let mut audit = AuditTrail::default();
        assert_eq!(hosts(&pool, &mut audit), vec!["10.0.0.2", "10.0.0.3"]);
        assert_eq!(hosts(&pool, &mut audit), vec!["10.0.0.2", "10.0.0.3"]);
    }

    #[test]
    fn the_one_where_everybody_is_dead_and_we_try_anyway() {
        let pool = ConnectionPool::new(PoolKind::Static, uris(2)).unwrap();
        let nodes = pool.nodes();
        kill(&nodes[1]);
        std::thread::sleep(Duration::from_millis(5));
        kill(&nodes[0]);
        kill(&nodes[0]);

        let mut audit = AuditTrail::default();
        let seen = hosts(&pool, &mut audit);
        assert_eq!(seen, vec!["10.0.0.2"], "earliest dead_until wins");
        assert!(audit.contains(AuditEvent::AllNodesDead));
        assert!(nodes[1].is_resurrected());
    }

    #[test]
    fn the_one_where_single_node_never_gives_up_on_its_only_child() {
        let pool = ConnectionPool::new(PoolKind::Single, uris(1)).unwrap();
        kill(&pool.nodes()[0]);
        let mut audit = AuditTrail::default();
        assert_eq!(hosts(&pool, &mut audit), vec!["10.0.0.1"]);
        assert!(audit.is_empty());
        assert_eq!(pool.max_retries(), 0);
        assert!(!pool.supports_pinging());
        assert!(!pool.supports_reseeding());
        assert!(ConnectionPool::new(PoolKind::Single, uris(2)).is_err());
        assert!(ConnectionPool::new(PoolKind::Static, Vec::new()).is_err());
    }

    #[test]
    fn the_one_where_sniffing_pools_get_a_fresh_set_of_nodes() {
        let pool = ConnectionPool::new(PoolKind::Sniffing, uris(1)).unwrap();
        let fresh = uris(3).into_iter().skip(1).map(Node::new).collect();
        assert!(pool.reseed(fresh));
        let mut audit = AuditTrail::default();
        assert_eq!(hosts(&pool, &mut audit), vec!["10.0.0.2", "10.0.0.3"]);
        assert!(!pool.reseed(Vec::new()));

        let fixed = ConnectionPool::new(PoolKind::Static, uris(1)).unwrap();
        assert!(!fixed.reseed(vec![Node::new(uris(1).remove(0))]));
    }

    #[test]
    fn the_one_where_a_reseed_remembers_who_was_sick() {
        let pool = ConnectionPool::new(PoolKind::Sniffing, uris(2)).unwrap();
        let before = pool.nodes();
        before[0].mark_alive();
        kill(&before[1]);

        let mut fresh: Vec<Node> = uris(3).into_iter().map(Node::new).collect();
        fresh[0] = Node::with_details(
            uris(1).remove(0),
            Some("a1".into()),
            Some("data-1".into()),
            NodeRoles::from_names(["data"]),
        );
        assert!(pool.reseed(fresh));

        let after = pool.nodes();
        assert_eq!(after[0].name(), Some("data-1"), "details come from the sniff");
        assert!(after[0].is_alive());
        assert!(!after[0].is_resurrected(), "a trusted node is not pinged again");
        assert!(!after[1].is_alive());
        assert_eq!(after[1].failed_attempts(), 1);
        assert_eq!(after[1].dead_until(), before[1].dead_until());
        assert!(after[2].is_alive() && after[2].is_resurrected(), "newcomers get pinged first");

        let mut audit = AuditTrail::default();
        assert_eq!(hosts(&pool, &mut audit), vec!["10.0.0.1", "10.0.0.3"]);
    }
}

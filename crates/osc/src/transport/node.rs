//! 🖥️ A node: one URL, some roles, and a health chart.
//!
//! Health lives behind a mutex because every in-flight request may mark the same
//! node dead or alive. The lock is never held across an `.await`; it guards a few
//! integers for a few nanoseconds and then goes back to sleep.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use url::Url;

/// 🎭 What a node is willing to do for the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRoles {
    pub cluster_manager_eligible: bool,
    pub data: bool,
    pub ingest: bool,
    pub http_enabled: bool,
}

impl Default for NodeRoles {
    // -- a node we were simply told about is assumed to do everything
    fn default() -> Self {
        Self {
            cluster_manager_eligible: true,
            data: true,
            ingest: true,
            http_enabled: true,
        }
    }
}

impl NodeRoles {
    /// 🧠 Builds roles from the `roles` array the nodes API returns.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut roles = NodeRoles {
            cluster_manager_eligible: false,
            data: false,
            ingest: false,
            http_enabled: true,
        };
        for name in names {
            match name {
                "master" | "cluster_manager" => roles.cluster_manager_eligible = true,
                // -- data_hot, data_warm, data_content... all still hold data
                name if name.starts_with("data") => roles.data = true,
                "ingest" => roles.ingest = true,
                _ => {}
            }
        }
        roles
    }
}

#[derive(Debug, Clone)]
struct Health {
    alive: bool,
    resurrected: bool,
    failed_attempts: u32,
    dead_until: Option<Instant>,
}

/// 🖥️ One member of the connection pool.
#[derive(Debug)]
pub struct Node {
    uri: Url,
    id: Option<String>,
    name: Option<String>,
    roles: NodeRoles,
    health: Mutex<Health>,
}

impl Node {
    /// 🐣 A fresh node starts alive but *resurrected*: the pipeline pings it before trusting it.
    pub fn new(uri: Url) -> Self {
        Self::with_details(uri, None, None, NodeRoles::default())
    }

    pub fn with_details(
        uri: Url,
        id: Option<String>,
        name: Option<String>,
        roles: NodeRoles,
    ) -> Self {
        Self {
            uri,
            id,
            name,
            roles,
            health: Mutex::new(Health {
                alive: true,
                resurrected: true,
                failed_attempts: 0,
                dead_until: None,
            }),
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn roles(&self) -> NodeRoles {
        self.roles
    }

    /// 👑 Eligible to be cluster manager, but holds no data. Sniffing usually skips these.
    pub fn is_cluster_manager_only(&self) -> bool {
        self.roles.cluster_manager_eligible && !self.roles.data
    }

    fn health(&self) -> MutexGuard<'_, Health> {
        // -- a poisoned lock only means another thread panicked mid-update of plain integers
        self.health.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_alive(&self) -> bool {
        self.health().alive
    }

    pub fn is_resurrected(&self) -> bool {
        self.health().resurrected
    }

    pub fn failed_attempts(&self) -> u32 {
        self.health().failed_attempts
    }

    pub fn dead_until(&self) -> Option<Instant> {
        self.health().dead_until
    }

    /// ⏳ Alive, or dead long enough that it deserves another chance.
    pub(crate) fn is_eligible(&self, now: Instant) -> bool {
        let health = self.health();
        health.alive || health.dead_until.is_none_or(|until| until <= now)
    }

    /// 💀 Mark the node dead with exponential back-off on repeated failures.
    ///
    /// `dead_timeout * 2 * 2^(0.5 * previous_failures - 1)`, capped at `max_dead_timeout`.
    /// First failure: `dead_timeout`. Second: ~1.41x. Third: 2x. And so on until the cap.
    pub fn mark_dead(&self, dead_timeout: Duration, max_dead_timeout: Duration) {
        let mut health = self.health();
        let backoff = dead_time(health.failed_attempts, dead_timeout, max_dead_timeout);
        health.failed_attempts += 1;
        health.alive = false;
        health.resurrected = false;
        health.dead_until = Some(Instant::now() + backoff);
    }

    /// ✅ The node answered. All is forgiven.
    pub fn mark_alive(&self) {
        let mut health = self.health();
        health.alive = true;
        health.resurrected = false;
        health.failed_attempts = 0;
        health.dead_until = None;
    }

    /// 🩺 Take over another node's health chart, e.g. the same URI from before a reseed.
    pub(crate) fn inherit_health(&self, from: &Node) {
        let chart = from.health().clone();
        *self.health() = chart;
    }

    /// 🧟 Give a dead node another chance; the pipeline will ping it first.
    pub(crate) fn resurrect(&self) {
        self.health().resurrected = true;
    }
}

/// 🔢 How long a node stays dead when it fails again after `previous_failures` failures in a row.
pub fn dead_time(previous_failures: u32, dead_timeout: Duration, max_dead_timeout: Duration) -> Duration {
    let exponent = f64::from(previous_failures) * 0.5 - 1.0;
    let millis = dead_timeout.as_millis() as f64 * 2.0 * 2f64.powf(exponent);
    let capped = millis.min(max_dead_timeout.as_millis() as f64);
    Duration::from_millis(capped.max(0.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> Node {
        Node::new(Url::parse("http://localhost:9200").unwrap())
    }

    #[test]
    fn the_one_where_a_new_node_is_alive_but_needs_a_ping() {
        let node = node();
        assert!(node.is_alive());
        assert!(node.is_resurrected());
        assert_eq!(node.failed_attempts(), 0);
        assert!(node.is_eligible(Instant::now()));
    }

    #[test]
    fn the_one_where_back_off_grows_and_then_hits_the_ceiling() {
        let minute = Duration::from_secs(60);
        let cap = Duration::from_secs(30 * 60);
        assert_eq!(dead_time(0, minute, cap), Duration::from_secs(60));
        assert_eq!(dead_time(1, minute, cap).as_millis(), 84_852);
        assert_eq!(dead_time(2, minute, cap), Duration::from_secs(120));
        assert_eq!(dead_time(4, minute, cap), Duration::from_secs(240));
        assert_eq!(dead_time(40, minute, cap), cap);
    }

    #[test]
    fn the_one_where_dead_nodes_sit_out_until_their_time_comes() {
        let node = node();
        node.mark_dead(Duration::from_secs(60), Duration::from_secs(1800));
        assert!(!node.is_alive());
        assert!(!node.is_resurrected());
        assert_eq!(node.failed_attempts(), 1);
        assert!(!node.is_eligible(Instant::now()));
        assert!(node.is_eligible(Instant::now() + Duration::from_secs(61)));

        node.mark_dead(Duration::from_secs(60), Duration::from_secs(1800));
        assert_eq!(node.failed_attempts(), 2);
        // -- second strike: ~84.85s, so a minute later it's still benched
        assert!(!node.is_eligible(Instant::now() + Duration::from_secs(61)));
        assert!(node.is_eligible(Instant::now() + Duration::from_secs(86)));

        node.mark_alive();
        assert!(node.is_alive());
        assert_eq!(node.failed_attempts(), 0);
        assert_eq!(node.dead_until(), None);
    }

    #[test]
    fn the_one_where_roles_come_from_names() {
        let manager_only = NodeRoles::from_names(["cluster_manager", "remote_cluster_client"]);
        assert!(manager_only.cluster_manager_eligible);
        assert!(!manager_only.data);

        let worker = NodeRoles::from_names(["data_hot", "ingest"]);
        assert!(worker.data && worker.ingest);
        assert!(!worker.cluster_manager_eligible);

        let node = Node::with_details(
            Url::parse("http://10.0.0.2:9200").unwrap(),
            Some("abc".into()),
            Some("manager-1".into()),
            manager_only,
        );
        assert!(node.is_cluster_manager_only());
        assert_eq!(node.name(), Some("manager-1"));
    }
}

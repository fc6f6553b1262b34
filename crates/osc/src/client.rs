//! 🔎 The [`Client`]: one cheap-to-clone handle on a shared [`Transport`].
//!
//! Root operations (`info`, `search`, `bulk`...) are methods right on the client; everything
//! else hangs off a namespace accessor like `client.indices()` or `client.snapshot()`.

use std::sync::Arc;

use tracing::info;

use crate::api::cat::Cat;
use crate::api::cluster::Cluster;
use crate::api::indices::Indices;
use crate::api::ingest::Ingest;
use crate::api::ml::Ml;
use crate::api::nodes::Nodes;
use crate::api::notifications::Notifications;
use crate::api::observability::Observability;
use crate::api::sm::Sm;
use crate::api::snapshot::Snapshot;
use crate::client_config::ClientConfig;
use crate::error::Result;
use crate::transport::{ConnectionBackend, ConnectionPool, InMemoryConnection, PoolKind, Transport};

#[derive(Debug, Clone)]
pub struct Client {
    transport: Arc<Transport>,
}

impl Client {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// 🏗️ Real HTTP, pool and settings from the config.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let transport = Transport::from_config(config)?;
        info!(
            nodes = transport.pool().len(),
            kind = ?config.pool_kind(),
            "🔎 client ready"
        );
        Ok(Self::new(transport))
    }

    /// 🏠 One node, default settings. The `localhost:9200` special.
    pub fn single_node(url: &str) -> Result<Self> {
        Self::from_config(&ClientConfig::for_nodes([url]))
    }

    /// 🎭 A client whose only node is a scripted [`InMemoryConnection`]. Nothing leaves the process.
    pub fn in_memory(url: &str, connection: Arc<InMemoryConnection>) -> Result<Self> {
        let config = ClientConfig::for_nodes([url]);
        let pool = ConnectionPool::new(PoolKind::Single, config.node_urls()?)?;
        let transport = Transport::new(
            pool,
            ConnectionBackend::InMemory(connection),
            config.transport_settings()?,
        );
        Ok(Self::new(transport))
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn cat(&self) -> Cat<'_> {
        Cat::new(&self.transport)
    }

    pub fn cluster(&self) -> Cluster<'_> {
        Cluster::new(&self.transport)
    }

    pub fn indices(&self) -> Indices<'_> {
        Indices::new(&self.transport)
    }

    pub fn ingest(&self) -> Ingest<'_> {
        Ingest::new(&self.transport)
    }

    pub fn ml(&self) -> Ml<'_> {
        Ml::new(&self.transport)
    }

    pub fn nodes(&self) -> Nodes<'_> {
        Nodes::new(&self.transport)
    }

    pub fn notifications(&self) -> Notifications<'_> {
        Notifications::new(&self.transport)
    }

    pub fn observability(&self) -> Observability<'_> {
        Observability::new(&self.transport)
    }

    /// ⏰ Snapshot Management policies. Not to be confused with [`Client::snapshot`].
    pub fn sm(&self) -> Sm<'_> {
        Sm::new(&self.transport)
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot::new(&self.transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::root::InfoRequest;

    #[tokio::test]
    async fn the_one_where_clones_share_one_transport() {
        let fake = Arc::new(InMemoryConnection::new());
        fake.respond(
            "http://localhost:9200",
            200,
            r#"{"name":"node-1","cluster_name":"docker-cluster","cluster_uuid":"u","version":{"distribution":"opensearch","number":"2.11.0"},"tagline":"The OpenSearch Project: https://opensearch.org/"}"#,
        );
        let client = Client::in_memory("http://localhost:9200", Arc::clone(&fake)).unwrap();
        let twin = client.clone();

        let info = twin.info(InfoRequest::new()).await.unwrap();
        assert_eq!(info.cluster_name, "docker-cluster");
        assert!(std::ptr::eq(client.transport(), twin.transport()));
        assert_eq!(fake.calls().len(), 1);
    }

    #[test]
    fn the_one_where_a_bad_url_never_becomes_a_client() {
        let fake = Arc::new(InMemoryConnection::new());
        assert!(Client::in_memory("definitely not a url", fake).is_err());
    }
}

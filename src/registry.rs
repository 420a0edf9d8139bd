//! Server Registry
//!
//! Upserts cluster server records whenever a cluster is seen as the
//! source or target of a transfer.

use std::sync::Arc;

use crate::error::Result;
use crate::model::{ClusterServer, ServerMarker};
use crate::store::ServerStore;

#[derive(Clone)]
pub struct ServerRegistry {
    store: Arc<dyn ServerStore>,
}

impl ServerRegistry {
    pub fn new(store: Arc<dyn ServerStore>) -> Self {
        Self { store }
    }

    /// Create or touch the record for `name`
    pub fn upsert(&self, name: &str) -> Result<ClusterServer> {
        let server = self.store.save(ClusterServer::new(name))?;
        tracing::debug!("Upserted server {}", server.name);
        Ok(server)
    }

    /// Create or touch the record for `name`, overwriting only the marker
    /// it keeps for `partner`
    pub fn upsert_with_marker(&self, name: &str, partner: &str, marker: ServerMarker) -> Result<ClusterServer> {
        tracing::debug!(
            "Upserting server {} with marker for {}: entity={} last_modified={}",
            name,
            partner,
            marker.entity_id,
            marker.last_modified
        );
        self.store.save(ClusterServer::new(name).with_marker(partner, marker))
    }

    pub fn get(&self, name: &str) -> Result<Option<ClusterServer>> {
        self.store.get(name)
    }

    pub fn list(&self) -> Result<Vec<ClusterServer>> {
        self.store.list()
    }
}

//! Cluster Server Records

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Replication pointer kept on a server record for one partner cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerMarker {
    /// Last entity processed in a replicated transfer
    pub entity_id: String,
    /// Last-modified timestamp (ms since epoch) of the data transferred
    pub last_modified: i64,
}

impl ServerMarker {
    pub fn new(entity_id: impl Into<String>, last_modified: i64) -> Self {
        Self {
            entity_id: entity_id.into(),
            last_modified,
        }
    }
}

/// Value of a `replicated-to` / `replicated-from` entity attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationStamp {
    /// Partner cluster the entity was replicated to or from
    pub cluster: String,
    /// Last-modified timestamp (ms since epoch) of the transfer
    pub timestamp: i64,
}

/// A known remote (or local) cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterServer {
    /// Unique cluster name
    pub name: String,
    /// Display name
    pub full_name: String,
    /// Replication markers keyed by partner cluster name
    pub markers: BTreeMap<String, ServerMarker>,
    /// When the record was first observed
    pub created_at: DateTime<Utc>,
    /// When the record was last upserted
    pub updated_at: DateTime<Utc>,
}

impl ClusterServer {
    /// Create a server record whose display name equals its name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            full_name: name.clone(),
            name,
            markers: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Attach the marker describing this server's relationship with `partner`
    pub fn with_marker(mut self, partner: impl Into<String>, marker: ServerMarker) -> Self {
        self.markers.insert(partner.into(), marker);
        self
    }

    /// Marker recorded for `partner`, if any
    pub fn marker(&self, partner: &str) -> Option<&ServerMarker> {
        self.markers.get(partner)
    }

    /// Merge an incoming upsert into the stored record.
    ///
    /// Only the markers carried by `incoming` are overwritten; all other
    /// entries survive. Creation time is kept from the stored record.
    pub fn merge(&mut self, incoming: ClusterServer) {
        self.full_name = incoming.full_name;
        self.markers.extend(incoming.markers);
        self.updated_at = incoming.updated_at;
    }
}

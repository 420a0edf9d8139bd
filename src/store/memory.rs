//! In-Memory Store

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{AuditStore, EntityAttributeStore, ServerStore};
use crate::error::Result;
use crate::model::{AuditEntry, AuditQuery, ClusterServer, ReplicationStamp};

/// Non-durable store for embedding and tests
#[derive(Default)]
pub struct MemoryStore {
    servers: RwLock<HashMap<String, ClusterServer>>,
    audits: RwLock<Vec<AuditEntry>>,
    /// (entity id, attribute) -> stamp
    attributes: RwLock<HashMap<(String, String), ReplicationStamp>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ServerStore for MemoryStore {
    fn save(&self, server: ClusterServer) -> Result<ClusterServer> {
        let mut servers = self.servers.write();
        let stored = match servers.get_mut(&server.name) {
            Some(existing) => {
                existing.merge(server);
                existing.clone()
            }
            None => {
                servers.insert(server.name.clone(), server.clone());
                server
            }
        };
        Ok(stored)
    }

    fn get(&self, name: &str) -> Result<Option<ClusterServer>> {
        Ok(self.servers.read().get(name).cloned())
    }

    fn list(&self) -> Result<Vec<ClusterServer>> {
        let mut servers: Vec<_> = self.servers.read().values().cloned().collect();
        servers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(servers)
    }
}

impl AuditStore for MemoryStore {
    fn append(&self, entry: AuditEntry) -> Result<()> {
        self.audits.write().push(entry);
        Ok(())
    }

    fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
        let audits = self.audits.read();
        let mut matched: Vec<(usize, &AuditEntry)> = audits
            .iter()
            .enumerate()
            .filter(|(_, e)| query.matches(e))
            .collect();

        // Newest start first, later appends first on ties
        matched.sort_by(|(ia, a), (ib, b)| b.start_time.cmp(&a.start_time).then(ib.cmp(ia)));

        Ok(matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|(_, e)| e.clone())
            .collect())
    }

    fn count(&self) -> Result<u64> {
        Ok(self.audits.read().len() as u64)
    }
}

impl EntityAttributeStore for MemoryStore {
    fn set_attribute(&self, entity_ids: &[String], attribute: &str, stamp: &ReplicationStamp) -> Result<()> {
        let mut attributes = self.attributes.write();
        for id in entity_ids {
            attributes.insert((id.clone(), attribute.to_string()), stamp.clone());
        }
        Ok(())
    }

    fn attribute(&self, entity_id: &str, attribute: &str) -> Result<Option<ReplicationStamp>> {
        Ok(self
            .attributes
            .read()
            .get(&(entity_id.to_string(), attribute.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OperationKind, ServerMarker};

    #[test]
    fn test_server_upsert_merges() {
        let store = MemoryStore::new();
        store.save(ClusterServer::new("cluster-b").with_marker("cluster-a", ServerMarker::new("e1", 1))).unwrap();
        store.save(ClusterServer::new("cluster-b").with_marker("cluster-c", ServerMarker::new("e2", 2))).unwrap();
        let stored = store.save(ClusterServer::new("cluster-b")).unwrap();

        assert_eq!(stored.markers.len(), 2);
        assert_eq!(store.list().unwrap().len(), 1);
        assert!(store.get("cluster-x").unwrap().is_none());
    }

    #[test]
    fn test_audit_query_order_and_paging() {
        let store = MemoryStore::new();
        for (i, start) in [30, 10, 20, 20].iter().enumerate() {
            let entry = AuditEntry::new(format!("u{}", i), "a", "b", OperationKind::Export, "{}", *start, start + 1, true);
            store.append(entry).unwrap();
        }

        let all = store.query(&AuditQuery::new()).unwrap();
        let users: Vec<_> = all.iter().map(|e| e.user_name.as_str()).collect();
        assert_eq!(users, vec!["u0", "u3", "u2", "u1"]);

        let page = store.query(&AuditQuery::new().page(1, 2)).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].user_name, "u3");
        assert_eq!(store.count().unwrap(), 4);
    }

    #[test]
    fn test_attribute_overwrite() {
        let store = MemoryStore::new();
        let ids = vec!["e1".to_string()];
        store.set_attribute(&ids, "replicated-to", &ReplicationStamp { cluster: "b".into(), timestamp: 1 }).unwrap();
        store.set_attribute(&ids, "replicated-to", &ReplicationStamp { cluster: "c".into(), timestamp: 2 }).unwrap();

        let stamp = store.attribute("e1", "replicated-to").unwrap().unwrap();
        assert_eq!(stamp.cluster, "c");
        assert!(store.attribute("e1", "replicated-from").unwrap().is_none());
    }
}

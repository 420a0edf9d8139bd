//! Replication Marker
//!
//! Tags transferred entities with the partner cluster so a later
//! incremental transfer can tell what is already in sync.

use std::sync::Arc;

use crate::error::Result;
use crate::model::ReplicationStamp;
use crate::store::EntityAttributeStore;

#[derive(Clone)]
pub struct ReplicationMarker {
    store: Arc<dyn EntityAttributeStore>,
}

impl ReplicationMarker {
    pub fn new(store: Arc<dyn EntityAttributeStore>) -> Self {
        Self { store }
    }

    /// Set `attribute` on every entity in `entity_ids`.
    ///
    /// An empty list never reaches the store.
    pub fn apply(&self, attribute: &str, cluster: &str, timestamp: i64, entity_ids: &[String]) -> Result<()> {
        if entity_ids.is_empty() {
            return Ok(());
        }

        let stamp = ReplicationStamp {
            cluster: cluster.to_string(),
            timestamp,
        };
        self.store.set_attribute(entity_ids, attribute, &stamp)?;
        tracing::debug!("Set {}={} on {} entities", attribute, cluster, entity_ids.len());
        Ok(())
    }

    pub fn get(&self, entity_id: &str, attribute: &str) -> Result<Option<ReplicationStamp>> {
        self.store.attribute(entity_id, attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::MemoryStore;

    /// Attribute store that fails every call
    struct Unreachable;

    impl EntityAttributeStore for Unreachable {
        fn set_attribute(&self, _: &[String], _: &str, _: &ReplicationStamp) -> Result<()> {
            Err(Error::Store("attribute store called".into()))
        }

        fn attribute(&self, _: &str, _: &str) -> Result<Option<ReplicationStamp>> {
            Err(Error::Store("attribute store called".into()))
        }
    }

    #[test]
    fn test_empty_list_skips_store() {
        let marker = ReplicationMarker::new(Arc::new(Unreachable));
        assert!(marker.apply("replicated-to", "cluster-b", 1, &[]).is_ok());
        assert!(marker.apply("replicated-to", "cluster-b", 1, &["e1".into()]).is_err());
    }

    #[test]
    fn test_apply_tags_every_entity() {
        let marker = ReplicationMarker::new(Arc::new(MemoryStore::new()));
        let ids: Vec<String> = vec!["e1".into(), "e2".into(), "e3".into()];
        marker.apply("replicated-from", "cluster-c", 77, &ids).unwrap();

        for id in &ids {
            let stamp = marker.get(id, "replicated-from").unwrap().unwrap();
            assert_eq!(stamp.cluster, "cluster-c");
            assert_eq!(stamp.timestamp, 77);
        }
    }
}

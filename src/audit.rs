//! Audit Log
//!
//! Append-only trail with one entry per transfer. There is no update or
//! delete; identical calls produce identical, separate entries.

use std::sync::Arc;

use crate::error::Result;
use crate::model::{AuditEntry, AuditQuery, OperationKind};
use crate::store::AuditStore;

#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn AuditStore>,
}

impl AuditLog {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Append one entry and return it
    #[allow(clippy::too_many_arguments)]
    pub fn append(
        &self,
        user_name: &str,
        source_cluster: &str,
        target_cluster: &str,
        operation: OperationKind,
        result_payload: String,
        start_time: i64,
        end_time: i64,
        has_entities: bool,
    ) -> Result<AuditEntry> {
        let entry = AuditEntry::new(
            user_name,
            source_cluster,
            target_cluster,
            operation,
            result_payload,
            start_time,
            end_time,
            has_entities,
        );
        self.store.append(entry.clone())?;
        tracing::debug!(
            "Audit {} appended: {} {} -> {}",
            entry.guid,
            operation,
            source_cluster,
            target_cluster
        );
        Ok(entry)
    }

    pub fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
        self.store.query(query)
    }

    pub fn count(&self) -> Result<u64> {
        self.store.count()
    }
}

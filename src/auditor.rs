//! Transfer Auditor
//!
//! Records a finished export or import: upserts the clusters involved,
//! appends the audit entry and, for successful replicated transfers,
//! stamps the transferred entities and the partner's server record.
//!
//! Export and import run through the same code path, parametrized by a
//! [`Direction`]. Every call is synchronous; store errors abort the
//! remaining steps and are returned unchanged.

use std::sync::Arc;

use crate::audit::AuditLog;
use crate::config::{AuditConfig, ClusterNameSource};
use crate::error::Result;
use crate::marker::ReplicationMarker;
use crate::model::{
    AuditEntry, ExportResult, ImportResult, OperationKind, OperationStatus, ServerMarker, TransferOutcome,
    ATTR_REPLICATED_FROM, ATTR_REPLICATED_TO, OPTION_REPLICATED_FROM, OPTION_REPLICATED_TO,
};
use crate::registry::ServerRegistry;
use crate::store::{AuditStore, EntityAttributeStore, ServerStore, SqliteStore};

/// Local cluster name used when none is configured
pub const DEFAULT_CLUSTER_NAME: &str = "default";

/// Which side of the transfer the remote cluster is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoteRole {
    Target,
    Source,
}

/// Everything that differs between recording an export and an import
#[derive(Debug, Clone, Copy)]
struct Direction {
    operation: OperationKind,
    intent_key: &'static str,
    marker_attribute: &'static str,
    remote_role: RemoteRole,
}

const EXPORT: Direction = Direction {
    operation: OperationKind::Export,
    intent_key: OPTION_REPLICATED_TO,
    marker_attribute: ATTR_REPLICATED_TO,
    remote_role: RemoteRole::Target,
};

const IMPORT: Direction = Direction {
    operation: OperationKind::Import,
    intent_key: OPTION_REPLICATED_FROM,
    marker_attribute: ATTR_REPLICATED_FROM,
    remote_role: RemoteRole::Source,
};

impl Direction {
    /// (source, target) cluster names for the audit entry
    fn endpoints<'a>(&self, local: &'a str, remote: &'a str) -> (&'a str, &'a str) {
        match self.remote_role {
            RemoteRole::Target => (local, remote),
            RemoteRole::Source => (remote, local),
        }
    }
}

/// Coordinates the server registry, audit log and replication marker
#[derive(Clone)]
pub struct TransferAuditor {
    cluster_name: Arc<dyn ClusterNameSource>,
    registry: ServerRegistry,
    audit_log: AuditLog,
    marker: ReplicationMarker,
}

impl TransferAuditor {
    pub fn new(
        cluster_name: Arc<dyn ClusterNameSource>,
        registry: ServerRegistry,
        audit_log: AuditLog,
        marker: ReplicationMarker,
    ) -> Self {
        Self {
            cluster_name,
            registry,
            audit_log,
            marker,
        }
    }

    /// Build an auditor whose three stores are the same backend
    pub fn with_store<S>(cluster_name: Arc<dyn ClusterNameSource>, store: Arc<S>) -> Self
    where
        S: ServerStore + AuditStore + EntityAttributeStore + 'static,
    {
        Self::new(
            cluster_name,
            ServerRegistry::new(store.clone()),
            AuditLog::new(store.clone()),
            ReplicationMarker::new(store),
        )
    }

    /// Open the SQLite store named by `config` and audit against it
    pub fn open(config: &AuditConfig) -> Result<Self> {
        let path = config.database_path();
        let store = Arc::new(SqliteStore::open(&path)?);
        tracing::info!("Transfer audit store opened at {:?}", path);
        Ok(Self::with_store(Arc::new(config.clone()), store))
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit_log
    }

    pub fn marker(&self) -> &ReplicationMarker {
        &self.marker
    }

    /// Record a finished export. `entity_ids` is in creation order.
    pub fn record_export(
        &self,
        user_name: &str,
        result: &ExportResult,
        start_time: i64,
        end_time: i64,
        entity_ids: &[String],
    ) -> Result<AuditEntry> {
        self.record(&EXPORT, user_name, result, start_time, end_time, entity_ids)
    }

    /// Record a finished import. `entity_ids` is in creation order.
    pub fn record_import(
        &self,
        user_name: &str,
        result: &ImportResult,
        start_time: i64,
        end_time: i64,
        entity_ids: &[String],
    ) -> Result<AuditEntry> {
        self.record(&IMPORT, user_name, result, start_time, end_time, entity_ids)
    }

    /// Name of the local cluster; never fails.
    pub fn local_cluster_name(&self) -> String {
        match self.cluster_name.cluster_name() {
            Ok(Some(name)) => name,
            Ok(None) => DEFAULT_CLUSTER_NAME.to_string(),
            Err(e) => {
                tracing::error!("Failed to look up local cluster name: {}", e);
                String::new()
            }
        }
    }

    fn record<R: TransferOutcome>(
        &self,
        direction: &Direction,
        user_name: &str,
        result: &R,
        start_time: i64,
        end_time: i64,
        entity_ids: &[String],
    ) -> Result<AuditEntry> {
        let options = result.options();
        let replicated = options.contains(direction.intent_key);

        let local = self.local_cluster_name();
        self.registry.upsert(&local)?;

        let remote = if replicated {
            options.cluster_name(direction.intent_key)
        } else {
            String::new()
        };
        if !remote.is_empty() {
            self.registry.upsert(&remote)?;
        }

        let (source, target) = direction.endpoints(&local, &remote);
        let entry = self.audit_log.append(
            user_name,
            source,
            target,
            direction.operation,
            result.to_payload()?,
            start_time,
            end_time,
            !entity_ids.is_empty(),
        )?;

        tracing::info!(
            "Recorded {} {} -> {} ({}, {} entities)",
            direction.operation,
            source,
            target,
            result.status(),
            entity_ids.len()
        );

        if result.status() == OperationStatus::Fail {
            return Ok(entry);
        }

        if remote.is_empty() || entity_ids.is_empty() {
            return Ok(entry);
        }

        let timestamp = result.replication_timestamp();
        self.registry
            .upsert_with_marker(&remote, &local, ServerMarker::new(entity_ids[0].as_str(), timestamp))?;
        self.marker
            .apply(direction.marker_attribute, &remote, timestamp, entity_ids)?;

        Ok(entry)
    }
}

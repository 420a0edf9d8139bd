//! Transfer Audit - Export/Import Audit Trail for Replicating Clusters
//!
//! Every bulk export or import between two cooperating clusters leaves
//! behind three kinds of state:
//!
//! - an immutable audit entry describing the transfer
//! - a server record for each cluster involved, carrying replication
//!   markers (last entity id + timestamp) per partner cluster
//! - a `replicated-to` / `replicated-from` attribute on every transferred
//!   entity, so the next incremental transfer knows what is already synced
//!
//! # Architecture
//!
//! [`TransferAuditor`] coordinates three leaf components, each over an
//! injected store:
//!
//! - [`ServerRegistry`] over [`store::ServerStore`]
//! - [`AuditLog`] over [`store::AuditStore`]
//! - [`ReplicationMarker`] over [`store::EntityAttributeStore`]
//!
//! [`store::MemoryStore`] and [`store::SqliteStore`] implement all three.

pub mod audit;
pub mod auditor;
pub mod config;
pub mod error;
pub mod logging;
pub mod marker;
pub mod model;
pub mod registry;
pub mod store;

pub use audit::AuditLog;
pub use auditor::{TransferAuditor, DEFAULT_CLUSTER_NAME};
pub use config::AuditConfig;
pub use error::{Error, Result};
pub use marker::ReplicationMarker;
pub use registry::ServerRegistry;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::auditor::TransferAuditor;
    pub use crate::config::{AuditConfig, ClusterNameSource};
    pub use crate::error::{Error, Result};
    pub use crate::model::{
        AuditEntry, AuditQuery, ClusterServer, ExportRequest, ExportResult, ImportRequest, ImportResult,
        OperationKind, OperationStatus, TransferOptions,
    };
    pub use crate::store::{MemoryStore, SqliteStore};
}

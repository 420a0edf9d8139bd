//! Data Model
//!
//! Records exchanged between the auditor and its stores.

mod audit;
mod server;
mod transfer;

pub use audit::{AuditEntry, AuditQuery, OperationKind};
pub use server::{ClusterServer, ReplicationStamp, ServerMarker};
pub use transfer::{
    ExportRequest, ExportResult, ImportRequest, ImportResult, OperationStatus, TransferOptions,
    TransferOutcome, OPTION_REPLICATED_FROM, OPTION_REPLICATED_TO,
};

/// Entity attribute set on entities exported to a replication partner
pub const ATTR_REPLICATED_TO: &str = "replicated-to";

/// Entity attribute set on entities imported from a replication partner
pub const ATTR_REPLICATED_FROM: &str = "replicated-from";

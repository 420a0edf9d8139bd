//! Storage Module
//!
//! The auditor never touches storage directly; it goes through these three
//! traits so the host system can plug in its own backends. Two
//! implementations ship with the crate: [`MemoryStore`] and [`SqliteStore`].

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::model::{AuditEntry, AuditQuery, ClusterServer, ReplicationStamp};

/// Persistent registry of cluster server records
pub trait ServerStore: Send + Sync {
    /// Upsert a server record and return the stored result.
    ///
    /// Must be atomic per record: an existing record is merged with
    /// [`ClusterServer::merge`] semantics, never replaced wholesale.
    fn save(&self, server: ClusterServer) -> Result<ClusterServer>;

    fn get(&self, name: &str) -> Result<Option<ClusterServer>>;

    fn list(&self) -> Result<Vec<ClusterServer>>;
}

/// Append-only audit trail
pub trait AuditStore: Send + Sync {
    fn append(&self, entry: AuditEntry) -> Result<()>;

    /// Entries passing `query`, newest start time first
    fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>>;

    fn count(&self) -> Result<u64>;
}

/// Bulk attribute writes on replicated entities
pub trait EntityAttributeStore: Send + Sync {
    fn set_attribute(&self, entity_ids: &[String], attribute: &str, stamp: &ReplicationStamp) -> Result<()>;

    fn attribute(&self, entity_id: &str, attribute: &str) -> Result<Option<ReplicationStamp>>;
}

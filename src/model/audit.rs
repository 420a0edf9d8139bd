//! Audit Entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    Export,
    Import,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Export => "EXPORT",
            OperationKind::Import => "IMPORT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "EXPORT" => Some(OperationKind::Export),
            "IMPORT" => Some(OperationKind::Import),
            _ => None,
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable record of one transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub guid: Uuid,
    pub user_name: String,
    pub source_cluster: String,
    pub target_cluster: String,
    pub operation: OperationKind,
    /// Serialized transfer result, stored verbatim
    pub result_payload: String,
    /// Transfer start (ms since epoch)
    pub start_time: i64,
    /// Transfer end (ms since epoch)
    pub end_time: i64,
    pub has_entities: bool,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_name: impl Into<String>,
        source_cluster: impl Into<String>,
        target_cluster: impl Into<String>,
        operation: OperationKind,
        result_payload: impl Into<String>,
        start_time: i64,
        end_time: i64,
        has_entities: bool,
    ) -> Self {
        Self {
            guid: Uuid::new_v4(),
            user_name: user_name.into(),
            source_cluster: source_cluster.into(),
            target_cluster: target_cluster.into(),
            operation,
            result_payload: result_payload.into(),
            start_time,
            end_time,
            has_entities,
            recorded_at: Utc::now(),
        }
    }
}

/// Filter for reading back audit entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQuery {
    pub user_name: Option<String>,
    /// Matches either the source or the target cluster
    pub cluster: Option<String>,
    pub operation: Option<OperationKind>,
    /// Only entries that started at or after this time
    pub start_after: Option<i64>,
    /// Only entries that ended at or before this time
    pub end_before: Option<i64>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    pub fn cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    pub fn operation(mut self, operation: OperationKind) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn between(mut self, start_after: i64, end_before: i64) -> Self {
        self.start_after = Some(start_after);
        self.end_before = Some(end_before);
        self
    }

    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    /// Whether `entry` passes every filter (paging is not applied here)
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(user) = &self.user_name {
            if &entry.user_name != user {
                return false;
            }
        }
        if let Some(cluster) = &self.cluster {
            if &entry.source_cluster != cluster && &entry.target_cluster != cluster {
                return false;
            }
        }
        if let Some(op) = self.operation {
            if entry.operation != op {
                return false;
            }
        }
        if let Some(start) = self.start_after {
            if entry.start_time < start {
                return false;
            }
        }
        if let Some(end) = self.end_before {
            if entry.end_time > end {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user: &str, source: &str, target: &str, op: OperationKind, start: i64, end: i64) -> AuditEntry {
        AuditEntry::new(user, source, target, op, "{}", start, end, true)
    }

    #[test]
    fn test_operation_kind_names() {
        assert_eq!(OperationKind::Export.to_string(), "EXPORT");
        assert_eq!(OperationKind::parse("IMPORT"), Some(OperationKind::Import));
        assert_eq!(OperationKind::parse("import"), None);
    }

    #[test]
    fn test_query_matches() {
        let e = entry("admin", "cluster-a", "cluster-b", OperationKind::Export, 10, 20);

        assert!(AuditQuery::new().matches(&e));
        assert!(AuditQuery::new().cluster("cluster-b").matches(&e));
        assert!(AuditQuery::new().cluster("cluster-a").matches(&e));
        assert!(!AuditQuery::new().cluster("cluster-c").matches(&e));
        assert!(!AuditQuery::new().user("bob").matches(&e));
        assert!(!AuditQuery::new().operation(OperationKind::Import).matches(&e));
        assert!(AuditQuery::new().between(10, 20).matches(&e));
        assert!(!AuditQuery::new().between(11, 20).matches(&e));
        assert!(!AuditQuery::new().between(0, 19).matches(&e));
    }

    #[test]
    fn test_entries_get_distinct_guids() {
        let a = entry("admin", "a", "b", OperationKind::Export, 1, 2);
        let b = entry("admin", "a", "b", OperationKind::Export, 1, 2);
        assert_ne!(a.guid, b.guid);
    }
}

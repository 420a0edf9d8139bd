//! SQLite Store
//!
//! Durable single-file implementation of all three store traits.

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use uuid::Uuid;

use super::{AuditStore, EntityAttributeStore, ServerStore};
use crate::error::{Error, Result};
use crate::model::{AuditEntry, AuditQuery, ClusterServer, OperationKind, ReplicationStamp, ServerMarker};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS servers (
    name TEXT PRIMARY KEY,
    full_name TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS server_markers (
    server_name TEXT NOT NULL,
    partner_name TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    last_modified INTEGER NOT NULL,
    PRIMARY KEY (server_name, partner_name)
);

CREATE TABLE IF NOT EXISTS audit_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    guid TEXT NOT NULL,
    user_name TEXT NOT NULL,
    source_cluster TEXT NOT NULL,
    target_cluster TEXT NOT NULL,
    operation TEXT NOT NULL,
    result_payload TEXT NOT NULL,
    start_time INTEGER NOT NULL,
    end_time INTEGER NOT NULL,
    has_entities INTEGER NOT NULL,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_audit_entries_start
    ON audit_entries(start_time);

CREATE TABLE IF NOT EXISTS entity_attributes (
    entity_id TEXT NOT NULL,
    attribute TEXT NOT NULL,
    cluster_name TEXT NOT NULL,
    last_modified INTEGER NOT NULL,
    updated_at TEXT DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (entity_id, attribute)
);
"#;

/// Store backed by a single SQLite database
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create or open the audit database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Store(format!("Bad timestamp '{}': {}", raw, e)))
}

fn load_server(conn: &Connection, name: &str) -> Result<Option<ClusterServer>> {
    let row: Option<(String, String, String)> = conn
        .query_row(
            "SELECT full_name, created_at, updated_at FROM servers WHERE name = ?1",
            params![name],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    let Some((full_name, created_at, updated_at)) = row else {
        return Ok(None);
    };

    let mut server = ClusterServer::new(name);
    server.full_name = full_name;
    server.created_at = parse_time(&created_at)?;
    server.updated_at = parse_time(&updated_at)?;

    let mut stmt = conn.prepare(
        "SELECT partner_name, entity_id, last_modified FROM server_markers WHERE server_name = ?1",
    )?;
    let rows = stmt.query_map(params![name], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, i64>(2)?))
    })?;
    for result in rows {
        let (partner, entity_id, last_modified) = result?;
        server.markers.insert(partner, ServerMarker::new(entity_id, last_modified));
    }

    Ok(Some(server))
}

impl ServerStore for SqliteStore {
    fn save(&self, server: ClusterServer) -> Result<ClusterServer> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO servers (name, full_name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(name) DO UPDATE SET full_name = ?2, updated_at = ?4
            "#,
            params![
                server.name,
                server.full_name,
                server.created_at.to_rfc3339(),
                server.updated_at.to_rfc3339()
            ],
        )?;

        for (partner, marker) in &server.markers {
            tx.execute(
                r#"
                INSERT INTO server_markers (server_name, partner_name, entity_id, last_modified)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(server_name, partner_name) DO UPDATE SET
                    entity_id = ?3,
                    last_modified = ?4
                "#,
                params![server.name, partner, marker.entity_id, marker.last_modified],
            )?;
        }

        let stored = load_server(&tx, &server.name)?
            .ok_or_else(|| Error::Internal(format!("Server {} vanished during upsert", server.name)))?;
        tx.commit()?;
        Ok(stored)
    }

    fn get(&self, name: &str) -> Result<Option<ClusterServer>> {
        let conn = self.conn.lock();
        load_server(&conn, name)
    }

    fn list(&self) -> Result<Vec<ClusterServer>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT name FROM servers ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut servers = Vec::with_capacity(names.len());
        for name in names {
            if let Some(server) = load_server(&conn, &name)? {
                servers.push(server);
            }
        }
        Ok(servers)
    }
}

/// Audit row as read from SQLite, before parsing typed columns
struct AuditRow {
    guid: String,
    user_name: String,
    source_cluster: String,
    target_cluster: String,
    operation: String,
    result_payload: String,
    start_time: i64,
    end_time: i64,
    has_entities: bool,
    recorded_at: String,
}

impl AuditRow {
    fn into_entry(self) -> Result<AuditEntry> {
        let guid = Uuid::parse_str(&self.guid)
            .map_err(|e| Error::Store(format!("Bad audit guid '{}': {}", self.guid, e)))?;
        let operation = OperationKind::parse(&self.operation)
            .ok_or_else(|| Error::Store(format!("Unknown audit operation '{}'", self.operation)))?;

        Ok(AuditEntry {
            guid,
            user_name: self.user_name,
            source_cluster: self.source_cluster,
            target_cluster: self.target_cluster,
            operation,
            result_payload: self.result_payload,
            start_time: self.start_time,
            end_time: self.end_time,
            has_entities: self.has_entities,
            recorded_at: parse_time(&self.recorded_at)?,
        })
    }
}

impl AuditStore for SqliteStore {
    fn append(&self, entry: AuditEntry) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO audit_entries (
                guid, user_name, source_cluster, target_cluster, operation,
                result_payload, start_time, end_time, has_entities, recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                entry.guid.to_string(),
                entry.user_name,
                entry.source_cluster,
                entry.target_cluster,
                entry.operation.as_str(),
                entry.result_payload,
                entry.start_time,
                entry.end_time,
                entry.has_entities,
                entry.recorded_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        if let Some(user) = &query.user_name {
            args.push(Value::Text(user.clone()));
            clauses.push(format!("user_name = ?{}", args.len()));
        }
        if let Some(cluster) = &query.cluster {
            args.push(Value::Text(cluster.clone()));
            let n = args.len();
            clauses.push(format!("(source_cluster = ?{n} OR target_cluster = ?{n})"));
        }
        if let Some(op) = query.operation {
            args.push(Value::Text(op.as_str().to_string()));
            clauses.push(format!("operation = ?{}", args.len()));
        }
        if let Some(start) = query.start_after {
            args.push(Value::Integer(start));
            clauses.push(format!("start_time >= ?{}", args.len()));
        }
        if let Some(end) = query.end_before {
            args.push(Value::Integer(end));
            clauses.push(format!("end_time <= ?{}", args.len()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        // SQLite treats a negative LIMIT as unbounded
        let limit = query.limit.map(|l| l as i64).unwrap_or(-1);
        args.push(Value::Integer(limit));
        let limit_idx = args.len();
        args.push(Value::Integer(query.offset as i64));
        let offset_idx = args.len();

        let sql = format!(
            r#"
            SELECT guid, user_name, source_cluster, target_cluster, operation,
                   result_payload, start_time, end_time, has_entities, recorded_at
            FROM audit_entries
            {}
            ORDER BY start_time DESC, id DESC
            LIMIT ?{} OFFSET ?{}
            "#,
            where_clause, limit_idx, offset_idx
        );

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), |row| {
            Ok(AuditRow {
                guid: row.get(0)?,
                user_name: row.get(1)?,
                source_cluster: row.get(2)?,
                target_cluster: row.get(3)?,
                operation: row.get(4)?,
                result_payload: row.get(5)?,
                start_time: row.get(6)?,
                end_time: row.get(7)?,
                has_entities: row.get(8)?,
                recorded_at: row.get(9)?,
            })
        })?;

        let mut entries = Vec::new();
        for result in rows {
            entries.push(result?.into_entry()?);
        }
        Ok(entries)
    }

    fn count(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM audit_entries", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl EntityAttributeStore for SqliteStore {
    fn set_attribute(&self, entity_ids: &[String], attribute: &str, stamp: &ReplicationStamp) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO entity_attributes (entity_id, attribute, cluster_name, last_modified)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(entity_id, attribute) DO UPDATE SET
                    cluster_name = ?3,
                    last_modified = ?4,
                    updated_at = CURRENT_TIMESTAMP
                "#,
            )?;
            for id in entity_ids {
                stmt.execute(params![id, attribute, stamp.cluster, stamp.timestamp])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn attribute(&self, entity_id: &str, attribute: &str) -> Result<Option<ReplicationStamp>> {
        let conn = self.conn.lock();
        let stamp = conn
            .query_row(
                "SELECT cluster_name, last_modified FROM entity_attributes WHERE entity_id = ?1 AND attribute = ?2",
                params![entity_id, attribute],
                |row| {
                    Ok(ReplicationStamp {
                        cluster: row.get(0)?,
                        timestamp: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_server_upsert_merges_markers() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("state").join("audit.db")).unwrap();

        let first = store.save(ClusterServer::new("cluster-b")).unwrap();
        assert!(first.markers.is_empty());

        store
            .save(ClusterServer::new("cluster-b").with_marker("cluster-a", ServerMarker::new("e1", 100)))
            .unwrap();
        store
            .save(ClusterServer::new("cluster-b").with_marker("cluster-c", ServerMarker::new("e5", 300)))
            .unwrap();
        let stored = store
            .save(ClusterServer::new("cluster-b").with_marker("cluster-a", ServerMarker::new("e2", 200)))
            .unwrap();

        assert_eq!(stored.markers.len(), 2);
        assert_eq!(stored.marker("cluster-a"), Some(&ServerMarker::new("e2", 200)));
        assert_eq!(stored.marker("cluster-c"), Some(&ServerMarker::new("e5", 300)));
        assert_eq!(stored.created_at, first.created_at);

        assert_eq!(store.list().unwrap().len(), 1);
        assert!(store.get("nope").unwrap().is_none());
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.save(ClusterServer::new("cluster-a")).unwrap();
            store
                .append(AuditEntry::new("admin", "cluster-a", "", OperationKind::Export, "{}", 1, 2, false))
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert!(store.get("cluster-a").unwrap().is_some());
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_audit_append_and_query() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = AuditEntry::new("admin", "cluster-a", "cluster-b", OperationKind::Export, "{\"x\":1}", 10, 20, true);
        store.append(first.clone()).unwrap();
        store
            .append(AuditEntry::new("admin", "cluster-c", "cluster-a", OperationKind::Import, "{}", 30, 40, false))
            .unwrap();
        store
            .append(AuditEntry::new("bob", "cluster-a", "", OperationKind::Export, "{}", 50, 60, true))
            .unwrap();

        let all = store.query(&AuditQuery::new()).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].user_name, "bob");

        let exports = store.query(&AuditQuery::new().operation(OperationKind::Export).user("admin")).unwrap();
        assert_eq!(exports, vec![first]);

        let with_c = store.query(&AuditQuery::new().cluster("cluster-c")).unwrap();
        assert_eq!(with_c.len(), 1);
        assert!(!with_c[0].has_entities);

        let windowed = store.query(&AuditQuery::new().between(10, 40)).unwrap();
        assert_eq!(windowed.len(), 2);

        let paged = store.query(&AuditQuery::new().page(1, 1)).unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].start_time, 30);
    }

    #[test]
    fn test_identical_appends_are_kept() {
        let store = SqliteStore::open_in_memory().unwrap();
        let entry = AuditEntry::new("admin", "a", "b", OperationKind::Export, "{}", 1, 2, true);
        store.append(entry.clone()).unwrap();
        store.append(entry).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_entity_attributes() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ids = vec!["e1".to_string(), "e2".to_string()];
        let stamp = ReplicationStamp {
            cluster: "cluster-b".into(),
            timestamp: 123,
        };

        store.set_attribute(&ids, "replicated-to", &stamp).unwrap();
        assert_eq!(store.attribute("e1", "replicated-to").unwrap(), Some(stamp.clone()));
        assert_eq!(store.attribute("e2", "replicated-to").unwrap(), Some(stamp));
        assert!(store.attribute("e1", "replicated-from").unwrap().is_none());

        let newer = ReplicationStamp {
            cluster: "cluster-c".into(),
            timestamp: 456,
        };
        store.set_attribute(&ids[..1], "replicated-to", &newer).unwrap();
        assert_eq!(store.attribute("e1", "replicated-to").unwrap(), Some(newer));
    }
}

//! Export / Import Requests and Results

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Export option naming the cluster the data is replicated to
pub const OPTION_REPLICATED_TO: &str = "replicated-to";

/// Import option naming the cluster the data is replicated from
pub const OPTION_REPLICATED_FROM: &str = "replicated-from";

/// Free-form options carried on every export/import request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferOptions(BTreeMap<String, Value>);

impl TransferOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Cluster name stored under `key`, or an empty string when absent.
    ///
    /// Numbers read as their decimal text; any other non-string reads as empty.
    pub fn cluster_name(&self, key: &str) -> String {
        match self.0.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }
}

/// Outcome of an export or import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Success,
    PartialSuccess,
    Fail,
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationStatus::Success => write!(f, "SUCCESS"),
            OperationStatus::PartialSuccess => write!(f, "PARTIAL_SUCCESS"),
            OperationStatus::Fail => write!(f, "FAIL"),
        }
    }
}

/// Request that started an export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportRequest {
    /// Entities (or queries) selected for export
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub options: TransferOptions,
}

/// Result of a completed export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportResult {
    pub request: ExportRequest,
    pub operation_status: OperationStatus,
    /// Most recent modification time (ms since epoch) among exported entities
    pub last_modified_timestamp: i64,
    /// Counters gathered during the export
    #[serde(default)]
    pub metrics: BTreeMap<String, u64>,
}

impl ExportResult {
    pub fn new(request: ExportRequest, operation_status: OperationStatus, last_modified_timestamp: i64) -> Self {
        Self {
            request,
            operation_status,
            last_modified_timestamp,
            metrics: BTreeMap::new(),
        }
    }
}

/// Request that started an import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub options: TransferOptions,
}

/// Result of a completed import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    pub request: ImportRequest,
    pub operation_status: OperationStatus,
    /// Local time (ms since epoch) the import finished applying changes
    pub last_modified_timestamp: i64,
    /// The export this import was built from
    pub export_result: ExportResult,
    #[serde(default)]
    pub metrics: BTreeMap<String, u64>,
}

impl ImportResult {
    pub fn new(
        request: ImportRequest,
        operation_status: OperationStatus,
        last_modified_timestamp: i64,
        export_result: ExportResult,
    ) -> Self {
        Self {
            request,
            operation_status,
            last_modified_timestamp,
            export_result,
            metrics: BTreeMap::new(),
        }
    }
}

/// What the auditor needs to know about a finished transfer
pub trait TransferOutcome: Serialize {
    fn options(&self) -> &TransferOptions;

    fn status(&self) -> OperationStatus;

    /// Timestamp written into replication markers
    fn replication_timestamp(&self) -> i64;

    /// Stable serialized form kept verbatim in the audit entry
    fn to_payload(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl TransferOutcome for ExportResult {
    fn options(&self) -> &TransferOptions {
        &self.request.options
    }

    fn status(&self) -> OperationStatus {
        self.operation_status
    }

    fn replication_timestamp(&self) -> i64 {
        self.last_modified_timestamp
    }
}

impl TransferOutcome for ImportResult {
    fn options(&self) -> &TransferOptions {
        &self.request.options
    }

    fn status(&self) -> OperationStatus {
        self.operation_status
    }

    /// The importing cluster's clock says nothing about when the data was
    /// produced, so the export's timestamp is used.
    fn replication_timestamp(&self) -> i64 {
        self.export_result.last_modified_timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cluster_name_from_options() {
        let options = TransferOptions::new()
            .with("replicated-to", "cluster-b")
            .with("empty", "")
            .with("nothing", Value::Null)
            .with("number", 42)
            .with("object", json!({"a": 1}))
            .with("list", json!(["cluster-x"]))
            .with("flag", true);

        assert_eq!(options.cluster_name("replicated-to"), "cluster-b");
        assert_eq!(options.cluster_name("empty"), "");
        assert_eq!(options.cluster_name("nothing"), "");
        assert_eq!(options.cluster_name("number"), "42");
        assert_eq!(options.cluster_name("missing"), "");
        assert_eq!(options.cluster_name("object"), "");
        assert_eq!(options.cluster_name("list"), "");
        assert_eq!(options.cluster_name("flag"), "");
        assert!(options.contains("empty"));
        assert!(!options.contains("missing"));
    }

    #[test]
    fn test_import_uses_export_timestamp() {
        let export = ExportResult::new(ExportRequest::default(), OperationStatus::Success, 1_000);
        let import = ImportResult::new(ImportRequest::default(), OperationStatus::Success, 9_000, export);
        assert_eq!(import.replication_timestamp(), 1_000);
    }

    #[test]
    fn test_payload_format() {
        let request = ExportRequest {
            items: vec!["db1".into()],
            options: TransferOptions::new().with("replicated-to", "cluster-b"),
        };
        let result = ExportResult::new(request, OperationStatus::PartialSuccess, 5);

        let payload: Value = serde_json::from_str(&result.to_payload().unwrap()).unwrap();
        assert_eq!(payload["operation_status"], json!("PARTIAL_SUCCESS"));
        assert_eq!(payload["request"]["options"]["replicated-to"], json!("cluster-b"));
        assert_eq!(payload["last_modified_timestamp"], json!(5));
    }
}

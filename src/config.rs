//! Transfer Audit Configuration
//!
//! This module provides configuration structures for the transfer audit
//! store and the lookup of the local cluster's name.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main transfer audit configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Local cluster configuration
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Local cluster configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Name of the local cluster (unset = "default")
    #[serde(default)]
    pub name: Option<String>,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory for the audit database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Database file name inside the data directory
    #[serde(default = "default_database_file")]
    pub database_file: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/transfer-audit")
}

fn default_database_file() -> String {
    "audit.db".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database_file: default_database_file(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AuditConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> crate::Result<Self> {
        let config: AuditConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if let Some(name) = &self.cluster.name {
            if name.trim().is_empty() {
                return Err(crate::Error::Config("cluster.name cannot be blank".into()));
            }
        }

        if self.storage.database_file.is_empty() {
            return Err(crate::Error::Config("storage.database_file cannot be empty".into()));
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" => {}
            other => {
                return Err(crate::Error::Config(format!(
                    "logging.format must be 'pretty' or 'compact', got '{}'",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Get the audit database path
    pub fn database_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.database_file)
    }
}

/// Source of the local cluster's configured name.
///
/// `Ok(None)` means no name is configured; the caller substitutes the
/// default. `Err` means the lookup itself failed.
pub trait ClusterNameSource: Send + Sync {
    fn cluster_name(&self) -> crate::Result<Option<String>>;
}

impl ClusterNameSource for AuditConfig {
    fn cluster_name(&self) -> crate::Result<Option<String>> {
        Ok(self.cluster.name.clone())
    }
}

/// Fixed cluster name, mostly useful for embedding and tests
#[derive(Debug, Clone)]
pub struct StaticClusterName(pub Option<String>);

impl StaticClusterName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(Some(name.into()))
    }

    pub fn unset() -> Self {
        Self(None)
    }
}

impl ClusterNameSource for StaticClusterName {
    fn cluster_name(&self) -> crate::Result<Option<String>> {
        Ok(self.0.clone())
    }
}

/// Reads the cluster name from a TOML config file on every lookup, so
/// edits to the file are picked up without a restart.
#[derive(Debug, Clone)]
pub struct ConfigFileClusterName {
    path: PathBuf,
}

impl ConfigFileClusterName {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ClusterNameSource for ConfigFileClusterName {
    fn cluster_name(&self) -> crate::Result<Option<String>> {
        AuditConfig::from_file(&self.path)?.cluster_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_config() {
        let toml = r#"
[cluster]
name = "cluster-a"

[storage]
data_dir = "/tmp/audit"

[logging]
level = "debug"
"#;

        let config = AuditConfig::from_str(toml).unwrap();
        assert_eq!(config.cluster.name.as_deref(), Some("cluster-a"));
        assert_eq!(config.database_path(), PathBuf::from("/tmp/audit/audit.db"));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AuditConfig::from_str("").unwrap();
        assert!(config.cluster.name.is_none());
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/transfer-audit"));
        assert_eq!(config.cluster_name().unwrap(), None);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(AuditConfig::from_str("[cluster]\nname = \"  \"\n").is_err());
        assert!(AuditConfig::from_str("[logging]\nformat = \"xml\"\n").is_err());
        assert!(matches!(
            AuditConfig::from_str("[cluster\n"),
            Err(crate::Error::ConfigParse(_))
        ));
    }

    #[test]
    fn test_config_file_cluster_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("audit.toml");

        let source = ConfigFileClusterName::new(&path);
        assert!(source.cluster_name().is_err());

        std::fs::write(&path, "[cluster]\nname = \"cluster-b\"\n").unwrap();
        assert_eq!(source.cluster_name().unwrap().as_deref(), Some("cluster-b"));

        std::fs::write(&path, "").unwrap();
        assert_eq!(source.cluster_name().unwrap(), None);
    }
}

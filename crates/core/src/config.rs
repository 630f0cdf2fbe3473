//! TOML-based configuration system for Stockroom.

use crate::error::{Result, StockroomError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level Stockroom configuration, deserialized from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockroomConfig {
    pub stockroom: StockroomSection,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub group_sync: GroupSyncConfig,
}

/// Core instance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockroomSection {
    pub instance_name: String,
    pub data_dir: String,
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Database backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "DatabaseDriver::default_driver")]
    pub driver: DatabaseDriver,
    /// SQLite file path.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::Sqlite,
            path: Some("/var/lib/stockroom/stockroom.db".into()),
        }
    }
}

/// Supported database drivers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseDriver {
    Sqlite,
}

impl DatabaseDriver {
    fn default_driver() -> Self {
        Self::Sqlite
    }
}

/// Active Directory (LDAP) connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// LDAP URL, e.g. `ldaps://dc01.example.com:636`. Empty means not configured.
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub bind_dn: String,
    #[serde(default)]
    pub bind_password: String,
    #[serde(default)]
    pub base_dn: String,
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            bind_dn: String::new(),
            bind_password: String::new(),
            base_dn: String::new(),
            tls_verify: default_tls_verify(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl DirectoryConfig {
    /// Whether an LDAP server has been configured at all.
    pub fn is_configured(&self) -> bool {
        !self.server.trim().is_empty()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_tls_verify() -> bool {
    true
}

fn default_connect_timeout() -> u64 {
    5
}

/// Group compare & sync workflow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSyncConfig {
    /// Upper bound on a single add/remove call before it counts as failed.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,
    /// Maximum number of membership edits in flight within one apply.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_search_min_query_len")]
    pub search_min_query_len: usize,
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    #[serde(default = "default_search_result_limit")]
    pub search_result_limit: usize,
    /// Executor name written to the audit trail when the caller supplies none.
    #[serde(default = "default_executor")]
    pub default_executor: String,
}

impl Default for GroupSyncConfig {
    fn default() -> Self {
        Self {
            operation_timeout_secs: default_operation_timeout(),
            max_concurrency: default_max_concurrency(),
            search_min_query_len: default_search_min_query_len(),
            search_debounce_ms: default_search_debounce_ms(),
            search_result_limit: default_search_result_limit(),
            default_executor: default_executor(),
        }
    }
}

impl GroupSyncConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

fn default_operation_timeout() -> u64 {
    5
}

fn default_max_concurrency() -> usize {
    8
}

fn default_search_min_query_len() -> usize {
    2
}

fn default_search_debounce_ms() -> u64 {
    400
}

fn default_search_result_limit() -> usize {
    25
}

fn default_executor() -> String {
    "console".into()
}

impl StockroomConfig {
    /// Load configuration from a TOML file at the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| StockroomError::Config(format!("failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Validate the configuration, returning an error for invalid combinations.
    pub fn validate(&self) -> Result<()> {
        if self.stockroom.instance_name.is_empty() {
            return Err(StockroomError::Config(
                "stockroom.instance_name must not be empty".into(),
            ));
        }

        if self.stockroom.data_dir.is_empty() {
            return Err(StockroomError::Config(
                "stockroom.data_dir must not be empty".into(),
            ));
        }

        match self.stockroom.database.driver {
            DatabaseDriver::Sqlite => {
                if self.stockroom.database.path.is_none() {
                    return Err(StockroomError::Config(
                        "stockroom.database.path is required when driver is sqlite".into(),
                    ));
                }
            }
        }

        if self.directory.is_configured() {
            if self.directory.base_dn.is_empty() {
                return Err(StockroomError::Config(
                    "directory.base_dn is required when directory.server is set".into(),
                ));
            }
            if self.directory.bind_dn.is_empty() {
                return Err(StockroomError::Config(
                    "directory.bind_dn is required when directory.server is set".into(),
                ));
            }
        }

        if self.group_sync.operation_timeout_secs == 0 {
            return Err(StockroomError::Config(
                "group_sync.operation_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.group_sync.max_concurrency == 0 {
            return Err(StockroomError::Config(
                "group_sync.max_concurrency must be greater than zero".into(),
            ));
        }
        if self.group_sync.search_min_query_len == 0 {
            return Err(StockroomError::Config(
                "group_sync.search_min_query_len must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a sensible default configuration.
    pub fn generate_default() -> Self {
        Self {
            stockroom: StockroomSection {
                instance_name: "My Organization".into(),
                data_dir: "/var/lib/stockroom".into(),
                database: DatabaseConfig::default(),
            },
            directory: DirectoryConfig::default(),
            group_sync: GroupSyncConfig::default(),
        }
    }
}

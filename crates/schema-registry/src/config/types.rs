//! Configuration type definitions.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::TypePolicy;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// PostgreSQL connection settings.
    pub database: DatabaseConfig,

    /// Catalog and data table placement.
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// PostgreSQL connection configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password. Never serialized.
    #[serde(default, skip_serializing)]
    pub password: String,

    /// SSL mode (default: "require").
    #[serde(default = "default_require")]
    pub ssl_mode: String,

    /// Pool size (default: 8).
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Seconds to wait for a pooled connection (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub pool_timeout_secs: u64,

    /// Server-side statement timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub statement_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn pool_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_timeout_secs)
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.statement_timeout_secs)
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("ssl_mode", &self.ssl_mode)
            .field("max_connections", &self.max_connections)
            .field("pool_timeout_secs", &self.pool_timeout_secs)
            .field("statement_timeout_secs", &self.statement_timeout_secs)
            .finish()
    }
}

/// Where the catalog and the dynamic tables live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// PostgreSQL schema holding the catalog table (default: "_schema_registry").
    #[serde(default = "default_catalog_schema")]
    pub catalog_schema: String,

    /// Catalog table name (default: "schemas").
    #[serde(default = "default_catalog_table")]
    pub catalog_table: String,

    /// PostgreSQL schema holding one table per declared schema
    /// (default: "registry_data").
    #[serde(default = "default_data_schema")]
    pub data_schema: String,

    /// Field type screening (default: permissive).
    #[serde(default)]
    pub type_policy: TypePolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            catalog_schema: default_catalog_schema(),
            catalog_table: default_catalog_table(),
            data_schema: default_data_schema(),
            type_policy: TypePolicy::default(),
        }
    }
}

// Default value functions for serde
fn default_pg_port() -> u16 {
    5432
}

fn default_require() -> String {
    "require".to_string()
}

fn default_max_connections() -> usize {
    8
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_catalog_schema() -> String {
    "_schema_registry".to_string()
}

fn default_catalog_table() -> String {
    "schemas".to_string()
}

fn default_data_schema() -> String {
    "registry_data".to_string()
}

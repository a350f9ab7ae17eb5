//! Configuration validation.

use super::Config;
use crate::error::{RegistryError, Result};
use crate::identifier::validate_identifier;

const SSL_MODES: &[&str] = &["disable", "require", "verify-ca", "verify-full"];

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let db = &config.database;

    if db.host.is_empty() {
        return Err(RegistryError::Config("database.host is required".into()));
    }
    if db.database.is_empty() {
        return Err(RegistryError::Config("database.database is required".into()));
    }
    if db.user.is_empty() {
        return Err(RegistryError::Config("database.user is required".into()));
    }
    if !SSL_MODES.contains(&db.ssl_mode.to_lowercase().as_str()) {
        return Err(RegistryError::Config(format!(
            "database.ssl_mode must be one of {}, got '{}'",
            SSL_MODES.join(", "),
            db.ssl_mode
        )));
    }
    if db.max_connections == 0 {
        return Err(RegistryError::Config(
            "database.max_connections must be at least 1".into(),
        ));
    }
    if db.pool_timeout_secs == 0 {
        return Err(RegistryError::Config(
            "database.pool_timeout_secs must be at least 1".into(),
        ));
    }
    if db.statement_timeout_secs == 0 {
        return Err(RegistryError::Config(
            "database.statement_timeout_secs must be at least 1".into(),
        ));
    }

    // These names are interpolated into DDL, so they obey the same rule as
    // caller-supplied schema names.
    let registry = &config.registry;
    for (key, value) in [
        ("registry.catalog_schema", &registry.catalog_schema),
        ("registry.catalog_table", &registry.catalog_table),
        ("registry.data_schema", &registry.data_schema),
    ] {
        validate_identifier("namespace", value)
            .map_err(|e| RegistryError::Config(format!("{}: {}", key, e)))?;
    }

    if registry.catalog_schema == registry.data_schema {
        return Err(RegistryError::Config(
            "registry.catalog_schema and registry.data_schema must differ".into(),
        ));
    }

    Ok(())
}

//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

/// Environment variable that overrides `database.password`.
pub const PASSWORD_ENV: &str = "SCHEMA_REGISTRY_DB_PASSWORD";

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    ///
    /// The password from [`PASSWORD_ENV`] wins over the file when set.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(yaml)?;
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            config.database.password = password;
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl DatabaseConfig {
    /// Build a libpq-style connection string (password omitted).
    pub fn display_target(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} sslmode={}",
            self.host, self.port, self.database, self.user, self.ssl_mode
        )
    }
}

//! Error types for the schema registry.

use thiserror::Error;

/// SQLSTATE raised by PostgreSQL for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Main error type for registry operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A schema or field name failed the safe-identifier rule.
    #[error("Invalid {kind} name {name:?}: {reason}")]
    InvalidIdentifier {
        kind: &'static str,
        name: String,
        reason: String,
    },

    /// A field's SQL type token was rejected by the type policy.
    #[error("Invalid type {sql_type:?} for field {field:?}: {reason}")]
    InvalidFieldType {
        field: String,
        sql_type: String,
        reason: String,
    },

    /// Request is structurally invalid (empty owner, empty field list, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Schema (or its physical table name) already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Schema does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The database rejected a DDL/DML statement
    #[error("Storage failure while {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: tokio_postgres::Error,
    },

    /// The database returned a row that does not have the expected shape
    #[error("Unexpected row: {0}")]
    UnexpectedRow(String),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// The extraction collaborator failed or returned nothing usable
    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    /// A database call exceeded its time budget
    #[error("Timed out while {0}")]
    Timeout(String),

    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RegistryError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl std::fmt::Display, context: impl Into<String>) -> Self {
        RegistryError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Wrap a database error with the operation it interrupted.
    pub fn storage(context: impl Into<String>, source: tokio_postgres::Error) -> Self {
        RegistryError::Storage {
            context: context.into(),
            source,
        }
    }

    pub fn invalid_identifier(
        kind: &'static str,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        RegistryError::InvalidIdentifier {
            kind,
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// True if the database reported a unique constraint violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            RegistryError::Storage { source, .. } => source
                .code()
                .map(|state| state.code() == UNIQUE_VIOLATION)
                .unwrap_or(false),
            _ => false,
        }
    }

    /// True for errors caused by the request rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RegistryError::InvalidIdentifier { .. }
                | RegistryError::InvalidFieldType { .. }
                | RegistryError::InvalidRequest(_)
                | RegistryError::Conflict(_)
                | RegistryError::NotFound(_)
        )
    }

    /// Message safe to hand back to a remote caller.
    ///
    /// Client errors keep their full text so the request can be fixed.
    /// Storage-side failures collapse to a generic message; the detailed
    /// chain is only written to the log.
    pub fn public_message(&self) -> String {
        match self {
            e if e.is_client_error() => e.to_string(),
            RegistryError::UpstreamFailure(msg) => format!("Upstream failure: {}", msg),
            RegistryError::Storage { context, .. } => {
                format!("Failed while {}. Please try again later.", context)
            }
            RegistryError::Timeout(context) => {
                format!("Timed out while {}. Please try again later.", context)
            }
            _ => "Internal error. Please try again later.".to_string(),
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            RegistryError::Config(_) | RegistryError::Yaml(_) => 2,
            RegistryError::InvalidIdentifier { .. }
            | RegistryError::InvalidFieldType { .. }
            | RegistryError::InvalidRequest(_)
            | RegistryError::Json(_) => 3,
            RegistryError::NotFound(_) => 4,
            RegistryError::Conflict(_) => 5,
            RegistryError::Storage { .. }
            | RegistryError::Pool { .. }
            | RegistryError::UnexpectedRow(_) => 6,
            RegistryError::Timeout(_) => 7,
            RegistryError::UpstreamFailure(_) => 8,
            RegistryError::Io(_) => 1,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

impl From<deadpool_postgres::PoolError> for RegistryError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        match err {
            deadpool_postgres::PoolError::Timeout(_) => {
                RegistryError::Timeout("waiting for a database connection".to_string())
            }
            other => RegistryError::pool(other, "getting PostgreSQL connection"),
        }
    }
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

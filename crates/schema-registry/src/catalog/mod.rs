//! Schema catalog storage.
//!
//! The catalog is authoritative for which schemas exist. [`CatalogStore`]
//! abstracts where it lives:
//!
//! - **PostgreSQL**: [`PgCatalogStore`], one row per schema with the field
//!   list stored as JSONB
//! - **Memory**: [`MemoryCatalogStore`], process-local, for tests and dry runs
//!
//! The facade works with `Arc<dyn CatalogStore>` without knowing the
//! concrete type.

mod memory;
mod postgres;

pub use memory::MemoryCatalogStore;
pub use postgres::PgCatalogStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::SchemaDefinition;

/// Persistence for [`SchemaDefinition`] records, keyed by caller name.
///
/// Implementations must be `Send + Sync` to allow sharing across async tasks.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Create the catalog storage. Idempotent.
    async fn init_schema(&self) -> Result<()>;

    /// Whether a schema with this caller name is recorded.
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Record a new schema.
    ///
    /// Fails with `Conflict` if the name or the physical table name is
    /// already recorded.
    async fn insert(&self, definition: SchemaDefinition) -> Result<SchemaDefinition>;

    /// Look up a schema by caller name. Fails with `NotFound` if absent.
    async fn find_by_name(&self, name: &str) -> Result<SchemaDefinition>;

    /// Every recorded schema, oldest first.
    async fn list_all(&self) -> Result<Vec<SchemaDefinition>>;

    /// Delete a schema record. Fails with `NotFound` if absent.
    async fn remove(&self, name: &str) -> Result<()>;

    /// Round-trip to the backing store.
    async fn ping(&self) -> Result<()>;

    /// Get the backend type name for logging/debugging.
    fn backend_type(&self) -> &'static str;
}

pub(crate) fn schema_not_found(name: &str) -> crate::error::RegistryError {
    crate::error::RegistryError::NotFound(format!("schema '{}' not found", name))
}

pub(crate) fn schema_exists(name: &str) -> crate::error::RegistryError {
    crate::error::RegistryError::Conflict(format!("schema '{}' already exists", name))
}

pub(crate) fn table_taken(table_name: &str) -> crate::error::RegistryError {
    crate::error::RegistryError::Conflict(format!(
        "table '{}' is already used by another schema",
        table_name
    ))
}

//! Schema lifecycle facade.
//!
//! [`SchemaRegistry`] is the only entry point callers need. It validates
//! every request before touching storage, then runs the closed pipeline
//! `validate -> existence check -> DDL -> catalog write` for creates and
//! `catalog remove -> DROP` for deletes. The two storage steps are not
//! transactional; anything left half-done shows up in [`SchemaRegistry::audit`].
//!
//! Per schema name the lifecycle is `ABSENT -> ACTIVE -> ABSENT`: creating
//! an active name is a `Conflict`, and deleting, inserting into or querying
//! an absent name is `NotFound`.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::catalog::{CatalogStore, MemoryCatalogStore, PgCatalogStore};
use crate::config::Config;
use crate::error::{RegistryError, Result};
use crate::identifier::{physical_name, physical_names};
use crate::memory::MemoryDatabase;
use crate::model::{DynamicRow, NewSchema, RowFilter, SchemaDefinition};
use crate::rows::{row_payload, PgRowGateway, RowGateway};
use crate::table::{PgTableManager, TableManager};
use crate::types::TypePolicy;

/// Differences between the catalog and the live tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Live tables in the data namespace with no catalog record.
    pub orphaned_tables: Vec<String>,

    /// Catalog records whose table is gone.
    pub missing_tables: Vec<String>,
}

impl AuditReport {
    /// True when catalog and tables agree.
    pub fn is_clean(&self) -> bool {
        self.orphaned_tables.is_empty() && self.missing_tables.is_empty()
    }
}

/// Result of [`SchemaRegistry::health_check`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub backend: String,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runtime schema registry and dynamic table manager.
///
/// Cheap to clone; clones share the same backing components and may be
/// driven from independent tasks.
#[derive(Clone)]
pub struct SchemaRegistry {
    catalog: Arc<dyn CatalogStore>,
    tables: Arc<dyn TableManager>,
    rows: Arc<dyn RowGateway>,
    type_policy: TypePolicy,
}

impl SchemaRegistry {
    /// Wire a registry from explicit components.
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        tables: Arc<dyn TableManager>,
        rows: Arc<dyn RowGateway>,
        type_policy: TypePolicy,
    ) -> Self {
        Self {
            catalog,
            tables,
            rows,
            type_policy,
        }
    }

    /// Connect to PostgreSQL and wire the registry over one shared pool.
    pub async fn connect(config: &Config) -> Result<Self> {
        let pool = crate::pool::connect(&config.database).await?;
        let data_schema = &config.registry.data_schema;

        let catalog = PgCatalogStore::new(pool.clone(), &config.registry)?;
        let tables = PgTableManager::new(pool.clone(), data_schema.as_str());
        let rows = PgRowGateway::new(pool, data_schema.as_str());

        Ok(Self::new(
            Arc::new(catalog),
            Arc::new(tables),
            Arc::new(rows),
            config.registry.type_policy,
        ))
    }

    /// A registry kept entirely in process memory.
    pub fn in_memory() -> Self {
        Self::in_memory_with_policy(TypePolicy::default())
    }

    pub fn in_memory_with_policy(type_policy: TypePolicy) -> Self {
        let database = Arc::new(MemoryDatabase::new());
        Self::new(
            Arc::new(MemoryCatalogStore::new()),
            database.clone(),
            database,
            type_policy,
        )
    }

    /// Create the catalog storage and the data namespace. Idempotent.
    pub async fn init(&self) -> Result<()> {
        self.catalog.init_schema().await.map_err(log_failure)?;
        self.tables.init().await.map_err(log_failure)?;
        info!("Schema registry initialized ({} catalog)", self.catalog.backend_type());
        Ok(())
    }

    /// Declare a new schema and create its table.
    pub async fn create_schema(&self, request: NewSchema) -> Result<SchemaDefinition> {
        let table_name = physical_name("schema", &request.name)?;

        if request.fields.is_empty() {
            return Err(RegistryError::InvalidRequest(format!(
                "schema '{}' must declare at least one field",
                request.name
            )));
        }
        physical_names(request.fields.iter().map(|f| f.name.as_str()))?;
        for field in &request.fields {
            self.type_policy.check(&field.name, &field.sql_type)?;
        }

        if self.catalog.exists(&request.name).await.map_err(log_failure)? {
            return Err(RegistryError::Conflict(format!(
                "schema '{}' already exists",
                request.name
            )));
        }

        let existing = self.catalog.list_all().await.map_err(log_failure)?;
        if let Some(owner) = existing.iter().find(|s| s.table_name == table_name) {
            return Err(RegistryError::Conflict(format!(
                "schema '{}' maps to table '{}', which is already used by schema '{}'",
                request.name, table_name, owner.name
            )));
        }

        let definition = SchemaDefinition::from_request(request);
        let schema_name = definition.name.clone();
        self.tables
            .create_table(&definition.table_name, &definition.fields)
            .await
            .map_err(log_failure)?;

        match self.catalog.insert(definition).await {
            Ok(recorded) => {
                info!(
                    "Created schema '{}' ({} fields) as table '{}'",
                    recorded.name,
                    recorded.fields.len(),
                    recorded.table_name
                );
                Ok(recorded)
            }
            // A conflict here means a concurrent create won; the table is theirs.
            Err(e @ RegistryError::Conflict(_)) => Err(e),
            Err(e) => {
                warn!(
                    "Table '{}' was created but recording schema '{}' failed; \
                     the table is orphaned until it is dropped or the create is retried",
                    table_name, schema_name
                );
                Err(log_failure(e))
            }
        }
    }

    /// Every declared schema, oldest first.
    pub async fn list_schemas(&self) -> Result<Vec<SchemaDefinition>> {
        self.catalog.list_all().await.map_err(log_failure)
    }

    pub async fn find_schema_by_name(&self, name: &str) -> Result<SchemaDefinition> {
        self.catalog.find_by_name(name).await.map_err(log_failure)
    }

    /// Remove a schema's record and drop its table.
    pub async fn delete_schema(&self, name: &str) -> Result<()> {
        let definition = self.catalog.find_by_name(name).await.map_err(log_failure)?;
        self.catalog.remove(name).await.map_err(log_failure)?;

        if let Err(e) = self.tables.drop_table(&definition.table_name).await {
            warn!(
                "Schema '{}' was removed from the catalog but dropping table '{}' failed; \
                 the table is orphaned",
                name, definition.table_name
            );
            return Err(log_failure(e));
        }

        info!("Deleted schema '{}' and dropped table '{}'", name, definition.table_name);
        Ok(())
    }

    /// Insert one row for `owner` and return its id.
    pub async fn insert_data(
        &self,
        name: &str,
        owner: &str,
        values: &Map<String, Value>,
    ) -> Result<Uuid> {
        if owner.trim().is_empty() {
            return Err(RegistryError::InvalidRequest(
                "owner must not be empty".to_string(),
            ));
        }

        let definition = self.catalog.find_by_name(name).await.map_err(log_failure)?;

        let (_, ignored) = row_payload(&definition, values);
        if !ignored.is_empty() {
            debug!("Ignoring undeclared keys for schema '{}': {:?}", name, ignored);
        }

        let id = self
            .rows
            .insert_row(&definition, owner, values)
            .await
            .map_err(log_failure)?;
        debug!("Inserted row {} into '{}' for owner '{}'", id, name, owner);
        Ok(id)
    }

    /// Rows of a schema, optionally restricted to one owner.
    pub async fn query_data(&self, name: &str, filter: &RowFilter) -> Result<Vec<DynamicRow>> {
        let definition = self.catalog.find_by_name(name).await.map_err(log_failure)?;
        self.rows
            .query_rows(&definition, filter)
            .await
            .map_err(log_failure)
    }

    /// Caller field names of a schema in declared order.
    pub async fn get_fields(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.find_schema_by_name(name).await?.field_names())
    }

    /// Compare catalog records with the tables that actually exist.
    pub async fn audit(&self) -> Result<AuditReport> {
        let recorded: BTreeSet<String> = self
            .catalog
            .list_all()
            .await
            .map_err(log_failure)?
            .into_iter()
            .map(|s| s.table_name)
            .collect();
        let live: BTreeSet<String> = self
            .tables
            .list_tables()
            .await
            .map_err(log_failure)?
            .into_iter()
            .collect();

        let report = AuditReport {
            orphaned_tables: live.difference(&recorded).cloned().collect(),
            missing_tables: recorded.difference(&live).cloned().collect(),
        };

        if !report.is_clean() {
            warn!(
                "Catalog audit found {} orphaned and {} missing tables",
                report.orphaned_tables.len(),
                report.missing_tables.len()
            );
        }
        Ok(report)
    }

    /// Ping the catalog backend and report round-trip latency.
    pub async fn health_check(&self) -> HealthStatus {
        let start = Instant::now();
        let result = self.catalog.ping().await;
        let latency_ms = start.elapsed().as_millis() as u64;

        HealthStatus {
            healthy: result.is_ok(),
            backend: self.catalog.backend_type().to_string(),
            latency_ms,
            error: result.err().map(|e| e.public_message()),
        }
    }
}

/// Log system-side failures with their full chain before they propagate.
fn log_failure(err: RegistryError) -> RegistryError {
    if !err.is_client_error() {
        error!("{}", err.format_detailed());
    }
    err
}

//! PostgreSQL-backed catalog store.
//!
//! Schemas are stored in `<catalog_schema>.<catalog_table>`, one row per
//! schema. `name` and `table_name` carry UNIQUE constraints so two callers
//! racing to create the same schema cannot both record it; the loser's
//! unique violation is reported as `Conflict`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::types::Json;
use tokio_postgres::Row;
use tracing::debug;
use uuid::Uuid;

use super::{schema_exists, schema_not_found, table_taken, CatalogStore};
use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::identifier::{qualify_pg, quote_pg};
use crate::model::{FieldDefinition, SchemaDefinition};

const SELECT_COLUMNS: &str = "id, name, table_name, fields, created_at, updated_at";

/// Catalog stored in a PostgreSQL table.
pub struct PgCatalogStore {
    pool: Pool,
    namespace: String,
    table: String,
}

impl PgCatalogStore {
    /// Create a catalog store over a shared pool.
    pub fn new(pool: Pool, config: &RegistryConfig) -> Result<Self> {
        Ok(Self {
            pool,
            namespace: quote_pg(&config.catalog_schema)?,
            table: qualify_pg(&config.catalog_schema, &config.catalog_table)?,
        })
    }

    /// Quoted, namespace-qualified catalog table name.
    pub fn qualified_table(&self) -> &str {
        &self.table
    }

    fn row_to_definition(row: &Row) -> SchemaDefinition {
        let id: Uuid = row.get(0);
        let name: String = row.get(1);
        let table_name: String = row.get(2);
        let Json(fields): Json<Vec<FieldDefinition>> = row.get(3);
        let created_at: DateTime<Utc> = row.get(4);
        let updated_at: DateTime<Utc> = row.get(5);

        SchemaDefinition {
            id,
            name,
            table_name,
            fields,
            created_at,
            updated_at,
        }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn init_schema(&self) -> Result<()> {
        let conn = self.pool.get().await?;

        conn.execute(&format!("CREATE SCHEMA IF NOT EXISTS {}", self.namespace), &[])
            .await
            .map_err(|e| RegistryError::storage("creating catalog namespace", e))?;

        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id UUID PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE,
                    table_name TEXT NOT NULL UNIQUE,
                    fields JSONB NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )",
                self.table
            ),
            &[],
        )
        .await
        .map_err(|e| RegistryError::storage("creating catalog table", e))?;

        debug!("Catalog table {} ready", self.table);
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let conn = self.pool.get().await?;

        let row = conn
            .query_one(
                &format!("SELECT EXISTS (SELECT 1 FROM {} WHERE name = $1)", self.table),
                &[&name],
            )
            .await
            .map_err(|e| RegistryError::storage("checking schema existence", e))?;

        Ok(row.get::<_, bool>(0))
    }

    async fn insert(&self, definition: SchemaDefinition) -> Result<SchemaDefinition> {
        let conn = self.pool.get().await?;

        let result = conn
            .execute(
                &format!(
                    "INSERT INTO {} (id, name, table_name, fields, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $6)",
                    self.table
                ),
                &[
                    &definition.id,
                    &definition.name,
                    &definition.table_name,
                    &Json(&definition.fields),
                    &definition.created_at,
                    &definition.updated_at,
                ],
            )
            .await
            .map_err(|e| RegistryError::storage("recording schema", e));

        match result {
            Ok(_) => Ok(definition),
            Err(err) if err.is_unique_violation() => {
                drop(conn);
                if self.exists(&definition.name).await? {
                    Err(schema_exists(&definition.name))
                } else {
                    Err(table_taken(&definition.table_name))
                }
            }
            Err(err) => Err(err),
        }
    }

    async fn find_by_name(&self, name: &str) -> Result<SchemaDefinition> {
        let conn = self.pool.get().await?;

        let row = conn
            .query_opt(
                &format!("SELECT {} FROM {} WHERE name = $1", SELECT_COLUMNS, self.table),
                &[&name],
            )
            .await
            .map_err(|e| RegistryError::storage("loading schema", e))?;

        match row {
            Some(r) => Ok(Self::row_to_definition(&r)),
            None => Err(schema_not_found(name)),
        }
    }

    async fn list_all(&self) -> Result<Vec<SchemaDefinition>> {
        let conn = self.pool.get().await?;

        let rows = conn
            .query(
                &format!(
                    "SELECT {} FROM {} ORDER BY created_at, name",
                    SELECT_COLUMNS, self.table
                ),
                &[],
            )
            .await
            .map_err(|e| RegistryError::storage("listing schemas", e))?;

        Ok(rows.iter().map(Self::row_to_definition).collect())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let conn = self.pool.get().await?;

        let deleted = conn
            .execute(&format!("DELETE FROM {} WHERE name = $1", self.table), &[&name])
            .await
            .map_err(|e| RegistryError::storage("removing schema record", e))?;

        if deleted == 0 {
            return Err(schema_not_found(name));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let conn = self.pool.get().await?;
        conn.simple_query("SELECT 1")
            .await
            .map_err(|e| RegistryError::storage("pinging the catalog database", e))?;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "postgres"
    }
}

//! PostgreSQL table manager.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use tracing::{debug, info};

use super::{create_table_ddl, drop_table_ddl, TableManager};
use crate::error::{RegistryError, Result};
use crate::identifier::quote_pg;
use crate::model::FieldDefinition;

/// Creates and drops dynamic tables inside one PostgreSQL schema.
pub struct PgTableManager {
    pool: Pool,
    namespace: String,
}

impl PgTableManager {
    pub fn new(pool: Pool, namespace: impl Into<String>) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl TableManager for PgTableManager {
    async fn init(&self) -> Result<()> {
        let client = self.pool.get().await?;

        let sql = format!("CREATE SCHEMA IF NOT EXISTS {}", quote_pg(&self.namespace)?);
        client
            .execute(&sql, &[])
            .await
            .map_err(|e| RegistryError::storage("creating data namespace", e))?;

        debug!("Data namespace '{}' ready", self.namespace);
        Ok(())
    }

    async fn create_table(&self, table_name: &str, fields: &[FieldDefinition]) -> Result<()> {
        let client = self.pool.get().await?;

        let ddl = create_table_ddl(&self.namespace, table_name, fields)?;
        debug!("{}", ddl);
        client
            .execute(&ddl, &[])
            .await
            .map_err(|e| RegistryError::storage(format!("creating table '{}'", table_name), e))?;

        info!("Created table {}.{}", self.namespace, table_name);
        Ok(())
    }

    async fn drop_table(&self, table_name: &str) -> Result<()> {
        let client = self.pool.get().await?;

        let sql = drop_table_ddl(&self.namespace, table_name)?;
        client
            .execute(&sql, &[])
            .await
            .map_err(|e| RegistryError::storage(format!("dropping table '{}'", table_name), e))?;

        info!("Dropped table {}.{}", self.namespace, table_name);
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let client = self.pool.get().await?;

        let sql = r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = $1::text AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = client
            .query(sql, &[&self.namespace])
            .await
            .map_err(|e| RegistryError::storage("listing data tables", e))?;
        Ok(rows.iter().map(|r| r.get::<_, String>(0)).collect())
    }
}

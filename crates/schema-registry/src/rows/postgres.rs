//! PostgreSQL row gateway.

use async_trait::async_trait;
use deadpool_postgres::Pool;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::{build_insert_query, build_select_query, row_payload, RowGateway};
use crate::error::{RegistryError, Result};
use crate::model::{rekey_row, DynamicRow, RowFilter, SchemaDefinition};

/// Reads and writes rows of dynamic tables in one PostgreSQL schema.
pub struct PgRowGateway {
    pool: Pool,
    namespace: String,
}

impl PgRowGateway {
    pub fn new(pool: Pool, namespace: impl Into<String>) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl RowGateway for PgRowGateway {
    async fn insert_row(
        &self,
        definition: &SchemaDefinition,
        owner: &str,
        values: &Map<String, Value>,
    ) -> Result<Uuid> {
        let (payload, _) = row_payload(definition, values);

        let sql = build_insert_query(&self.namespace, definition, &payload)?;
        let payload = Value::Object(payload);

        let client = self.pool.get().await?;
        let row = client
            .query_one(&sql, &[&owner, &payload])
            .await
            .map_err(|e| {
                RegistryError::storage(format!("inserting into '{}'", definition.table_name), e)
            })?;

        let id: Uuid = row.get(0);
        debug!("Inserted row {} into {}", id, definition.table_name);
        Ok(id)
    }

    async fn query_rows(
        &self,
        definition: &SchemaDefinition,
        filter: &RowFilter,
    ) -> Result<Vec<DynamicRow>> {
        let client = self.pool.get().await?;
        let context = || format!("reading from '{}'", definition.table_name);

        let rows = match &filter.owner {
            Some(owner) => {
                let sql = build_select_query(&self.namespace, definition, true)?;
                client
                    .query(&sql, &[owner])
                    .await
                    .map_err(|e| RegistryError::storage(context(), e))?
            }
            None => {
                let sql = build_select_query(&self.namespace, definition, false)?;
                client
                    .query(&sql, &[])
                    .await
                    .map_err(|e| RegistryError::storage(context(), e))?
            }
        };

        rows.iter()
            .map(|row| match row.get::<_, Value>(0) {
                Value::Object(stored) => Ok(rekey_row(definition, stored)),
                other => Err(RegistryError::UnexpectedRow(format!(
                    "expected an object from '{}', got {}",
                    definition.table_name, other
                ))),
            })
            .collect()
    }
}

//! In-memory stand-in for the data namespace.
//!
//! [`MemoryDatabase`] implements both [`TableManager`] and [`RowGateway`]
//! over one shared map of tables, so a registry built from it behaves like
//! the PostgreSQL backend minus type coercion: values are stored exactly as
//! given.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{RegistryError, Result};
use crate::model::{rekey_row, DynamicRow, FieldDefinition, RowFilter, SchemaDefinition};
use crate::rows::{row_payload, RowGateway};
use crate::table::TableManager;

#[derive(Debug, Clone)]
struct MemoryTable {
    columns: Vec<String>,
    rows: Vec<Map<String, Value>>,
}

/// Tables and rows held in process memory.
#[derive(Default)]
pub struct MemoryDatabase {
    tables: Mutex<BTreeMap<String, MemoryTable>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, BTreeMap<String, MemoryTable>> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Column names of a table, `id` and `owner` first.
    pub fn columns(&self, table_name: &str) -> Option<Vec<String>> {
        self.tables().get(table_name).map(|t| t.columns.clone())
    }

    fn missing_table(table_name: &str) -> RegistryError {
        RegistryError::NotFound(format!("table '{}' does not exist", table_name))
    }
}

#[async_trait]
impl TableManager for MemoryDatabase {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn create_table(&self, table_name: &str, fields: &[FieldDefinition]) -> Result<()> {
        let mut columns = vec!["id".to_string(), "owner".to_string()];
        columns.extend(fields.iter().map(|f| f.column_name()));

        self.tables()
            .entry(table_name.to_string())
            .or_insert_with(|| MemoryTable {
                columns,
                rows: Vec::new(),
            });
        Ok(())
    }

    async fn drop_table(&self, table_name: &str) -> Result<()> {
        self.tables().remove(table_name);
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.tables().keys().cloned().collect())
    }
}

#[async_trait]
impl RowGateway for MemoryDatabase {
    async fn insert_row(
        &self,
        definition: &SchemaDefinition,
        owner: &str,
        values: &Map<String, Value>,
    ) -> Result<Uuid> {
        let (payload, _) = row_payload(definition, values);

        let mut tables = self.tables();
        let table = tables
            .get_mut(&definition.table_name)
            .ok_or_else(|| Self::missing_table(&definition.table_name))?;

        let id = Uuid::new_v4();
        let mut row = Map::new();
        row.insert("id".to_string(), Value::String(id.to_string()));
        row.insert("owner".to_string(), Value::String(owner.to_string()));
        for (column, value) in payload {
            if table.columns.contains(&column) {
                row.insert(column, value);
            }
        }
        table.rows.push(row);

        Ok(id)
    }

    async fn query_rows(
        &self,
        definition: &SchemaDefinition,
        filter: &RowFilter,
    ) -> Result<Vec<DynamicRow>> {
        let tables = self.tables();
        let table = tables
            .get(&definition.table_name)
            .ok_or_else(|| Self::missing_table(&definition.table_name))?;

        Ok(table
            .rows
            .iter()
            .filter(|row| match &filter.owner {
                Some(owner) => row.get("owner").and_then(Value::as_str) == Some(owner.as_str()),
                None => true,
            })
            .map(|row| rekey_row(definition, row.clone()))
            .collect())
    }
}

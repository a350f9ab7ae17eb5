//! In-memory catalog store.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{schema_exists, schema_not_found, table_taken, CatalogStore};
use crate::error::Result;
use crate::model::SchemaDefinition;

/// Catalog kept in process memory, with the same uniqueness rules as the
/// PostgreSQL store.
#[derive(Default)]
pub struct MemoryCatalogStore {
    records: Mutex<Vec<SchemaDefinition>>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> std::sync::MutexGuard<'_, Vec<SchemaDefinition>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn init_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.records().iter().any(|r| r.name == name))
    }

    async fn insert(&self, definition: SchemaDefinition) -> Result<SchemaDefinition> {
        let mut records = self.records();
        if records.iter().any(|r| r.name == definition.name) {
            return Err(schema_exists(&definition.name));
        }
        if records.iter().any(|r| r.table_name == definition.table_name) {
            return Err(table_taken(&definition.table_name));
        }
        records.push(definition.clone());
        Ok(definition)
    }

    async fn find_by_name(&self, name: &str) -> Result<SchemaDefinition> {
        self.records()
            .iter()
            .find(|r| r.name == name)
            .cloned()
            .ok_or_else(|| schema_not_found(name))
    }

    async fn list_all(&self) -> Result<Vec<SchemaDefinition>> {
        Ok(self.records().clone())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let mut records = self.records();
        let idx = records
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| schema_not_found(name))?;
        records.remove(idx);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

//! Schema definitions and dynamic rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::identifier::sanitize;

/// One declared field of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Caller-facing field name.
    pub name: String,

    /// Native PostgreSQL type token, passed through to DDL.
    #[serde(rename = "type")]
    pub sql_type: String,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }

    /// Physical column name for this field.
    pub fn column_name(&self) -> String {
        sanitize(&self.name)
    }
}

/// Request to declare a new schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSchema {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
}

impl NewSchema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }
}

/// A schema as recorded in the catalog.
///
/// `name` is the caller's name and the catalog key; `table_name` is the
/// sanitized physical table. The field list never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub id: Uuid,
    pub name: String,
    pub table_name: String,
    pub fields: Vec<FieldDefinition>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SchemaDefinition {
    /// Build a fresh definition for a validated request.
    pub fn from_request(request: NewSchema) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            table_name: sanitize(&request.name),
            name: request.name,
            fields: request.fields,
            created_at: now,
            updated_at: now,
        }
    }

    /// Caller field names in declared order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// `(field name, column name)` pairs in declared order.
    pub fn column_mapping(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|f| (f.name.clone(), f.column_name()))
            .collect()
    }
}

/// One row of a dynamic table, keyed by `id`, `owner` and field names.
pub type DynamicRow = Map<String, Value>;

/// Filter for [`query_rows`](crate::rows::RowGateway::query_rows).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl RowFilter {
    /// Match every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match rows belonging to `owner`.
    pub fn owner(owner: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
        }
    }
}

/// Rekey a row read back from the database from column names to field names.
///
/// Columns that are not declared fields (`id`, `owner`) keep their names.
pub fn rekey_row(definition: &SchemaDefinition, mut stored: DynamicRow) -> DynamicRow {
    let mut row = Map::new();

    for reserved in crate::identifier::RESERVED_COLUMNS {
        if let Some(value) = stored.remove(*reserved) {
            row.insert((*reserved).to_string(), value);
        }
    }

    for (field, column) in definition.column_mapping() {
        let value = stored.remove(&column).unwrap_or(Value::Null);
        row.insert(field, value);
    }

    row
}

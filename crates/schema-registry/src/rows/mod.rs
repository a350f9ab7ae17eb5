//! Typed-at-runtime row access for dynamic tables.
//!
//! Values are never interpolated. An insert binds the owner as `$1` and the
//! whole row as a single JSONB parameter `$2`, which PostgreSQL expands with
//! `jsonb_populate_record` against the table's own row type. That gives:
//!
//! - coercion of JSON values into the declared column types by the server,
//! - column defaults for declared fields that are missing or null, since
//!   those columns are left out of the insert (plain columns default to
//!   `NULL`),
//! - no way for payload keys to name a column, since only declared fields
//!   are copied into the payload.
//!
//! The only interpolated text is the quoted, sanitized table and column
//! names.

mod postgres;

pub use postgres::PgRowGateway;

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::Result;
use crate::identifier::{qualify_pg, quote_pg};
use crate::model::{DynamicRow, RowFilter, SchemaDefinition};

/// Generic insert/select against a schema's physical table.
#[async_trait]
pub trait RowGateway: Send + Sync {
    /// Insert one row and return its generated id.
    ///
    /// `values` is keyed by caller field names. Declared fields that are
    /// missing or null take the column default (NULL for plain columns);
    /// keys that are not declared fields are ignored.
    async fn insert_row(
        &self,
        definition: &SchemaDefinition,
        owner: &str,
        values: &Map<String, Value>,
    ) -> Result<Uuid>;

    /// All rows of the table, or only `filter.owner`'s rows when set.
    ///
    /// Rows are keyed by `id`, `owner` and caller field names. Stored values
    /// come back as JSON without coercion to the declared types.
    async fn query_rows(
        &self,
        definition: &SchemaDefinition,
        filter: &RowFilter,
    ) -> Result<Vec<DynamicRow>>;
}

/// Build the JSON payload for an insert, keyed by physical column name.
///
/// Only declared fields with a non-null value are included, so an absent or
/// null field leaves its column to the table default (NULL unless the type
/// declares one, e.g. `serial`). Returns the payload and the caller keys that
/// were ignored because they are not declared fields.
pub fn row_payload(
    definition: &SchemaDefinition,
    values: &Map<String, Value>,
) -> (Map<String, Value>, Vec<String>) {
    let mut payload = Map::new();
    for (field, column) in definition.column_mapping() {
        match values.get(&field) {
            None | Some(Value::Null) => {}
            Some(value) => {
                payload.insert(column, value.clone());
            }
        }
    }

    let ignored = values
        .keys()
        .filter(|k| !definition.fields.iter().any(|f| &f.name == *k))
        .cloned()
        .collect();

    (payload, ignored)
}

/// Generate the parameterized insert for one payload from [`row_payload`].
///
/// `$1` is the owner, `$2` the JSONB payload. The column list names only
/// the payload's columns, in declared order.
pub fn build_insert_query(
    namespace: &str,
    definition: &SchemaDefinition,
    payload: &Map<String, Value>,
) -> Result<String> {
    let target = qualify_pg(namespace, &definition.table_name)?;

    let mut columns = vec![quote_pg("owner")?];
    let mut select = vec!["$1::text".to_string()];
    for field in &definition.fields {
        let name = field.column_name();
        if !payload.contains_key(&name) {
            continue;
        }
        let column = quote_pg(&name)?;
        select.push(format!("r.{}", column));
        columns.push(column);
    }

    Ok(format!(
        "INSERT INTO {target} ({}) SELECT {} FROM jsonb_populate_record(NULL::{target}, $2::jsonb) AS r RETURNING \"id\"",
        columns.join(", "),
        select.join(", "),
    ))
}

/// Generate the select for a schema's table; each row is returned as one
/// JSONB value. With `by_owner`, `$1` is the owner.
///
/// `t.*` is a whole-row reference even when a column is itself named `t`.
pub fn build_select_query(
    namespace: &str,
    definition: &SchemaDefinition,
    by_owner: bool,
) -> Result<String> {
    let source = qualify_pg(namespace, &definition.table_name)?;
    let where_clause = if by_owner { " WHERE t.\"owner\" = $1" } else { "" };

    Ok(format!("SELECT to_jsonb(t.*) FROM {} AS t{}", source, where_clause))
}

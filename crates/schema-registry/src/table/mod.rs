//! Dynamic table lifecycle.
//!
//! Each declared schema owns one physical table in the data namespace:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS "registry_data"."invoices" (
//!     "id" UUID PRIMARY KEY DEFAULT gen_random_uuid(),
//!     "owner" TEXT NOT NULL,
//!     "amount" numeric
//! )
//! ```
//!
//! Create and drop are both idempotent (`IF NOT EXISTS` / `IF EXISTS`). The
//! catalog write and the DDL are separate, non-transactional steps, so
//! re-running a create or delete is how a caller recovers from a failure
//! between them.

mod postgres;

pub use postgres::PgTableManager;

use async_trait::async_trait;

use crate::error::Result;
use crate::identifier::{qualify_pg, quote_pg};
use crate::model::FieldDefinition;

/// Issues DDL for the per-schema tables.
#[async_trait]
pub trait TableManager: Send + Sync {
    /// Create the data namespace. Idempotent.
    async fn init(&self) -> Result<()>;

    /// Create a table with `id`, `owner` and one column per field.
    /// A no-op if the table already exists.
    async fn create_table(&self, table_name: &str, fields: &[FieldDefinition]) -> Result<()>;

    /// Drop a table. A no-op if it does not exist.
    async fn drop_table(&self, table_name: &str) -> Result<()>;

    /// Names of all tables currently in the data namespace.
    async fn list_tables(&self) -> Result<Vec<String>>;
}

/// Generate the `CREATE TABLE` statement for a schema's physical table.
///
/// Column names are the fields' sanitized names; type tokens are copied
/// verbatim and must already have passed the type policy.
pub fn create_table_ddl(
    namespace: &str,
    table_name: &str,
    fields: &[FieldDefinition],
) -> Result<String> {
    let mut col_defs = vec![
        "\"id\" UUID PRIMARY KEY DEFAULT gen_random_uuid()".to_string(),
        "\"owner\" TEXT NOT NULL".to_string(),
    ];

    for field in fields {
        col_defs.push(format!(
            "{} {}",
            quote_pg(&field.column_name())?,
            field.sql_type.trim()
        ));
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        qualify_pg(namespace, table_name)?,
        col_defs.join(",\n    ")
    ))
}

/// Generate the `DROP TABLE` statement for a schema's physical table.
pub fn drop_table_ddl(namespace: &str, table_name: &str) -> Result<String> {
    Ok(format!(
        "DROP TABLE IF EXISTS {}",
        qualify_pg(namespace, table_name)?
    ))
}

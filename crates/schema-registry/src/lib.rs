//! # schema-registry
//!
//! Runtime-defined schemas materialized as PostgreSQL tables.
//!
//! Callers declare a named schema as a list of `(field, SQL type)` pairs; the
//! registry records it in a catalog and creates one physical table for it.
//! Rows are then inserted and queried generically against that table:
//!
//! - **Identifier sanitizing**: caller names are validated and mapped to
//!   snake_case physical names before they reach any SQL text
//! - **Catalog**: authoritative record of declared schemas, with unique
//!   names and table names
//! - **Dynamic tables**: idempotent create/drop with `id` and `owner` columns
//! - **Row gateway**: fully parameterized inserts and owner-filtered scans
//! - **Ingest**: pluggable field extraction feeding the row gateway
//!
//! ## Example
//!
//! ```rust,no_run
//! use schema_registry::{Config, FieldDefinition, NewSchema, RowFilter, SchemaRegistry};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> schema_registry::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let registry = SchemaRegistry::connect(&config).await?;
//!     registry.init().await?;
//!
//!     registry
//!         .create_schema(NewSchema::new(
//!             "invoices",
//!             vec![FieldDefinition::new("amount", "numeric")],
//!         ))
//!         .await?;
//!
//!     let values = json!({"amount": 42});
//!     if let Some(values) = values.as_object() {
//!         registry.insert_data("invoices", "user1", values).await?;
//!     }
//!
//!     let rows = registry.query_data("invoices", &RowFilter::owner("user1")).await?;
//!     println!("{} rows", rows.len());
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod identifier;
pub mod ingest;
pub mod memory;
pub mod model;
pub mod pool;
pub mod registry;
pub mod rows;
pub mod table;
pub mod types;

// Re-exports for convenient access
pub use catalog::{CatalogStore, MemoryCatalogStore, PgCatalogStore};
pub use config::{Config, DatabaseConfig, RegistryConfig};
pub use error::{RegistryError, Result};
pub use ingest::{build_extraction_prompt, FieldExtractor, IngestOutcome, IngestPipeline};
pub use memory::MemoryDatabase;
pub use model::{DynamicRow, FieldDefinition, NewSchema, RowFilter, SchemaDefinition};
pub use registry::{AuditReport, HealthStatus, SchemaRegistry};
pub use rows::{PgRowGateway, RowGateway};
pub use table::{PgTableManager, TableManager};
pub use types::TypePolicy;

//! Round trips against a live PostgreSQL server.
//!
//! Set `SCHEMA_REGISTRY_TEST_DSN` (e.g.
//! `host=localhost user=postgres password=postgres dbname=registry_test`)
//! to run these; without it every test returns immediately.

use std::str::FromStr;

use schema_registry::{
    Config, DatabaseConfig, FieldDefinition, NewSchema, RegistryConfig, RegistryError, RowFilter,
    SchemaRegistry,
};
use serde_json::{json, Map, Value};
use serial_test::serial;
use tokio_postgres::config::Host;

const DSN_ENV: &str = "SCHEMA_REGISTRY_TEST_DSN";

fn test_config() -> Option<Config> {
    let dsn = std::env::var(DSN_ENV).ok()?;
    let pg = tokio_postgres::Config::from_str(&dsn).expect("invalid SCHEMA_REGISTRY_TEST_DSN");

    let host = match pg.get_hosts().first() {
        Some(Host::Tcp(h)) => h.clone(),
        _ => "localhost".to_string(),
    };
    let password = pg
        .get_password()
        .map(|p| String::from_utf8_lossy(p).into_owned())
        .unwrap_or_default();

    Some(Config {
        database: DatabaseConfig {
            host,
            port: pg.get_ports().first().copied().unwrap_or(5432),
            database: pg.get_dbname().unwrap_or("postgres").to_string(),
            user: pg.get_user().unwrap_or("postgres").to_string(),
            password,
            ssl_mode: "disable".to_string(),
            max_connections: 4,
            pool_timeout_secs: 10,
            statement_timeout_secs: 10,
        },
        registry: RegistryConfig {
            catalog_schema: "_schema_registry_test".to_string(),
            data_schema: "registry_test_data".to_string(),
            ..RegistryConfig::default()
        },
    })
}

async fn registry() -> Option<SchemaRegistry> {
    let config = test_config()?;
    let registry = SchemaRegistry::connect(&config).await.expect("connect");
    registry.init().await.expect("init");

    for schema in registry.list_schemas().await.expect("list") {
        registry.delete_schema(&schema.name).await.expect("cleanup");
    }
    Some(registry)
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}

fn invoices() -> NewSchema {
    NewSchema::new(
        "vendorInvoices",
        vec![
            FieldDefinition::new("invoiceNumber", "varchar(64)"),
            FieldDefinition::new("amount", "numeric(12,2)"),
            FieldDefinition::new("paid", "boolean"),
        ],
    )
}

#[tokio::test]
#[serial]
async fn test_init_is_idempotent() {
    let Some(registry) = registry().await else { return };
    registry.init().await.unwrap();
    registry.init().await.unwrap();
    assert!(registry.health_check().await.healthy);
}

#[tokio::test]
#[serial]
async fn test_create_find_and_duplicate() {
    let Some(registry) = registry().await else { return };

    let created = registry.create_schema(invoices()).await.unwrap();
    assert_eq!(created.table_name, "vendor_invoices");

    let found = registry.find_schema_by_name("vendorInvoices").await.unwrap();
    assert_eq!(found.id, created.id);
    assert_eq!(found.fields, created.fields);

    let err = registry.create_schema(invoices()).await.unwrap_err();
    assert!(matches!(err, RegistryError::Conflict(_)));
    assert_eq!(registry.list_schemas().await.unwrap().len(), 1);
    assert!(registry.audit().await.unwrap().is_clean());
}

#[tokio::test]
#[serial]
async fn test_insert_coerces_and_filters_by_owner() {
    let Some(registry) = registry().await else { return };
    registry.create_schema(invoices()).await.unwrap();

    for (owner, number, amount) in [
        ("alice", "A-1", json!(42)),
        ("alice", "A-2", json!("10.50")),
        ("bob", "B-1", json!(7.25)),
        ("bob", "B-2", json!(1)),
    ] {
        registry
            .insert_data(
                "vendorInvoices",
                owner,
                &object(json!({"invoiceNumber": number, "amount": amount, "paid": false})),
            )
            .await
            .unwrap();
    }

    let alice = registry
        .query_data("vendorInvoices", &RowFilter::owner("alice"))
        .await
        .unwrap();
    assert_eq!(alice.len(), 2);
    assert!(alice.iter().all(|r| r["owner"] == json!("alice")));

    let first = alice
        .iter()
        .find(|r| r["invoiceNumber"] == json!("A-1"))
        .unwrap();
    assert_eq!(first["amount"].as_f64(), Some(42.0));
    assert_eq!(first["paid"], json!(false));

    let all = registry
        .query_data("vendorInvoices", &RowFilter::all())
        .await
        .unwrap();
    assert_eq!(all.len(), 4);
}

#[tokio::test]
#[serial]
async fn test_missing_field_is_null_and_extra_keys_ignored() {
    let Some(registry) = registry().await else { return };
    registry.create_schema(invoices()).await.unwrap();

    registry
        .insert_data(
            "vendorInvoices",
            "user1",
            &object(json!({"amount": 5, "notAField": "x"})),
        )
        .await
        .unwrap();

    let rows = registry
        .query_data("vendorInvoices", &RowFilter::all())
        .await
        .unwrap();
    assert_eq!(rows[0]["invoiceNumber"], Value::Null);
    assert!(!rows[0].contains_key("notAField"));
}

#[tokio::test]
#[serial]
async fn test_bad_value_is_a_storage_error() {
    let Some(registry) = registry().await else { return };
    registry.create_schema(invoices()).await.unwrap();

    let err = registry
        .insert_data(
            "vendorInvoices",
            "user1",
            &object(json!({"amount": "not a number"})),
        )
        .await
        .unwrap_err();
    assert!(!err.is_client_error());
    assert!(!err.public_message().contains("not a number"));
}

#[tokio::test]
#[serial]
async fn test_delete_and_recreate_with_new_fields() {
    let Some(registry) = registry().await else { return };
    registry.create_schema(invoices()).await.unwrap();

    registry.delete_schema("vendorInvoices").await.unwrap();
    let err = registry.delete_schema("vendorInvoices").await.unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(_)));

    registry
        .create_schema(NewSchema::new(
            "vendorInvoices",
            vec![FieldDefinition::new("dueDate", "date")],
        ))
        .await
        .unwrap();
    registry
        .insert_data(
            "vendorInvoices",
            "user1",
            &object(json!({"dueDate": "2026-03-01"})),
        )
        .await
        .unwrap();

    let rows = registry
        .query_data("vendorInvoices", &RowFilter::all())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].len(), 3);
    assert_eq!(rows[0]["dueDate"], json!("2026-03-01"));
}

#[tokio::test]
#[serial]
async fn test_field_named_t_is_readable() {
    let Some(registry) = registry().await else { return };
    registry
        .create_schema(NewSchema::new(
            "letters",
            vec![
                FieldDefinition::new("t", "text"),
                FieldDefinition::new("amount", "numeric"),
            ],
        ))
        .await
        .unwrap();

    registry
        .insert_data("letters", "user1", &object(json!({"t": "x", "amount": 42})))
        .await
        .unwrap();

    let mine = registry
        .query_data("letters", &RowFilter::owner("user1"))
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["t"], json!("x"));
    assert_eq!(mine[0]["amount"].as_f64(), Some(42.0));

    let all = registry.query_data("letters", &RowFilter::all()).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_missing_or_null_field_takes_column_default() {
    let Some(registry) = registry().await else { return };
    registry
        .create_schema(NewSchema::new(
            "tickets",
            vec![
                FieldDefinition::new("seq", "serial"),
                FieldDefinition::new("priority", "integer DEFAULT 0"),
                FieldDefinition::new("note", "text"),
            ],
        ))
        .await
        .unwrap();

    registry
        .insert_data("tickets", "user1", &object(json!({"note": "a"})))
        .await
        .unwrap();
    registry
        .insert_data(
            "tickets",
            "user1",
            &object(json!({"seq": null, "priority": null, "note": "b"})),
        )
        .await
        .unwrap();
    registry
        .insert_data("tickets", "user1", &object(json!({"priority": 5})))
        .await
        .unwrap();

    let rows = registry.query_data("tickets", &RowFilter::all()).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r["seq"].as_i64().is_some()));

    let by_note = |note: Value| rows.iter().find(|r| r["note"] == note).unwrap();
    assert_eq!(by_note(json!("a"))["priority"], json!(0));
    assert_eq!(by_note(json!("b"))["priority"], json!(0));
    assert_eq!(by_note(Value::Null)["priority"], json!(5));
}

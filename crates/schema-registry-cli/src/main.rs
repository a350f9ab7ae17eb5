//! schema-registry CLI - manage runtime-defined schemas and their rows.

use clap::{Parser, Subcommand};
use schema_registry::{
    Config, FieldDefinition, HealthStatus, NewSchema, RegistryError, RowFilter, SchemaDefinition,
    SchemaRegistry,
};
use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Exit code used when a command is interrupted by a signal.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "schema-registry")]
#[command(about = "Runtime-defined schemas materialized as PostgreSQL tables")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the catalog and data namespaces
    Init,

    /// Declare a schema and create its table
    Create {
        /// Schema name
        name: String,

        /// Field as name:type, e.g. --field amount:numeric (repeatable)
        #[arg(short, long = "field", value_parser = parse_field, required = true)]
        fields: Vec<FieldDefinition>,
    },

    /// List declared schemas
    List,

    /// Show one schema
    Get {
        /// Schema name
        name: String,
    },

    /// Delete a schema and drop its table
    Delete {
        /// Schema name
        name: String,
    },

    /// List a schema's field names in declared order
    Fields {
        /// Schema name
        name: String,
    },

    /// Insert one row into a schema
    Insert {
        /// Schema name
        name: String,

        /// Owner of the row
        #[arg(long)]
        owner: String,

        /// Row values as a JSON object keyed by field name
        #[arg(long)]
        values: String,
    },

    /// Query a schema's rows
    Query {
        /// Schema name
        name: String,

        /// Only rows belonging to this owner
        #[arg(long)]
        owner: Option<String>,
    },

    /// Compare catalog records with the live tables
    Audit,

    /// Test the database connection
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), RegistryError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(RegistryError::Config)?;

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let cancel_token = setup_signal_handler();
    let output_json = cli.output_json;

    if let Commands::HealthCheck = cli.command {
        return until_cancelled(&cancel_token, health_check(&config, output_json)).await;
    }

    until_cancelled(&cancel_token, async {
        let registry = SchemaRegistry::connect(&config).await?;
        execute(&registry, cli.command, output_json).await
    })
    .await
}

async fn execute(
    registry: &SchemaRegistry,
    command: Commands,
    output_json: bool,
) -> Result<(), RegistryError> {
    match command {
        Commands::Init => {
            registry.init().await?;
            println!("Schema registry initialized");
        }

        Commands::Create { name, fields } => {
            let definition = registry.create_schema(NewSchema::new(name, fields)).await?;
            if output_json {
                println!("{}", serde_json::to_string_pretty(&definition)?);
            } else {
                println!(
                    "Created schema '{}' (table '{}')",
                    definition.name, definition.table_name
                );
            }
        }

        Commands::List => {
            let schemas = registry.list_schemas().await?;
            if output_json {
                println!("{}", serde_json::to_string_pretty(&schemas)?);
            } else if schemas.is_empty() {
                println!("No schemas declared");
            } else {
                for schema in &schemas {
                    println!(
                        "{}  table={}  fields={}",
                        schema.name,
                        schema.table_name,
                        schema.fields.len()
                    );
                }
            }
        }

        Commands::Get { name } => {
            let schema = registry.find_schema_by_name(&name).await?;
            if output_json {
                println!("{}", serde_json::to_string_pretty(&schema)?);
            } else {
                print_schema(&schema);
            }
        }

        Commands::Delete { name } => {
            registry.delete_schema(&name).await?;
            println!("Deleted schema '{}'", name);
        }

        Commands::Fields { name } => {
            let fields = registry.get_fields(&name).await?;
            if output_json {
                println!("{}", serde_json::to_string_pretty(&fields)?);
            } else {
                for field in fields {
                    println!("{}", field);
                }
            }
        }

        Commands::Insert {
            name,
            owner,
            values,
        } => {
            let values = match serde_json::from_str::<Value>(&values)? {
                Value::Object(map) => map,
                _ => {
                    return Err(RegistryError::InvalidRequest(
                        "--values must be a JSON object".to_string(),
                    ))
                }
            };
            let id = registry.insert_data(&name, &owner, &values).await?;
            if output_json {
                println!("{}", serde_json::json!({ "id": id }));
            } else {
                println!("Inserted row {}", id);
            }
        }

        Commands::Query { name, owner } => {
            let filter = RowFilter { owner };
            let rows = registry.query_data(&name, &filter).await?;
            if output_json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for row in &rows {
                    println!("{}", serde_json::to_string(row)?);
                }
                println!("({} rows)", rows.len());
            }
        }

        Commands::Audit => {
            let report = registry.audit().await?;
            if output_json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Audit Results:");
                println!("  Orphaned tables: {:?}", report.orphaned_tables);
                println!("  Missing tables: {:?}", report.missing_tables);
                println!(
                    "\n  Overall: {}",
                    if report.is_clean() { "CLEAN" } else { "DRIFT" }
                );
            }
        }

        Commands::HealthCheck => unreachable!(), // Handled in run()
    }

    Ok(())
}

/// Connect and print the status; a failed connection is printed before it
/// becomes the exit status.
async fn health_check(config: &Config, output_json: bool) -> Result<(), RegistryError> {
    let result = match SchemaRegistry::connect(config).await {
        Ok(registry) => registry.health_check().await,
        Err(e) => HealthStatus {
            healthy: false,
            backend: "postgres".to_string(),
            latency_ms: 0,
            error: Some(e.public_message()),
        },
    };

    if output_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Health Check Results:");
        println!(
            "  PostgreSQL ({}): {} ({}ms)",
            config.database.display_target(),
            if result.healthy { "OK" } else { "FAILED" },
            result.latency_ms
        );
        if let Some(ref err) = result.error {
            println!("    Error: {}", err);
        }
        println!(
            "\n  Overall: {}",
            if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
        );
    }

    if !result.healthy {
        let reason = result.error.as_deref().unwrap_or("database unreachable");
        return Err(RegistryError::pool(reason, "running health check"));
    }
    Ok(())
}

fn print_schema(schema: &SchemaDefinition) {
    println!("Schema: {}", schema.name);
    println!("  ID: {}", schema.id);
    println!("  Table: {}", schema.table_name);
    println!("  Created: {}", schema.created_at);
    println!("  Fields:");
    for field in &schema.fields {
        println!("    {} ({}) -> {}", field.name, field.sql_type, field.column_name());
    }
}

/// Parse a `name:type` field argument.
fn parse_field(s: &str) -> Result<FieldDefinition, String> {
    match s.split_once(':') {
        Some((name, sql_type)) if !name.is_empty() && !sql_type.trim().is_empty() => {
            Ok(FieldDefinition::new(name, sql_type.trim()))
        }
        _ => Err(format!("expected name:type, got {:?}", s)),
    }
}

/// Run `fut` unless a shutdown signal arrives first.
async fn until_cancelled<F>(token: &CancellationToken, fut: F) -> Result<(), RegistryError>
where
    F: Future<Output = Result<(), RegistryError>>,
{
    tokio::select! {
        result = fut => result,
        _ = token.cancelled() => {
            eprintln!("Interrupted; the command was abandoned and may have partially completed");
            std::process::exit(EXIT_INTERRUPTED as i32);
        }
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => return Err(format!("Invalid verbosity '{}'", other)),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("Invalid log format '{}'", other)),
    }

    Ok(())
}

/// Cancel the returned token on SIGINT or SIGTERM.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for (kind, label) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let token = cancel_token.clone();
        match signal(kind) {
            Ok(mut stream) => {
                tokio::spawn(async move {
                    stream.recv().await;
                    eprintln!("\nReceived {}. Shutting down...", label);
                    token.cancel();
                });
            }
            Err(e) => eprintln!("Failed to install {} handler: {}", label, e),
        }
    }

    cancel_token
}

/// Cancel the returned token on Ctrl-C.
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Shutting down...");
            token.cancel();
        }
    });

    cancel_token
}

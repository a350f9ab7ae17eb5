//! CLI integration tests for schema-registry.
//!
//! These tests cover argument parsing, help output, and exit codes for
//! configuration and connection errors. None of them need a running database.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

/// Get a command for the schema-registry binary.
fn cmd() -> Command {
    Command::cargo_bin("schema-registry").unwrap()
}

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("delete"))
        .stdout(predicate::str::contains("fields"))
        .stdout(predicate::str::contains("insert"))
        .stdout(predicate::str::contains("query"))
        .stdout(predicate::str::contains("audit"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_create_subcommand_help() {
    cmd()
        .args(["create", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--field"))
        .stdout(predicate::str::contains("name:type"));
}

#[test]
fn test_insert_subcommand_help() {
    cmd()
        .args(["insert", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--owner"))
        .stdout(predicate::str::contains("--values"));
}

#[test]
fn test_query_subcommand_help() {
    cmd()
        .args(["query", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--owner"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("schema-registry"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_global_flags_and_defaults() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-json"))
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("--verbosity"))
        .stdout(predicate::str::contains("[default: info]"))
        .stdout(predicate::str::contains("[default: config.yaml]"));
}

#[test]
fn test_short_config_flag() {
    cmd().args(["-c", "some_config.yaml", "--help"]).assert().success();
}

// =============================================================================
// Argument Validation Tests
// =============================================================================

#[test]
fn test_create_requires_a_field() {
    cmd()
        .args(["create", "invoices"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--field"));
}

#[test]
fn test_create_rejects_malformed_field() {
    cmd()
        .args(["create", "invoices", "--field", "amount"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected name:type"));
}

#[test]
fn test_insert_requires_owner() {
    cmd()
        .args(["insert", "invoices", "--values", "{}"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--owner"));
}

#[test]
fn test_no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

// =============================================================================
// Exit Code Tests
// =============================================================================

#[test]
fn test_missing_config_exits_with_code_1() {
    // Missing file is an IO error (code 1), not a config error (code 2)
    cmd()
        .args(["--config", "nonexistent_config_file.yaml", "list"])
        .assert()
        .code(1);
}

#[test]
fn test_invalid_yaml_exits_with_code_2() {
    let file = config_file("invalid: yaml: content: [\n");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "list"])
        .assert()
        .code(2);
}

#[test]
fn test_empty_config_exits_with_code_2() {
    let file = config_file("");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(2);
}

#[test]
fn test_missing_required_fields_exits_with_code_2() {
    let file = config_file("database:\n  host: localhost\n");

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "list"])
        .assert()
        .code(2);
}

#[test]
fn test_invalid_registry_settings_exit_with_code_2() {
    let file = config_file(
        "database:\n  host: localhost\n  database: registry\n  user: postgres\n\
         registry:\n  data_schema: \"bad name\"\n",
    );

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("data_schema"));
}

#[test]
fn test_invalid_verbosity_exits_with_code_2() {
    cmd()
        .args(["--verbosity", "loud", "list"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Invalid verbosity"));
}

#[test]
fn test_unreachable_database_health_check_exits_with_code_6() {
    let file = config_file(
        "database:\n  host: 127.0.0.1\n  port: 1\n  database: registry\n  user: postgres\n\
         \x20 ssl_mode: disable\n  pool_timeout_secs: 1\n",
    );

    cmd()
        .args(["--config", file.path().to_str().unwrap(), "health-check"])
        .assert()
        .code(6)
        .stdout(predicate::str::contains("UNHEALTHY"));
}

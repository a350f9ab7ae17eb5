//! Field type tokens and the policy that screens them.
//!
//! Field types are native PostgreSQL type strings supplied by the caller and
//! interpolated into `CREATE TABLE`. They cannot be parameterized, so every
//! token is screened before it reaches DDL. [`TypePolicy::Permissive`] only
//! rejects tokens that could break out of the column definition;
//! [`TypePolicy::Strict`] additionally requires a known PostgreSQL type.

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

/// Longest type token accepted by either policy.
const MAX_TYPE_LENGTH: usize = 128;

/// Base type names accepted under [`TypePolicy::Strict`].
///
/// Matched case-insensitively against the token with any `(...)` modifier
/// and trailing `[]` removed.
const ALLOWED_TYPES: &[&str] = &[
    "bigint",
    "bigserial",
    "bit",
    "bool",
    "boolean",
    "bytea",
    "char",
    "character",
    "character varying",
    "date",
    "decimal",
    "double precision",
    "float4",
    "float8",
    "inet",
    "int",
    "int2",
    "int4",
    "int8",
    "integer",
    "interval",
    "json",
    "jsonb",
    "money",
    "numeric",
    "real",
    "serial",
    "smallint",
    "text",
    "time",
    "timestamp",
    "timestamptz",
    "timestamp with time zone",
    "timestamp without time zone",
    "uuid",
    "varchar",
];

/// How field type tokens are screened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypePolicy {
    /// Any token that passes the injection screen.
    #[default]
    Permissive,

    /// Only tokens whose base type is in the built-in allow-list.
    Strict,
}

impl TypePolicy {
    /// Check a field's type token under this policy.
    pub fn check(&self, field: &str, sql_type: &str) -> Result<()> {
        screen_type_token(field, sql_type)?;

        if *self == TypePolicy::Strict {
            let base = base_type(sql_type);
            if !ALLOWED_TYPES.contains(&base.as_str()) {
                return Err(invalid(
                    field,
                    sql_type,
                    format!("type {:?} is not in the allowed type list", base),
                ));
            }
        }

        Ok(())
    }
}

/// Reject type tokens that could terminate or extend the column definition.
///
/// Rejected: empty tokens, null bytes, semicolons, SQL comment markers,
/// quotes, commas outside of parentheses, and unbalanced parentheses.
pub fn screen_type_token(field: &str, sql_type: &str) -> Result<()> {
    let token = sql_type.trim();

    if token.is_empty() {
        return Err(invalid(field, sql_type, "type cannot be empty"));
    }

    if token.len() > MAX_TYPE_LENGTH {
        return Err(invalid(
            field,
            sql_type,
            format!("type exceeds {} characters", MAX_TYPE_LENGTH),
        ));
    }

    if token.contains('\0') {
        return Err(invalid(field, sql_type, "type contains a null byte"));
    }

    if token.contains(';') {
        return Err(invalid(field, sql_type, "type contains a semicolon"));
    }

    if token.contains("--") || token.contains("/*") || token.contains("*/") {
        return Err(invalid(field, sql_type, "type contains SQL comment markers"));
    }

    if token.contains('\'') || token.contains('"') || token.contains('`') {
        return Err(invalid(field, sql_type, "type contains quote characters"));
    }

    let mut depth: i32 = 0;
    for c in token.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(invalid(field, sql_type, "type has unbalanced parentheses"));
                }
            }
            ',' if depth == 0 => {
                return Err(invalid(
                    field,
                    sql_type,
                    "type contains a comma outside of a type modifier",
                ));
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(invalid(field, sql_type, "type has unbalanced parentheses"));
    }

    Ok(())
}

/// Lowercased base name of a type token: `NUMERIC(10, 2)` -> `numeric`,
/// `varchar(255)[]` -> `varchar`.
pub fn base_type(sql_type: &str) -> String {
    let token = sql_type.trim();
    let token = token.strip_suffix("[]").unwrap_or(token);
    let base = match token.find('(') {
        Some(idx) => &token[..idx],
        None => token,
    };
    base.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn invalid(field: &str, sql_type: &str, reason: impl Into<String>) -> RegistryError {
    RegistryError::InvalidFieldType {
        field: field.to_string(),
        sql_type: sql_type.to_string(),
        reason: reason.into(),
    }
}

//! Identifier validation, sanitization, and quoting.
//!
//! Table and column names cannot be bound as statement parameters, so every
//! identifier that reaches a SQL string goes through this module:
//!
//! 1. [`validate_identifier`] accepts only `^[A-Za-z_][A-Za-z0-9_]*$`. This is
//!    the gate that keeps caller input out of the SQL grammar.
//! 2. [`sanitize`] maps the caller's name onto the physical snake_case name
//!    used for the table or column. The catalog keeps the caller's name; the
//!    database only ever sees the sanitized one.
//! 3. [`quote_pg`] wraps the physical name in double quotes when it is
//!    interpolated.
//!
//! `sanitize` is not injective (`fooBar` and `foo_bar` both become
//! `foo_bar`), so callers that accept several names at once must check the
//! sanitized forms for collisions; see [`physical_names`].

use std::collections::HashMap;

use crate::error::{RegistryError, Result};

/// PostgreSQL truncates identifiers longer than 63 bytes (NAMEDATALEN - 1).
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Columns every dynamic table carries in addition to the declared fields.
pub const RESERVED_COLUMNS: &[&str] = &["id", "owner"];

/// Validate a caller-supplied schema or field name.
///
/// `kind` names what is being validated ("schema", "field") and only feeds
/// the error message.
pub fn validate_identifier(kind: &'static str, name: &str) -> Result<()> {
    let mut chars = name.chars();

    let first = match chars.next() {
        Some(c) => c,
        None => {
            return Err(RegistryError::invalid_identifier(
                kind,
                name,
                "identifier cannot be empty",
            ))
        }
    };

    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(RegistryError::invalid_identifier(
            kind,
            name,
            "must start with a letter or underscore",
        ));
    }

    if let Some(bad) = chars.find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(RegistryError::invalid_identifier(
            kind,
            name,
            format!(
                "contains {:?}; only letters, digits and underscores are allowed",
                bad
            ),
        ));
    }

    let physical = sanitize(name);
    if physical.len() > MAX_IDENTIFIER_LENGTH {
        return Err(RegistryError::invalid_identifier(
            kind,
            name,
            format!(
                "physical name {:?} exceeds {} bytes",
                physical, MAX_IDENTIFIER_LENGTH
            ),
        ));
    }

    Ok(())
}

/// Convert a name to its physical snake_case form.
///
/// Deterministic and total: any input produces an output. Word boundaries
/// are inserted before an uppercase letter that follows a lowercase letter
/// or digit, and before the last capital of an acronym that is followed by
/// a lowercase letter (`HTTPStatus` -> `http_status`).
pub fn sanitize(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next_is_lower = chars
                    .get(i + 1)
                    .map(|n| n.is_ascii_lowercase())
                    .unwrap_or(false);
                if prev.is_ascii_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_ascii_uppercase() && next_is_lower)
                {
                    out.push('_');
                }
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}

/// Validate a name and return its physical form.
pub fn physical_name(kind: &'static str, name: &str) -> Result<String> {
    validate_identifier(kind, name)?;
    Ok(sanitize(name))
}

/// Validate a list of field names and return their physical column names
/// in the same order.
///
/// Rejects two fields that map to the same column and fields that map onto
/// a reserved column.
pub fn physical_names<'a, I>(names: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashMap<String, &'a str> = HashMap::new();
    let mut columns = Vec::new();

    for name in names {
        let column = physical_name("field", name)?;

        if RESERVED_COLUMNS.contains(&column.as_str()) {
            return Err(RegistryError::invalid_identifier(
                "field",
                name,
                format!("column {:?} is reserved", column),
            ));
        }

        if let Some(previous) = seen.insert(column.clone(), name) {
            return Err(RegistryError::invalid_identifier(
                "field",
                name,
                format!("collides with field {:?} (both map to column {:?})", previous, column),
            ));
        }

        columns.push(column);
    }

    Ok(columns)
}

/// Quote a PostgreSQL identifier.
///
/// Escapes double quotes by doubling them and wraps in double quotes.
/// Rejects empty names and null bytes, which no quoting can make safe.
pub fn quote_pg(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(RegistryError::invalid_identifier(
            "identifier",
            name,
            "identifier cannot be empty",
        ));
    }
    if name.contains('\0') {
        return Err(RegistryError::invalid_identifier(
            "identifier",
            name,
            "identifier contains a null byte",
        ));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Qualify a PostgreSQL table name with its namespace.
pub fn qualify_pg(namespace: &str, table: &str) -> Result<String> {
    Ok(format!("{}.{}", quote_pg(namespace)?, quote_pg(table)?))
}

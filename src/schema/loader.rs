//! Schema document loading.
//!
//! # Responsibilities
//! - Deserialize the `[schema]` header and the `[[table]]` / `[[table.field]]`
//!   blocks from a generic value tree
//! - Resolve type names, compile pattern constraints, parse `required_if`
//! - Reject duplicate fields and ambiguous table patterns
//!
//! # Design Decisions
//! - Fail fast: a malformed schema is an authoring bug, nothing can be
//!   validated against it
//! - Unknown keys in the schema document are ignored, like in configuration
//!   documents

use std::collections::HashSet;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use toml::{Table, Value};

use crate::schema::model::{Condition, FieldSpec, FieldType, SchemaDocument, TableSpec};
use crate::schema::pattern::TablePattern;

/// Errors that make a schema document unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaLoadError {
    /// A table declares the same field name twice.
    #[error("table `{table}` declares field `{field}` more than once")]
    DuplicateField { table: String, field: String },

    /// Two table names can match the same concrete table.
    #[error("table `{first}` and table `{second}` can match the same table name")]
    AmbiguousPattern { first: String, second: String },

    /// A `pattern_constraint` is not a valid regular expression.
    #[error("table `{table}` has an invalid pattern_constraint `{pattern}`: {reason}")]
    InvalidRegex {
        table: String,
        pattern: String,
        reason: String,
    },

    /// A field or array item type is not one of the known type names.
    #[error("field `{table}.{field}` has unknown type `{type_name}`")]
    UnknownType {
        table: String,
        field: String,
        type_name: String,
    },

    /// `schema.version` is not `MAJOR.MINOR.PATCH`.
    #[error("schema version `{0}` is not a semantic version")]
    InvalidVersion(String),

    /// A `required_if` expression is not `<field> == <literal>`.
    #[error("field `{table}.{field}` has an invalid required_if `{expression}`")]
    InvalidCondition {
        table: String,
        field: String,
        expression: String,
    },

    /// A table name or its `pattern` flag is unusable.
    #[error("table `{table}` has an invalid name: {reason}")]
    InvalidPattern { table: String, reason: String },

    /// The document does not have the shape of a schema.
    #[error("malformed schema document: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct RawSchema {
    schema: RawHeader,
    #[serde(default, rename = "table")]
    tables: Vec<RawTable>,
}

#[derive(Debug, Deserialize)]
struct RawHeader {
    version: String,
}

#[derive(Debug, Deserialize)]
struct RawTable {
    name: String,
    #[serde(default)]
    required: bool,
    pattern: Option<bool>,
    pattern_constraint: Option<String>,
    description: Option<String>,
    #[serde(default, rename = "field")]
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    required: bool,
    required_if: Option<String>,
    #[serde(rename = "enum")]
    allowed: Option<Vec<Value>>,
    min: Option<f64>,
    max: Option<f64>,
    min_items: Option<usize>,
    max_items: Option<usize>,
    array_item_type: Option<String>,
    default: Option<Value>,
    description: Option<String>,
}

/// Build a [`SchemaDocument`] from a parsed schema tree.
pub fn load(raw: &Table) -> Result<SchemaDocument, SchemaLoadError> {
    let raw: RawSchema = Value::Table(raw.clone())
        .try_into()
        .map_err(|e: toml::de::Error| SchemaLoadError::Malformed(e.message().to_string()))?;

    let version = raw
        .schema
        .version
        .parse()
        .map_err(|_| SchemaLoadError::InvalidVersion(raw.schema.version.clone()))?;

    let tables = raw
        .tables
        .into_iter()
        .map(load_table)
        .collect::<Result<Vec<_>, _>>()?;

    check_ambiguity(&tables)?;

    tracing::debug!(
        version = %version,
        tables = tables.len(),
        "Schema document loaded"
    );

    Ok(SchemaDocument { version, tables })
}

impl SchemaDocument {
    /// Parse and load a schema document from TOML text.
    pub fn from_toml_str(source: &str) -> Result<Self, SchemaLoadError> {
        let raw: Table = toml::from_str(source)
            .map_err(|e| SchemaLoadError::Malformed(e.message().to_string()))?;
        load(&raw)
    }
}

fn load_table(raw: RawTable) -> Result<TableSpec, SchemaLoadError> {
    let pattern = TablePattern::parse(&raw.name).map_err(|e| SchemaLoadError::InvalidPattern {
        table: raw.name.clone(),
        reason: e.to_string(),
    })?;

    match raw.pattern {
        Some(true) if !pattern.is_pattern() => {
            return Err(SchemaLoadError::InvalidPattern {
                table: raw.name,
                reason: "pattern = true but the name has no `*` segment".to_string(),
            });
        }
        Some(false) if pattern.is_pattern() => {
            return Err(SchemaLoadError::InvalidPattern {
                table: raw.name,
                reason: "pattern = false but the name has a `*` segment".to_string(),
            });
        }
        _ => {}
    }

    let pattern_constraint = match raw.pattern_constraint {
        Some(_) if !pattern.is_pattern() => {
            return Err(SchemaLoadError::InvalidPattern {
                table: raw.name,
                reason: "pattern_constraint on a table without a `*` segment".to_string(),
            });
        }
        Some(expr) => Some(Regex::new(&expr).map_err(|e| SchemaLoadError::InvalidRegex {
            table: raw.name.clone(),
            pattern: expr.clone(),
            reason: e.to_string(),
        })?),
        None => None,
    };

    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(raw.fields.len());
    for field in raw.fields {
        if !seen.insert(field.name.clone()) {
            return Err(SchemaLoadError::DuplicateField {
                table: raw.name,
                field: field.name,
            });
        }
        fields.push(load_field(&raw.name, field)?);
    }

    Ok(TableSpec {
        name: raw.name,
        pattern,
        pattern_constraint,
        required: raw.required,
        description: raw.description,
        fields,
    })
}

fn load_field(table: &str, raw: RawField) -> Result<FieldSpec, SchemaLoadError> {
    let unknown = |type_name: &str| SchemaLoadError::UnknownType {
        table: table.to_string(),
        field: raw.name.clone(),
        type_name: type_name.to_string(),
    };

    let field_type = FieldType::from_name(&raw.type_name).ok_or_else(|| unknown(&raw.type_name))?;
    let item_type = match &raw.array_item_type {
        Some(name) => Some(FieldType::from_name(name).ok_or_else(|| unknown(name))?),
        None => None,
    };

    let required_if = match &raw.required_if {
        Some(expr) => Some(Condition::parse(expr).ok_or_else(|| SchemaLoadError::InvalidCondition {
            table: table.to_string(),
            field: raw.name.clone(),
            expression: expr.clone(),
        })?),
        None => None,
    };

    Ok(FieldSpec {
        name: raw.name,
        field_type,
        required: raw.required,
        required_if,
        allowed: raw.allowed,
        min: raw.min,
        max: raw.max,
        min_items: raw.min_items,
        max_items: raw.max_items,
        item_type,
        default: raw.default,
        description: raw.description,
    })
}

/// Two literal names that are equal, or two patterns that can cover the same
/// name, are ambiguous. A literal covered by a pattern is not: the literal
/// claims that table.
fn check_ambiguity(tables: &[TableSpec]) -> Result<(), SchemaLoadError> {
    for (i, first) in tables.iter().enumerate() {
        for second in &tables[i + 1..] {
            let both_literal = !first.is_pattern() && !second.is_pattern();
            let both_pattern = first.is_pattern() && second.is_pattern();
            if (both_literal || both_pattern) && first.pattern.overlaps(&second.pattern) {
                return Err(SchemaLoadError::AmbiguousPattern {
                    first: first.name.clone(),
                    second: second.name.clone(),
                });
            }
        }
    }
    Ok(())
}

//! Schema model types.
//!
//! Everything here is immutable once built by [`crate::schema::load`].

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use toml::{Table, Value};

use crate::schema::pattern::TablePattern;

/// `MAJOR.MINOR.PATCH` version carried by every schema document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl FromStr for SemanticVersion {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');
        let mut next = || -> Result<u64, ()> {
            let part = parts.next().ok_or(())?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(());
            }
            part.parse().map_err(|_| ())
        };
        let version = Self {
            major: next()?,
            minor: next()?,
            patch: next()?,
        };
        if parts.next().is_some() {
            return Err(());
        }
        Ok(version)
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// The closed set of value types a field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Integer,
    Boolean,
    Float,
    Array,
    Table,
}

impl FieldType {
    /// Parse a type name as written in a schema document.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "boolean" => Some(Self::Boolean),
            "float" => Some(Self::Float),
            "array" => Some(Self::Array),
            "table" => Some(Self::Table),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Float => "float",
            Self::Array => "array",
            Self::Table => "table",
        }
    }

    /// Returns true if `value` has this type. Integers are accepted as floats.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_str(),
            Self::Integer => value.is_integer(),
            Self::Boolean => value.is_bool(),
            Self::Float => value.is_float() || value.is_integer(),
            Self::Array => value.is_array(),
            Self::Table => value.is_table(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A `required_if` expression: `<sibling_field> == <literal>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub expected: Value,
}

impl Condition {
    /// Parse a condition expression. Returns `None` if it is not of the form
    /// `<field> == <literal>`.
    pub fn parse(expr: &str) -> Option<Self> {
        let (field, literal) = expr.split_once("==")?;
        let field = field.trim();
        if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return None;
        }
        let expected = parse_literal(literal.trim())?;
        Some(Self {
            field: field.to_string(),
            expected,
        })
    }

    /// Evaluate against a table instance. An absent sibling makes the
    /// condition false.
    pub fn holds(&self, instance: &Table) -> bool {
        instance
            .get(&self.field)
            .map(|actual| literal_eq(actual, &self.expected))
            .unwrap_or(false)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} == {}", self.field, self.expected)
    }
}

/// Parse a literal on the right-hand side of a condition.
fn parse_literal(raw: &str) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }
    match raw {
        "true" => return Some(Value::Boolean(true)),
        "false" => return Some(Value::Boolean(false)),
        _ => {}
    }
    for quote in ['"', '\''] {
        if raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote) {
            return Some(Value::String(raw[1..raw.len() - 1].to_string()));
        }
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Some(Value::Integer(i));
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Some(Value::Float(f));
    }
    if raw.contains(char::is_whitespace) {
        return None;
    }
    // Bare words compare as strings.
    Some(Value::String(raw.to_string()))
}

/// Literal equality used by enums and conditions. Integers and floats
/// compare numerically.
pub(crate) fn literal_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(x), Value::Float(y)) | (Value::Float(y), Value::Integer(x)) => (*x as f64) == *y,
        _ => a == b,
    }
}

/// Declared constraints for one field of a table.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub required_if: Option<Condition>,
    /// Allowed literals (`enum` in the schema document).
    pub allowed: Option<Vec<Value>>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub item_type: Option<FieldType>,
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl FieldSpec {
    /// A field with only a name and a type; every constraint unset.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            required_if: None,
            allowed: None,
            min: None,
            max: None,
            min_items: None,
            max_items: None,
            item_type: None,
            default: None,
            description: None,
        }
    }
}

/// Declared shape of one table, or of every table a pattern covers.
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub name: String,
    pub pattern: TablePattern,
    /// Restricts the key matched by the wildcard segment.
    pub pattern_constraint: Option<Regex>,
    pub required: bool,
    pub description: Option<String>,
    pub fields: Vec<FieldSpec>,
}

impl TableSpec {
    pub fn is_pattern(&self) -> bool {
        self.pattern.is_pattern()
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A loaded schema document.
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    pub version: SemanticVersion,
    pub tables: Vec<TableSpec>,
}

impl SchemaDocument {
    /// Look up a table spec by its declared name (`network.*`, `proxy`).
    pub fn table(&self, name: &str) -> Option<&TableSpec> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// The spec that governs the concrete table at `path`. A literal spec wins
    /// over a pattern that also covers the path.
    pub fn spec_for(&self, path: &str) -> Option<&TableSpec> {
        self.tables
            .iter()
            .find(|t| !t.is_pattern() && t.name == path)
            .or_else(|| self.tables.iter().find(|t| t.is_pattern() && t.pattern.matches(path)))
    }

    /// Schema `default` values for the table at `path`, in field order.
    pub fn defaults_for(&self, path: &str) -> Table {
        let mut defaults = Table::new();
        if let Some(spec) = self.spec_for(path) {
            for field in &spec.fields {
                if let Some(value) = &field.default {
                    defaults.insert(field.name.clone(), value.clone());
                }
            }
        }
        defaults
    }
}

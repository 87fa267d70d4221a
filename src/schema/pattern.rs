//! Table name patterns.
//!
//! # Responsibilities
//! - Parse dotted table names (`proxy`, `network.*`, `peers.*.connection`)
//! - Enumerate the table instances a pattern covers in a value tree
//! - Decide whether two patterns can claim the same table name
//!
//! # Design Decisions
//! - At most one wildcard segment; it matches exactly one key
//! - Literal segments around the wildcard must match exactly
//! - Only table-valued keys are instances of a wildcard segment; scalar keys
//!   next to them are fields of the parent table

use std::fmt;

use thiserror::Error;
use toml::{Table, Value};

/// One dotted segment of a table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Wildcard,
}

/// Reasons a table name cannot be used as a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("table name is empty")]
    Empty,

    #[error("table name contains an empty segment")]
    EmptySegment,

    #[error("table name contains more than one wildcard segment")]
    MultipleWildcards,

    #[error("segment `{0}` mixes a wildcard with literal text")]
    PartialWildcard(String),
}

/// A parsed table name, literal or with a single wildcard segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePattern {
    segments: Vec<Segment>,
}

/// What sits at a path the pattern covers.
#[derive(Debug, Clone, Copy)]
pub enum InstanceNode<'a> {
    Table(&'a Table),
    NotTable(&'a Value),
}

/// A concrete table in a value tree covered by a pattern.
#[derive(Debug, Clone)]
pub struct TableInstance<'a> {
    /// Dotted path of the instance (`network.vpn`).
    pub path: String,
    /// The key the wildcard segment matched, if the pattern has one.
    pub wildcard: Option<&'a str>,
    pub node: InstanceNode<'a>,
}

impl TablePattern {
    /// Parse a dotted table name.
    pub fn parse(name: &str) -> Result<Self, PatternError> {
        if name.trim().is_empty() {
            return Err(PatternError::Empty);
        }

        let mut segments = Vec::new();
        let mut wildcards = 0;
        for part in name.split('.') {
            let part = part.trim();
            if part.is_empty() {
                return Err(PatternError::EmptySegment);
            }
            if part == "*" {
                wildcards += 1;
                segments.push(Segment::Wildcard);
            } else if part.contains('*') {
                return Err(PatternError::PartialWildcard(part.to_string()));
            } else {
                segments.push(Segment::Literal(part.to_string()));
            }
        }

        if wildcards > 1 {
            return Err(PatternError::MultipleWildcards);
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True if the name contains a wildcard segment.
    pub fn is_pattern(&self) -> bool {
        self.segments.iter().any(|s| *s == Segment::Wildcard)
    }

    /// Returns true if the dotted `name` is covered by this pattern.
    pub fn matches(&self, name: &str) -> bool {
        let parts: Vec<&str> = name.split('.').collect();
        parts.len() == self.segments.len()
            && self.segments.iter().zip(parts).all(|(segment, part)| match segment {
                Segment::Literal(lit) => lit == part,
                Segment::Wildcard => true,
            })
    }

    /// Returns true if some table name could be matched by both patterns.
    pub fn overlaps(&self, other: &TablePattern) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    _ => true,
                })
    }

    /// Enumerate every instance of this pattern in `tree`, in document order.
    pub fn instances<'a>(&self, tree: &'a Table) -> Vec<TableInstance<'a>> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.collect(tree, 0, &mut path, None, &mut out);
        out
    }

    fn collect<'a>(
        &self,
        table: &'a Table,
        depth: usize,
        path: &mut Vec<String>,
        wildcard: Option<&'a str>,
        out: &mut Vec<TableInstance<'a>>,
    ) {
        match &self.segments[depth] {
            Segment::Literal(name) => {
                if let Some(value) = table.get(name.as_str()) {
                    self.step(name, value, depth, path, wildcard, out);
                }
            }
            Segment::Wildcard => {
                for (key, value) in table.iter() {
                    if value.is_table() {
                        self.step(key, value, depth, path, Some(key.as_str()), out);
                    }
                }
            }
        }
    }

    fn step<'a>(
        &self,
        name: &str,
        value: &'a Value,
        depth: usize,
        path: &mut Vec<String>,
        wildcard: Option<&'a str>,
        out: &mut Vec<TableInstance<'a>>,
    ) {
        path.push(name.to_string());
        if depth + 1 == self.segments.len() {
            let node = match value.as_table() {
                Some(table) => InstanceNode::Table(table),
                None => InstanceNode::NotTable(value),
            };
            out.push(TableInstance {
                path: path.join("."),
                wildcard,
                node,
            });
        } else if let Some(child) = value.as_table() {
            self.collect(child, depth + 1, path, wildcard, out);
        }
        path.pop();
    }
}

impl fmt::Display for TablePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                Segment::Literal(name) => f.write_str(name)?,
                Segment::Wildcard => f.write_str("*")?,
            }
        }
        Ok(())
    }
}

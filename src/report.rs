//! Error reporting.
//!
//! # Responsibilities
//! - Merge validation and reference errors into one ordered report
//! - Expose a validity flag, an error count and an exit code
//! - Render as text for the CLI and as JSON for dry-run responses
//!
//! # Design Decisions
//! - Validation errors come first (schema table order), then reference errors
//!   (component declaration order)
//! - Ordering is deterministic; identical input gives an identical report
//! - Nothing is summarized away: one entry per error

use std::fmt;

use serde::Serialize;

use crate::resolve::ReferenceError;
use crate::validation::ValidationError;

/// Machine-readable error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    MissingTable,
    MissingField,
    TypeMismatch,
    EnumViolation,
    RangeViolation,
    ArrayLengthViolation,
    ArrayItemTypeViolation,
    PatternMismatch,
    UnresolvedReference,
    ReferenceTypeMismatch,
    ReferenceCycle,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingTable => "MissingTable",
            Self::MissingField => "MissingField",
            Self::TypeMismatch => "TypeMismatch",
            Self::EnumViolation => "EnumViolation",
            Self::RangeViolation => "RangeViolation",
            Self::ArrayLengthViolation => "ArrayLengthViolation",
            Self::ArrayItemTypeViolation => "ArrayItemTypeViolation",
            Self::PatternMismatch => "PatternMismatch",
            Self::UnresolvedReference => "UnresolvedReference",
            Self::ReferenceTypeMismatch => "ReferenceTypeMismatch",
            Self::ReferenceCycle => "ReferenceCycle",
        }
    }

    /// True for errors produced by reference resolution.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedReference | Self::ReferenceTypeMismatch | Self::ReferenceCycle
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    /// Source document name, set once reports of several documents are merged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    pub path: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ValidationError> for ReportEntry {
    fn from(err: &ValidationError) -> Self {
        Self {
            document: None,
            path: err.path(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<&ReferenceError> for ReportEntry {
    fn from(err: &ReferenceError) -> Self {
        Self {
            document: None,
            path: err.path().to_string(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome of validating and resolving one or more documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    valid: bool,
    error_count: usize,
    errors: Vec<ReportEntry>,
}

impl Default for Report {
    fn default() -> Self {
        Self::from_entries(Vec::new())
    }
}

impl Report {
    /// Combine the errors of one document.
    pub fn aggregate(validation_errors: &[ValidationError], reference_errors: &[ReferenceError]) -> Self {
        let entries = validation_errors
            .iter()
            .map(ReportEntry::from)
            .chain(reference_errors.iter().map(ReportEntry::from))
            .collect();
        Self::from_entries(entries)
    }

    fn from_entries(errors: Vec<ReportEntry>) -> Self {
        Self {
            valid: errors.is_empty(),
            error_count: errors.len(),
            errors,
        }
    }

    /// Tag every entry with the document it came from.
    pub fn for_document(mut self, document: impl Into<String>) -> Self {
        let document = document.into();
        for entry in &mut self.errors {
            entry.document = Some(document.clone());
        }
        self
    }

    /// Append the entries of `other`, keeping their order.
    pub fn merge(&mut self, other: Report) {
        self.errors.extend(other.errors);
        self.error_count = self.errors.len();
        self.valid = self.errors.is_empty();
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn errors(&self) -> &[ReportEntry] {
        &self.errors
    }

    /// Process exit code for the CLI: 0 when valid, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.valid {
            0
        } else {
            1
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.errors {
            if let Some(document) = &entry.document {
                write!(f, "{}: ", document)?;
            }
            writeln!(f, "{}: [{}] {}", entry.path, entry.kind, entry.message)?;
        }
        if self.valid {
            write!(f, "configuration is valid")
        } else {
            write!(f, "configuration is invalid: {} error(s)", self.error_count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing(table: &str) -> ValidationError {
        ValidationError::MissingTable { table: table.into() }
    }

    fn unresolved(path: &str) -> ReferenceError {
        ReferenceError::UnresolvedReference {
            path: path.into(),
            id: "missing-id".into(),
            expected: "targets".into(),
        }
    }

    #[test]
    fn test_empty_report_is_valid() {
        let report = Report::aggregate(&[], &[]);
        assert!(report.is_valid());
        assert_eq!(report.error_count(), 0);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.to_string(), "configuration is valid");
    }

    #[test]
    fn test_validation_errors_come_first() {
        let report = Report::aggregate(&[missing("proxy")], &[unresolved("backends.a.target_ref")]);
        let kinds: Vec<_> = report.errors().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::MissingTable, ErrorKind::UnresolvedReference]);
        assert!(!report.is_valid());
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_merge_tags_documents() {
        let mut report = Report::aggregate(&[missing("proxy")], &[]).for_document("config.toml");
        report.merge(Report::aggregate(&[], &[unresolved("backends.a.target_ref")]).for_document("api.toml"));
        assert_eq!(report.error_count(), 2);
        assert_eq!(report.errors()[1].document.as_deref(), Some("api.toml"));

        let text = report.to_string();
        assert!(text.starts_with("config.toml: proxy: [MissingTable] required table `proxy` is missing\n"));
        assert!(text.ends_with("configuration is invalid: 2 error(s)"));
    }

    #[test]
    fn test_json_shape() {
        let report = Report::aggregate(&[], &[unresolved("backends.a.target_ref")]);
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["error_count"], 1);
        assert_eq!(json["errors"][0]["kind"], "UnresolvedReference");
        assert_eq!(json["errors"][0]["path"], "backends.a.target_ref");
        assert!(json["errors"][0].get("document").is_none());
    }
}

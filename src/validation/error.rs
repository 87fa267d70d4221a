//! Structural validation errors.

use thiserror::Error;

use crate::report::ErrorKind;

/// One structural problem found in a configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ValidationError {
    /// A required table has no instance in the document.
    #[error("required table `{table}` is missing")]
    MissingTable { table: String },

    /// A required (or conditionally required) field is absent.
    #[error("required field `{field}` is missing{}", condition_suffix(.condition))]
    MissingField {
        table: String,
        field: String,
        condition: Option<String>,
    },

    /// A value does not have the declared type.
    #[error("expected {expected}, found {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// A value is not one of the allowed literals.
    #[error("value {value} is not one of [{allowed}]")]
    EnumViolation {
        path: String,
        value: String,
        allowed: String,
    },

    /// A number lies outside its inclusive bounds.
    #[error("value {value} is outside the allowed range {bounds}")]
    RangeViolation {
        path: String,
        value: String,
        bounds: String,
    },

    /// An array has too few or too many items.
    #[error("array has {len} items, allowed {bounds}")]
    ArrayLengthViolation {
        path: String,
        len: usize,
        bounds: String,
    },

    /// An array item does not have the declared item type.
    #[error("array item expected {expected}, found {actual}")]
    ArrayItemTypeViolation {
        path: String,
        expected: String,
        actual: String,
    },

    /// A wildcard-matched table name violates the pattern constraint.
    #[error("table name segment `{segment}` does not match `{constraint}` required by `{table}`")]
    PatternMismatch {
        path: String,
        segment: String,
        table: String,
        constraint: String,
    },
}

fn condition_suffix(condition: &Option<String>) -> String {
    match condition {
        Some(condition) => format!(" (required because {})", condition),
        None => String::new(),
    }
}

impl ValidationError {
    /// Dotted location of the problem (`network.vpn.bind_port`).
    pub fn path(&self) -> String {
        match self {
            Self::MissingTable { table } => table.clone(),
            Self::MissingField { table, field, .. } => format!("{}.{}", table, field),
            Self::TypeMismatch { path, .. }
            | Self::EnumViolation { path, .. }
            | Self::RangeViolation { path, .. }
            | Self::ArrayLengthViolation { path, .. }
            | Self::ArrayItemTypeViolation { path, .. }
            | Self::PatternMismatch { path, .. } => path.clone(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingTable { .. } => ErrorKind::MissingTable,
            Self::MissingField { .. } => ErrorKind::MissingField,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::EnumViolation { .. } => ErrorKind::EnumViolation,
            Self::RangeViolation { .. } => ErrorKind::RangeViolation,
            Self::ArrayLengthViolation { .. } => ErrorKind::ArrayLengthViolation,
            Self::ArrayItemTypeViolation { .. } => ErrorKind::ArrayItemTypeViolation,
            Self::PatternMismatch { .. } => ErrorKind::PatternMismatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_path_and_message() {
        let err = ValidationError::MissingField {
            table: "management".into(),
            field: "network".into(),
            condition: Some("enabled == true".into()),
        };
        assert_eq!(err.path(), "management.network");
        assert_eq!(err.kind(), ErrorKind::MissingField);
        assert_eq!(
            err.to_string(),
            "required field `network` is missing (required because enabled == true)"
        );
    }

    #[test]
    fn test_type_mismatch_message() {
        let err = ValidationError::TypeMismatch {
            path: "proxy.id".into(),
            expected: "string".into(),
            actual: "integer".into(),
        };
        assert_eq!(err.to_string(), "expected string, found integer");
    }
}

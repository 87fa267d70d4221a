//! Reference resolution errors.

use std::collections::HashSet;

use thiserror::Error;

use crate::report::ErrorKind;

/// One reference that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ReferenceError {
    /// No entity with this ID exists in any table.
    #[error("`{id}` does not name any entry in `{expected}`")]
    UnresolvedReference {
        path: String,
        id: String,
        expected: String,
    },

    /// The ID exists, but in a table this field may not reference.
    #[error("`{id}` names an entry in `{found}`, but this field references `{expected}`")]
    ReferenceTypeMismatch {
        path: String,
        id: String,
        expected: String,
        found: String,
    },

    /// Following references leads back to an entity already being resolved.
    #[error("reference cycle: {}", .cycle.join(" -> "))]
    ReferenceCycle { path: String, cycle: Vec<String> },

    /// The referenced entity exists but failed to resolve itself. `path`
    /// names the consuming reference, `cause` the entity's own error.
    #[error("`{id}` cannot be used: {cause}")]
    BrokenDependency {
        path: String,
        id: String,
        cause: Box<ReferenceError>,
    },
}

impl ReferenceError {
    /// Dotted location of the reference (`backends.my_api.target_ref`).
    pub fn path(&self) -> &str {
        match self {
            Self::UnresolvedReference { path, .. }
            | Self::ReferenceTypeMismatch { path, .. }
            | Self::ReferenceCycle { path, .. }
            | Self::BrokenDependency { path, .. } => path,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnresolvedReference { .. } => ErrorKind::UnresolvedReference,
            Self::ReferenceTypeMismatch { .. } => ErrorKind::ReferenceTypeMismatch,
            Self::ReferenceCycle { .. } => ErrorKind::ReferenceCycle,
            Self::BrokenDependency { cause, .. } => cause.kind(),
        }
    }
}

/// Drop repeated errors, keeping the first occurrence of each.
pub fn dedupe(errors: Vec<ReferenceError>) -> Vec<ReferenceError> {
    let mut seen = HashSet::new();
    errors.into_iter().filter(|e| seen.insert(e.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message() {
        let err = ReferenceError::ReferenceCycle {
            path: "policies.p1".into(),
            cycle: vec!["policies.p1".into(), "rules.r1".into(), "policies.p1".into()],
        };
        assert_eq!(err.to_string(), "reference cycle: policies.p1 -> rules.r1 -> policies.p1");
        assert_eq!(err.kind(), ErrorKind::ReferenceCycle);
    }

    #[test]
    fn test_broken_dependency_names_consumer_and_cause() {
        let err = ReferenceError::BrokenDependency {
            path: "middleware.guard.policies[0]".into(),
            id: "p1".into(),
            cause: Box::new(ReferenceError::ReferenceCycle {
                path: "policies.p1".into(),
                cycle: vec!["policies.p1".into(), "rules.r1".into(), "policies.p1".into()],
            }),
        };
        assert_eq!(err.path(), "middleware.guard.policies[0]");
        assert_eq!(err.kind(), ErrorKind::ReferenceCycle);
        assert_eq!(
            err.to_string(),
            "`p1` cannot be used: reference cycle: policies.p1 -> rules.r1 -> policies.p1"
        );
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let missing = |path: &str| ReferenceError::UnresolvedReference {
            path: path.into(),
            id: "x".into(),
            expected: "rules".into(),
        };
        let errors = dedupe(vec![missing("a"), missing("b"), missing("a")]);
        assert_eq!(errors, vec![missing("a"), missing("b")]);
    }
}

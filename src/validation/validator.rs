//! Whole-document validation.
//!
//! # Responsibilities
//! - Report missing required tables
//! - Reject wildcard instances whose name violates the pattern constraint
//! - Run the constraint checks for every field of every instance
//!
//! # Design Decisions
//! - Validation is a pure function: (ValueTree, SchemaDocument) → Vec<ValidationError>
//! - Errors are ordered by schema table, then instance, then field
//! - An instance with a bad name is reported once and not inspected further,
//!   nor is any table nested under it

use regex::Regex;
use toml::Table;

use crate::schema::model::{SchemaDocument, TableSpec};
use crate::schema::pattern::{InstanceNode, TableInstance};
use crate::validation::constraints::{check_conditional_required, check_field};
use crate::validation::error::ValidationError;
use crate::validation::matcher::MatchPlan;
use crate::ValueTree;

/// Validate `tree` against `schema`, returning every structural error.
pub fn validate(tree: &ValueTree, schema: &SchemaDocument) -> Vec<ValidationError> {
    let plan = MatchPlan::build(schema, tree);
    let rejected = rejected_paths(&plan);
    let mut errors = Vec::new();

    for entry in plan.iter() {
        let spec = entry.spec;
        if entry.is_missing() {
            errors.push(ValidationError::MissingTable {
                table: spec.name.clone(),
            });
            continue;
        }

        for instance in &entry.instances {
            if rejected.iter().any(|path| is_nested_under(&instance.path, path)) {
                continue;
            }

            let table = match instance.node {
                InstanceNode::Table(table) => table,
                InstanceNode::NotTable(value) => {
                    errors.push(ValidationError::TypeMismatch {
                        path: instance.path.clone(),
                        expected: "table".to_string(),
                        actual: value.type_str().to_string(),
                    });
                    continue;
                }
            };

            if let Some((segment, constraint)) = bad_segment(spec, instance) {
                errors.push(ValidationError::PatternMismatch {
                    path: instance.path.clone(),
                    segment: segment.to_string(),
                    table: spec.name.clone(),
                    constraint: constraint.as_str().to_string(),
                });
                continue;
            }

            validate_instance(&instance.path, table, spec, &mut errors);
        }
    }

    tracing::debug!(
        schema_version = %schema.version,
        tables = plan.instance_count(),
        errors = errors.len(),
        "Validation pass complete"
    );

    errors
}

/// The wildcard segment of `instance` when it violates the spec's constraint.
fn bad_segment<'a, 's>(spec: &'s TableSpec, instance: &TableInstance<'a>) -> Option<(&'a str, &'s Regex)> {
    let segment = instance.wildcard?;
    let constraint = spec.pattern_constraint.as_ref()?;
    (!constraint.is_match(segment)).then_some((segment, constraint))
}

/// Paths of every instance rejected for its name, from any spec.
fn rejected_paths(plan: &MatchPlan<'_, '_>) -> Vec<String> {
    plan.iter()
        .flat_map(|entry| {
            entry
                .instances
                .iter()
                .filter(|instance| bad_segment(entry.spec, instance).is_some())
                .map(|instance| instance.path.clone())
        })
        .collect()
}

/// Strictly below `parent` in the table hierarchy.
fn is_nested_under(path: &str, parent: &str) -> bool {
    path.len() > parent.len() && path.starts_with(parent) && path.as_bytes()[parent.len()] == b'.'
}

fn validate_instance(path: &str, table: &Table, spec: &TableSpec, errors: &mut Vec<ValidationError>) {
    for field in &spec.fields {
        match table.get(&field.name) {
            Some(value) => {
                let field_path = format!("{}.{}", path, field.name);
                errors.extend(check_field(&field_path, value, field));
            }
            None => errors.extend(check_conditional_required(path, table, field)),
        }
    }
}

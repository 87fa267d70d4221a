//! Constraint evaluation for single fields.
//!
//! # Responsibilities
//! - Check one value against one field spec (type, enum, range, array)
//! - Decide whether an absent field is required in a given table instance
//!
//! # Design Decisions
//! - Pure functions: no state, no logging, no early exit
//! - Each check returns its violations; aggregation happens in the validator
//! - A value of the wrong type gets only the type error, the type-specific
//!   checks would only repeat it

use toml::{Table, Value};

use crate::schema::model::{literal_eq, FieldSpec, FieldType};
use crate::validation::error::ValidationError;

/// Check that `value` has the `expected` type.
pub fn check_type(path: &str, value: &Value, expected: FieldType) -> Option<ValidationError> {
    if expected.accepts(value) {
        return None;
    }
    Some(ValidationError::TypeMismatch {
        path: path.to_string(),
        expected: expected.name().to_string(),
        actual: value.type_str().to_string(),
    })
}

/// Check that `value` is one of the `allowed` literals.
pub fn check_enum(path: &str, value: &Value, allowed: &[Value]) -> Option<ValidationError> {
    if allowed.iter().any(|candidate| literal_eq(value, candidate)) {
        return None;
    }
    Some(ValidationError::EnumViolation {
        path: path.to_string(),
        value: value.to_string(),
        allowed: allowed
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Check inclusive numeric bounds. Non-numeric values are not range checked.
pub fn check_range(path: &str, value: &Value, min: Option<f64>, max: Option<f64>) -> Option<ValidationError> {
    let number = match value {
        Value::Integer(i) => *i as f64,
        Value::Float(f) => *f,
        _ => return None,
    };

    let below = min.map(|min| !(number >= min)).unwrap_or(false);
    let above = max.map(|max| !(number <= max)).unwrap_or(false);
    if !below && !above {
        return None;
    }
    Some(ValidationError::RangeViolation {
        path: path.to_string(),
        value: value.to_string(),
        bounds: describe_bounds(min, max),
    })
}

/// Check array length, then every item's type. Every problem is reported.
pub fn check_array(
    path: &str,
    value: &Value,
    item_type: Option<FieldType>,
    min_items: Option<usize>,
    max_items: Option<usize>,
) -> Vec<ValidationError> {
    let mut violations = Vec::new();
    let Some(items) = value.as_array() else {
        return violations;
    };

    let too_few = min_items.map(|min| items.len() < min).unwrap_or(false);
    let too_many = max_items.map(|max| items.len() > max).unwrap_or(false);
    if too_few || too_many {
        violations.push(ValidationError::ArrayLengthViolation {
            path: path.to_string(),
            len: items.len(),
            bounds: describe_bounds(min_items, max_items),
        });
    }

    if let Some(expected) = item_type {
        for (i, item) in items.iter().enumerate() {
            if !expected.accepts(item) {
                violations.push(ValidationError::ArrayItemTypeViolation {
                    path: item_path(path, i),
                    expected: expected.name().to_string(),
                    actual: item.type_str().to_string(),
                });
            }
        }
    }

    violations
}

/// Decide whether the absent `field` is required in `instance`.
///
/// A plain `required = true` always is. A `required_if` condition is
/// evaluated against the siblings of the same instance; if the sibling it
/// names is absent the condition is false.
pub fn check_conditional_required(table_path: &str, instance: &Table, field: &FieldSpec) -> Option<ValidationError> {
    if instance.contains_key(&field.name) {
        return None;
    }

    let condition = match (&field.required_if, field.required) {
        (_, true) => None,
        (Some(condition), false) if condition.holds(instance) => Some(condition.to_string()),
        _ => return None,
    };

    Some(ValidationError::MissingField {
        table: table_path.to_string(),
        field: field.name.clone(),
        condition,
    })
}

/// Run every check that applies to a present value of `field`.
pub fn check_field(path: &str, value: &Value, field: &FieldSpec) -> Vec<ValidationError> {
    if let Some(mismatch) = check_type(path, value, field.field_type) {
        return vec![mismatch];
    }

    let mut violations = Vec::new();
    match field.field_type {
        FieldType::Integer | FieldType::Float => {
            if let Some(allowed) = &field.allowed {
                violations.extend(check_enum(path, value, allowed));
            }
            violations.extend(check_range(path, value, field.min, field.max));
        }
        FieldType::String | FieldType::Boolean => {
            if let Some(allowed) = &field.allowed {
                violations.extend(check_enum(path, value, allowed));
            }
        }
        FieldType::Array => {
            violations.extend(check_array(path, value, field.item_type, field.min_items, field.max_items));
            // Enums on arrays constrain the items.
            if let (Some(allowed), Some(items)) = (&field.allowed, value.as_array()) {
                for (i, item) in items.iter().enumerate() {
                    violations.extend(check_enum(&item_path(path, i), item, allowed));
                }
            }
        }
        FieldType::Table => {}
    }
    violations
}

pub(crate) fn item_path(path: &str, index: usize) -> String {
    format!("{}[{}]", path, index)
}

fn describe_bounds<T: std::fmt::Display>(min: Option<T>, max: Option<T>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("[{}, {}]", min, max),
        (Some(min), None) => format!(">= {}", min),
        (None, Some(max)) => format!("<= {}", max),
        (None, None) => "any".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::Condition;

    fn table(src: &str) -> Table {
        toml::from_str(src).unwrap()
    }

    #[test]
    fn test_check_type() {
        assert!(check_type("a", &Value::String("x".into()), FieldType::String).is_none());
        let err = check_type("proxy.id", &Value::Integer(1), FieldType::String).unwrap();
        assert_eq!(
            err,
            ValidationError::TypeMismatch {
                path: "proxy.id".into(),
                expected: "string".into(),
                actual: "integer".into(),
            }
        );
    }

    #[test]
    fn test_check_enum() {
        let allowed = vec![Value::String("http".into()), Value::String("https".into())];
        assert!(check_enum("p", &Value::String("https".into()), &allowed).is_none());
        let err = check_enum("p", &Value::String("ftp".into()), &allowed).unwrap();
        assert_eq!(err.to_string(), r#"value "ftp" is not one of ["http", "https"]"#);
    }

    #[test]
    fn test_check_range_inclusive() {
        assert!(check_range("p", &Value::Integer(1), Some(1.0), Some(65535.0)).is_none());
        assert!(check_range("p", &Value::Integer(65535), Some(1.0), Some(65535.0)).is_none());
        assert!(check_range("p", &Value::Integer(0), Some(1.0), Some(65535.0)).is_some());
        assert!(check_range("p", &Value::Float(70000.5), None, Some(65535.0)).is_some());
        assert!(check_range("p", &Value::String("9".into()), Some(10.0), None).is_none());
    }

    #[test]
    fn test_check_array_reports_length_and_every_item() {
        let value = Value::Array(vec![Value::Integer(1), Value::String("ok".into()), Value::Boolean(true)]);
        let errors = check_array("p.rules", &value, Some(FieldType::String), None, Some(2));
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], ValidationError::ArrayLengthViolation { len: 3, .. }));
        assert_eq!(errors[1].path(), "p.rules[0]");
        assert_eq!(errors[2].path(), "p.rules[2]");
    }

    #[test]
    fn test_check_array_min_items() {
        let value = Value::Array(vec![]);
        let errors = check_array("p", &value, Some(FieldType::String), Some(1), None);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "array has 0 items, allowed >= 1");
    }

    #[test]
    fn test_conditional_required() {
        let mut field = FieldSpec::new("network", FieldType::String);
        field.required_if = Condition::parse("enabled == true");

        let on = table("enabled = true");
        let off = table("enabled = false");
        let unset = table("base_path = 'admin'");

        let err = check_conditional_required("management", &on, &field).unwrap();
        assert_eq!(err.path(), "management.network");
        assert!(check_conditional_required("management", &off, &field).is_none());
        assert!(check_conditional_required("management", &unset, &field).is_none());
    }

    #[test]
    fn test_plain_required() {
        let mut field = FieldSpec::new("id", FieldType::String);
        field.required = true;
        assert!(check_conditional_required("proxy", &table(""), &field).is_some());
        assert!(check_conditional_required("proxy", &table("id = 'gw'"), &field).is_none());
    }

    #[test]
    fn test_wrong_type_skips_other_checks() {
        let mut field = FieldSpec::new("port", FieldType::Integer);
        field.min = Some(1.0);
        let errors = check_field("net.port", &Value::String("x".into()), &field);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::TypeMismatch { .. }));
    }

    #[test]
    fn test_enum_on_array_items() {
        let mut field = FieldSpec::new("methods", FieldType::Array);
        field.allowed = Some(vec![Value::String("GET".into())]);
        let value = Value::Array(vec![Value::String("GET".into()), Value::String("PUT".into())]);
        let errors = check_field("e.methods", &value, &field);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), "e.methods[1]");
    }
}

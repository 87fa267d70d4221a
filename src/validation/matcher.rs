//! Table matching for one validation pass.
//!
//! # Responsibilities
//! - Map every table spec to the concrete table instances it governs
//! - Give literal specs priority over patterns covering the same table
//! - Remember how many tables a literal claimed away from each pattern
//!
//! # Design Decisions
//! - Computed once per pass, before any field is checked
//! - One shared spec per pattern; instances never get a copy
//! - Instance order is document order, spec order is schema order

use std::collections::HashSet;

use crate::schema::model::{SchemaDocument, TableSpec};
use crate::schema::pattern::TableInstance;
use crate::ValueTree;

/// The tables one spec governs in one document.
#[derive(Debug)]
pub struct SpecMatch<'s, 't> {
    pub spec: &'s TableSpec,
    pub instances: Vec<TableInstance<'t>>,
    /// Tables the pattern matched that a literal spec governs instead.
    pub claimed: usize,
}

impl SpecMatch<'_, '_> {
    /// A required spec with no table at all under its name.
    pub fn is_missing(&self) -> bool {
        self.spec.required && self.instances.is_empty() && self.claimed == 0
    }
}

/// The tables each spec of a schema governs in one document.
#[derive(Debug)]
pub struct MatchPlan<'s, 't> {
    entries: Vec<SpecMatch<'s, 't>>,
}

impl<'s, 't> MatchPlan<'s, 't> {
    /// Match every spec of `schema` against `tree`.
    pub fn build(schema: &'s SchemaDocument, tree: &'t ValueTree) -> Self {
        let claimed: HashSet<String> = schema
            .tables
            .iter()
            .filter(|spec| !spec.is_pattern())
            .flat_map(|spec| spec.pattern.instances(tree))
            .map(|instance| instance.path)
            .collect();

        let entries = schema
            .tables
            .iter()
            .map(|spec| {
                let mut instances = spec.pattern.instances(tree);
                let before = instances.len();
                if spec.is_pattern() {
                    instances.retain(|instance| !claimed.contains(&instance.path));
                }
                SpecMatch {
                    spec,
                    claimed: before - instances.len(),
                    instances,
                }
            })
            .collect();

        Self { entries }
    }

    /// Specs with their instances, in schema declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &SpecMatch<'s, 't>> {
        self.entries.iter()
    }

    /// Total number of matched instances.
    pub fn instance_count(&self) -> usize {
        self.entries.iter().map(|entry| entry.instances.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_claims_instance() {
        let schema = SchemaDocument::from_toml_str(
            r#"
            [schema]
            version = "1.0.0"
            [[table]]
            name = "network.*"
            [[table]]
            name = "network.default"
            "#,
        )
        .unwrap();
        let tree: ValueTree = toml::from_str(
            r#"
            [network.default]
            [network.vpn]
            "#,
        )
        .unwrap();

        let plan = MatchPlan::build(&schema, &tree);
        let matched: Vec<(String, Vec<String>)> = plan
            .iter()
            .map(|entry| {
                (
                    entry.spec.name.clone(),
                    entry.instances.iter().map(|i| i.path.clone()).collect(),
                )
            })
            .collect();
        assert_eq!(
            matched,
            vec![
                ("network.*".to_string(), vec!["network.vpn".to_string()]),
                ("network.default".to_string(), vec!["network.default".to_string()]),
            ]
        );
        assert_eq!(plan.instance_count(), 2);
    }

    #[test]
    fn test_claimed_instance_satisfies_required_pattern() {
        let schema = SchemaDocument::from_toml_str(
            r#"
            [schema]
            version = "1.0.0"
            [[table]]
            name = "network.*"
            required = true
            [[table]]
            name = "network.default"
            "#,
        )
        .unwrap();
        let tree: ValueTree = toml::from_str("[network.default]\nx = 1").unwrap();

        let plan = MatchPlan::build(&schema, &tree);
        let pattern = plan.iter().next().unwrap();
        assert!(pattern.instances.is_empty());
        assert_eq!(pattern.claimed, 1);
        assert!(!pattern.is_missing());

        let empty = ValueTree::new();
        let plan = MatchPlan::build(&schema, &empty);
        assert!(plan.iter().next().unwrap().is_missing());
    }
}

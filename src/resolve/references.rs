//! Which fields are references, and what they point at.

use toml::Table;

use crate::resolve::entities::EntityKind;

/// A field whose value is an entity ID (or a list of them).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceField {
    pub name: &'static str,
    pub target: EntityKind,
    pub many: bool,
}

pub const AUTHENTICATION: ReferenceField = ReferenceField {
    name: "authentication",
    target: EntityKind::Authentication,
    many: false,
};
pub const RULES: ReferenceField = ReferenceField {
    name: "rules",
    target: EntityKind::Rule,
    many: true,
};
pub const POLICIES: ReferenceField = ReferenceField {
    name: "policies",
    target: EntityKind::Policy,
    many: true,
};
pub const PEER_REF: ReferenceField = ReferenceField {
    name: "peer_ref",
    target: EntityKind::Peer,
    many: false,
};
pub const TARGET_REF: ReferenceField = ReferenceField {
    name: "target_ref",
    target: EntityKind::Target,
    many: false,
};

/// Reference fields carried by global entities.
pub fn entity_reference_fields(kind: EntityKind) -> &'static [ReferenceField] {
    match kind {
        EntityKind::Peer | EntityKind::Target => &[AUTHENTICATION],
        EntityKind::Authentication => &[],
        EntityKind::Policy => &[RULES, POLICIES],
        EntityKind::Rule => &[POLICIES],
    }
}

pub const ENDPOINT_FIELDS: &[ReferenceField] = &[PEER_REF, AUTHENTICATION];
pub const BACKEND_FIELDS: &[ReferenceField] = &[TARGET_REF, AUTHENTICATION];
pub const MIDDLEWARE_FIELDS: &[ReferenceField] = &[AUTHENTICATION, POLICIES];

/// A reference value found in a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceValue<'a> {
    /// Field path relative to the record (`authentication`, `rules[2]`).
    pub field: String,
    pub id: &'a str,
}

/// The IDs `field` holds in `record`, in declaration order. Values of the
/// wrong shape are skipped; structural validation reports them.
pub fn reference_values<'a>(record: &'a Table, field: &ReferenceField) -> Vec<ReferenceValue<'a>> {
    match record.get(field.name) {
        Some(value) if !field.many => value
            .as_str()
            .map(|id| ReferenceValue {
                field: field.name.to_string(),
                id,
            })
            .into_iter()
            .collect(),
        Some(value) => value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, item)| {
                        item.as_str().map(|id| ReferenceValue {
                            field: format!("{}[{}]", field.name, i),
                            id,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default(),
        None => Vec::new(),
    }
}

//! Global entity snapshot.
//!
//! # Responsibilities
//! - Collect peers, targets, authentications, policies and rules from the
//!   global document into one arena
//! - Look entities up by kind and ID
//!
//! # Design Decisions
//! - Built once per configuration generation, never mutated afterwards
//! - Arena order is declaration order, so everything derived from it is
//!   deterministic
//! - A new generation gets a new snapshot; share it with `Arc`

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use toml::Table;

use crate::ValueTree;

/// The kinds of globally defined entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Peer,
    Target,
    Authentication,
    Policy,
    Rule,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Peer,
        EntityKind::Target,
        EntityKind::Authentication,
        EntityKind::Policy,
        EntityKind::Rule,
    ];

    /// Name of the table the entities live in.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Peer => "peers",
            Self::Target => "targets",
            Self::Authentication => "authentications",
            Self::Policy => "policies",
            Self::Rule => "rules",
        }
    }

    pub fn from_table(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.table() == name)
    }
}

/// Kind plus ID; displayed as the entity's table path (`policies.p1`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub id: String,
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind.table(), self.id)
    }
}

/// Index of an entity in its snapshot's arena.
pub type EntityId = usize;

/// One entity record.
#[derive(Debug, Clone)]
pub struct Entity {
    pub key: EntityKey,
    pub record: Table,
}

/// Immutable set of entities for one configuration generation.
#[derive(Debug, Clone, Default)]
pub struct EntitySnapshot {
    entities: Vec<Entity>,
    index: HashMap<EntityKey, EntityId>,
}

impl EntitySnapshot {
    /// Collect every entity from the global document. Entries that are not
    /// tables are skipped; the validator reports them.
    pub fn from_tree(tree: &ValueTree) -> Self {
        let mut snapshot = Self::default();
        for (name, value) in tree.iter() {
            let (Some(kind), Some(table)) = (EntityKind::from_table(name), value.as_table()) else {
                continue;
            };
            for (id, record) in table.iter() {
                if let Some(record) = record.as_table() {
                    snapshot.insert(kind, id, record.clone());
                }
            }
        }

        tracing::debug!(entities = snapshot.len(), "Entity snapshot built");
        snapshot
    }

    fn insert(&mut self, kind: EntityKind, id: &str, record: Table) {
        let key = EntityKey {
            kind,
            id: id.to_string(),
        };
        let entity_id = self.entities.len();
        self.index.insert(key.clone(), entity_id);
        self.entities.push(Entity { key, record });
    }

    pub fn lookup(&self, kind: EntityKind, id: &str) -> Option<EntityId> {
        self.index
            .get(&EntityKey {
                kind,
                id: id.to_string(),
            })
            .copied()
    }

    pub fn get(&self, entity: EntityId) -> &Entity {
        &self.entities[entity]
    }

    /// Every entity in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter().enumerate()
    }

    /// Entities of one kind in declaration order.
    pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.iter().filter(move |(_, entity)| entity.key.kind == kind)
    }

    /// Every kind that has an entity called `id`.
    pub fn kinds_containing(&self, id: &str) -> Vec<EntityKind> {
        EntityKind::ALL
            .into_iter()
            .filter(|kind| self.lookup(*kind, id).is_some())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

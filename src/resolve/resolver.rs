//! Reference resolution.
//!
//! # Responsibilities
//! - Look up every reference field in the entity snapshot
//! - Merge inherited and local settings into effective configurations
//! - Expand policies into their ordered rules
//! - Collect every reference error before rejecting a document
//!
//! # Design Decisions
//! - Cycles are found on the reference graph before anything is expanded;
//!   entities that reach a cycle are never expanded
//! - Policies and rules are expanded once per snapshot and memoized, so a
//!   pipeline referencing a policy reuses the same result (or errors)
//! - All-or-nothing: a document with any reference error yields no output

use std::collections::HashMap;

use serde::Serialize;
use toml::Table;

use crate::resolve::effective::{
    direct_settings, entity_settings, layered, option_settings, ComponentKind, EffectiveConfig, ResolvedEntity,
    ResolvedPipeline, ResolvedPolicy, ResolvedRule,
};
use crate::resolve::entities::{EntityId, EntityKind, EntitySnapshot};
use crate::resolve::error::{dedupe, ReferenceError};
use crate::resolve::graph::ReferenceGraph;
use crate::resolve::references::{
    entity_reference_fields, reference_values, ReferenceField, ReferenceValue, AUTHENTICATION, BACKEND_FIELDS,
    ENDPOINT_FIELDS, MIDDLEWARE_FIELDS, PEER_REF, POLICIES, RULES, TARGET_REF,
};
use crate::schema::model::SchemaDocument;
use crate::ValueTree;

type Expansion<T> = Result<T, Vec<ReferenceError>>;

/// Component tables a pipeline may list.
const PIPELINE_LISTS: [&str; 3] = ["endpoints", "backends", "middleware"];

/// Resolved view of the global entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedGlobal {
    pub peers: Vec<EffectiveConfig>,
    pub targets: Vec<EffectiveConfig>,
    pub authentications: Vec<ResolvedEntity>,
    pub policies: Vec<ResolvedPolicy>,
    pub rules: Vec<ResolvedRule>,
}

/// Resolved view of one pipeline document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedPipelineDocument {
    pub pipelines: Vec<ResolvedPipeline>,
    pub endpoints: Vec<EffectiveConfig>,
    pub backends: Vec<EffectiveConfig>,
    pub middleware: Vec<EffectiveConfig>,
}

impl ResolvedPipelineDocument {
    pub fn endpoint(&self, id: &str) -> Option<&EffectiveConfig> {
        self.endpoints.iter().find(|c| c.id == id)
    }

    pub fn backend(&self, id: &str) -> Option<&EffectiveConfig> {
        self.backends.iter().find(|c| c.id == id)
    }

    pub fn middleware(&self, id: &str) -> Option<&EffectiveConfig> {
        self.middleware.iter().find(|c| c.id == id)
    }

    pub fn pipeline(&self, id: &str) -> Option<&ResolvedPipeline> {
        self.pipelines.iter().find(|p| p.id == id)
    }
}

/// Lookups and defaults shared by the resolver and the expander.
struct Context<'a> {
    snapshot: &'a EntitySnapshot,
    defaults: Vec<&'a SchemaDocument>,
}

impl<'a> Context<'a> {
    fn lookup(&self, owner: &str, value: &ReferenceValue<'_>, target: EntityKind) -> Result<EntityId, ReferenceError> {
        if let Some(entity) = self.snapshot.lookup(target, value.id) {
            return Ok(entity);
        }

        let path = format!("{}.{}", owner, value.field);
        match self.snapshot.kinds_containing(value.id).first() {
            Some(found) => Err(ReferenceError::ReferenceTypeMismatch {
                path,
                id: value.id.to_string(),
                expected: target.table().to_string(),
                found: found.table().to_string(),
            }),
            None => Err(ReferenceError::UnresolvedReference {
                path,
                id: value.id.to_string(),
                expected: target.table().to_string(),
            }),
        }
    }

    fn defaults_for(&self, path: &str) -> Table {
        self.defaults
            .iter()
            .find(|schema| schema.spec_for(path).is_some())
            .map(|schema| schema.defaults_for(path))
            .unwrap_or_default()
    }

    /// Settings of an entity resolved on its own: schema defaults, then the
    /// entity's own fields.
    fn entity_layer(&self, entity: EntityId) -> Table {
        let entity = self.snapshot.get(entity);
        layered([
            self.defaults_for(&entity.key.to_string()),
            entity_settings(component_kind(entity.key.kind), &entity.record),
        ])
    }
}

fn component_kind(kind: EntityKind) -> Option<ComponentKind> {
    match kind {
        EntityKind::Peer => Some(ComponentKind::Peer),
        EntityKind::Target => Some(ComponentKind::Target),
        _ => None,
    }
}

fn cycle_error(snapshot: &EntitySnapshot, cycle: &[EntityId]) -> ReferenceError {
    let cycle: Vec<String> = cycle.iter().map(|&id| snapshot.get(id).key.to_string()).collect();
    ReferenceError::ReferenceCycle {
        path: cycle[0].clone(),
        cycle,
    }
}

/// Expands policies and rules bottom-up over the acyclic part of the graph.
struct Expander<'r, 'a> {
    ctx: &'r Context<'a>,
    cycles: &'r [Vec<EntityId>],
    reach: &'r [Option<usize>],
    policies: HashMap<EntityId, Expansion<ResolvedPolicy>>,
    rules: HashMap<EntityId, Expansion<ResolvedRule>>,
}

impl<'r, 'a> Expander<'r, 'a> {
    fn policy(&mut self, policy: EntityId) -> Expansion<ResolvedPolicy> {
        if let Some(done) = self.policies.get(&policy) {
            return done.clone();
        }

        let ctx = self.ctx;
        let result = match self.reach[policy] {
            Some(index) => Err(vec![cycle_error(ctx.snapshot, &self.cycles[index])]),
            None => {
                let entity = ctx.snapshot.get(policy);
                let owner = entity.key.to_string();
                let mut errors = Vec::new();
                let policies = self.nested_policies(&owner, &entity.record, &mut errors);

                let mut rules = Vec::new();
                for value in reference_values(&entity.record, &RULES) {
                    match ctx.lookup(&owner, &value, EntityKind::Rule) {
                        Ok(rule) => match self.rule(rule) {
                            Ok(rule) => rules.push(rule),
                            Err(e) => errors.extend(e),
                        },
                        Err(e) => errors.push(e),
                    }
                }

                if errors.is_empty() {
                    Ok(ResolvedPolicy {
                        id: entity.key.id.clone(),
                        settings: ctx.entity_layer(policy),
                        policies,
                        rules,
                    })
                } else {
                    Err(dedupe(errors))
                }
            }
        };

        self.policies.insert(policy, result.clone());
        result
    }

    fn rule(&mut self, rule: EntityId) -> Expansion<ResolvedRule> {
        if let Some(done) = self.rules.get(&rule) {
            return done.clone();
        }

        let ctx = self.ctx;
        let result = match self.reach[rule] {
            Some(index) => Err(vec![cycle_error(ctx.snapshot, &self.cycles[index])]),
            None => {
                let entity = ctx.snapshot.get(rule);
                let owner = entity.key.to_string();
                let mut errors = Vec::new();
                let policies = self.nested_policies(&owner, &entity.record, &mut errors);
                if errors.is_empty() {
                    Ok(ResolvedRule {
                        id: entity.key.id.clone(),
                        settings: ctx.entity_layer(rule),
                        policies,
                    })
                } else {
                    Err(dedupe(errors))
                }
            }
        };

        self.rules.insert(rule, result.clone());
        result
    }

    fn nested_policies(&mut self, owner: &str, record: &Table, errors: &mut Vec<ReferenceError>) -> Vec<ResolvedPolicy> {
        let ctx = self.ctx;
        let mut policies = Vec::new();
        for value in reference_values(record, &POLICIES) {
            match ctx.lookup(owner, &value, EntityKind::Policy) {
                Ok(policy) => match self.policy(policy) {
                    Ok(policy) => policies.push(policy),
                    Err(e) => errors.extend(e),
                },
                Err(e) => errors.push(e),
            }
        }
        policies
    }
}

/// Resolves references against one entity snapshot.
pub struct Resolver<'a> {
    ctx: Context<'a>,
    cycles: Vec<Vec<EntityId>>,
    policies: HashMap<EntityId, Expansion<ResolvedPolicy>>,
    rules: HashMap<EntityId, Expansion<ResolvedRule>>,
}

impl<'a> Resolver<'a> {
    pub fn new(snapshot: &'a EntitySnapshot) -> Self {
        Self::with_schema_defaults(snapshot, Vec::new())
    }

    /// A resolver that layers the `default` values of `schemas` beneath
    /// every effective configuration.
    pub fn with_schema_defaults(snapshot: &'a EntitySnapshot, schemas: Vec<&'a SchemaDocument>) -> Self {
        let ctx = Context {
            snapshot,
            defaults: schemas,
        };

        let graph = ReferenceGraph::build(snapshot);
        let cycles = graph.find_cycles();
        let reach = graph.cycle_reach(&cycles);

        let mut expander = Expander {
            ctx: &ctx,
            cycles: &cycles,
            reach: &reach,
            policies: HashMap::new(),
            rules: HashMap::new(),
        };
        for (id, entity) in snapshot.iter() {
            match entity.key.kind {
                EntityKind::Policy => {
                    let _ = expander.policy(id);
                }
                EntityKind::Rule => {
                    let _ = expander.rule(id);
                }
                _ => {}
            }
        }
        let Expander { policies, rules, .. } = expander;

        if !cycles.is_empty() {
            tracing::warn!(cycles = cycles.len(), "Reference cycles detected");
        }

        Self {
            ctx,
            cycles,
            policies,
            rules,
        }
    }

    /// Resolve peers, targets, authentications, policies and rules.
    pub fn resolve_global(&self) -> Result<ResolvedGlobal, Vec<ReferenceError>> {
        let snapshot = self.ctx.snapshot;
        let mut errors = Vec::new();
        let mut global = ResolvedGlobal::default();

        for (id, entity) in snapshot.iter() {
            for cycle in self.cycles.iter().filter(|cycle| cycle.first() == Some(&id)) {
                errors.push(cycle_error(snapshot, cycle));
            }

            let owner = entity.key.to_string();
            match entity.key.kind {
                EntityKind::Peer | EntityKind::Target => {
                    let before = errors.len();
                    let authentication = self.authentication(&owner, &entity.record, &mut errors);
                    if errors.len() > before {
                        continue;
                    }
                    let kind = if entity.key.kind == EntityKind::Peer {
                        ComponentKind::Peer
                    } else {
                        ComponentKind::Target
                    };
                    let config = EffectiveConfig {
                        path: owner,
                        kind,
                        id: entity.key.id.clone(),
                        inherits: None,
                        settings: self.ctx.entity_layer(id),
                        authentication,
                        policies: Vec::new(),
                    };
                    match kind {
                        ComponentKind::Peer => global.peers.push(config),
                        _ => global.targets.push(config),
                    }
                }
                EntityKind::Authentication => global.authentications.push(ResolvedEntity {
                    id: entity.key.id.clone(),
                    settings: self.ctx.entity_layer(id),
                }),
                EntityKind::Policy => {
                    self.own_reference_errors(&owner, entity.key.kind, &entity.record, &mut errors);
                    if let Some(Ok(policy)) = self.policies.get(&id) {
                        global.policies.push(policy.clone());
                    }
                }
                EntityKind::Rule => {
                    self.own_reference_errors(&owner, entity.key.kind, &entity.record, &mut errors);
                    if let Some(Ok(rule)) = self.rules.get(&id) {
                        global.rules.push(rule.clone());
                    }
                }
            }
        }

        tracing::debug!(
            entities = snapshot.len(),
            errors = errors.len(),
            "Global entities resolved"
        );
        finish(global, errors)
    }

    /// Resolve every component of one pipeline document.
    pub fn resolve_pipeline(&self, tree: &ValueTree) -> Result<ResolvedPipelineDocument, Vec<ReferenceError>> {
        let mut errors = Vec::new();
        let mut document = ResolvedPipelineDocument::default();

        for (name, value) in tree.iter() {
            let Some(table) = value.as_table() else {
                continue;
            };
            let kind = match name.as_str() {
                "endpoints" => ComponentKind::Endpoint,
                "backends" => ComponentKind::Backend,
                "middleware" => ComponentKind::Middleware,
                "pipelines" => {
                    for (id, record) in records(table) {
                        if let Some(pipeline) = self.pipeline(tree, id, record, &mut errors) {
                            document.pipelines.push(pipeline);
                        }
                    }
                    continue;
                }
                _ => continue,
            };

            for (id, record) in records(table) {
                let Some(config) = self.component(kind, id, record, &mut errors) else {
                    continue;
                };
                match kind {
                    ComponentKind::Endpoint => document.endpoints.push(config),
                    ComponentKind::Backend => document.backends.push(config),
                    _ => document.middleware.push(config),
                }
            }
        }

        tracing::debug!(
            endpoints = document.endpoints.len(),
            backends = document.backends.len(),
            middleware = document.middleware.len(),
            errors = errors.len(),
            "Pipeline document resolved"
        );
        finish(document, errors)
    }

    fn component(
        &self,
        kind: ComponentKind,
        id: &str,
        record: &Table,
        errors: &mut Vec<ReferenceError>,
    ) -> Option<EffectiveConfig> {
        let path = format!("{}.{}", kind.table(), id);
        let before = errors.len();

        let fields: &[ReferenceField] = match kind {
            ComponentKind::Endpoint => ENDPOINT_FIELDS,
            ComponentKind::Backend => BACKEND_FIELDS,
            _ => MIDDLEWARE_FIELDS,
        };

        let mut inherited = None;
        for field in fields.iter().filter(|f| **f == PEER_REF || **f == TARGET_REF) {
            if let Some(value) = reference_values(record, field).into_iter().next() {
                match self.ctx.lookup(&path, &value, field.target) {
                    Ok(entity) => inherited = Some(self.ctx.snapshot.get(entity)),
                    Err(e) => errors.push(e),
                }
            }
        }

        let authentication = if record.contains_key("authentication") {
            self.authentication(&path, record, errors)
        } else if let Some(entity) = inherited {
            self.authentication(&entity.key.to_string(), &entity.record, errors)
        } else {
            None
        };

        let mut policies = Vec::new();
        if fields.contains(&POLICIES) {
            for value in reference_values(record, &POLICIES) {
                match self.ctx.lookup(&path, &value, EntityKind::Policy) {
                    Ok(policy) => match self.policies.get(&policy) {
                        Some(Ok(policy)) => policies.push(policy.clone()),
                        Some(Err(causes)) => {
                            let consumer = format!("{}.{}", path, value.field);
                            errors.extend(causes.iter().map(|cause| ReferenceError::BrokenDependency {
                                path: consumer.clone(),
                                id: value.id.to_string(),
                                cause: Box::new(cause.clone()),
                            }));
                        }
                        None => {}
                    },
                    Err(e) => errors.push(e),
                }
            }
        }

        if errors.len() > before {
            return None;
        }

        let inherited_settings = inherited
            .map(|entity| entity_settings(component_kind(entity.key.kind), &entity.record))
            .unwrap_or_default();
        let settings = layered([
            self.ctx.defaults_for(&path),
            inherited_settings,
            direct_settings(record),
            option_settings(Some(kind), record),
        ]);

        Some(EffectiveConfig {
            path,
            kind,
            id: id.to_string(),
            inherits: inherited.map(|entity| entity.key.to_string()),
            settings,
            authentication,
            policies,
        })
    }

    fn pipeline(
        &self,
        tree: &ValueTree,
        id: &str,
        record: &Table,
        errors: &mut Vec<ReferenceError>,
    ) -> Option<ResolvedPipeline> {
        let path = format!("pipelines.{}", id);
        let before = errors.len();
        let mut lists: [Vec<String>; 3] = Default::default();

        for (list, table) in lists.iter_mut().zip(PIPELINE_LISTS) {
            let Some(items) = record.get(table).and_then(|v| v.as_array()) else {
                continue;
            };
            for (i, item) in items.iter().enumerate() {
                let Some(component) = item.as_str() else {
                    continue;
                };
                if declared(tree, table, component) {
                    list.push(component.to_string());
                    continue;
                }

                let item_path = format!("{}.{}[{}]", path, table, i);
                let found = PIPELINE_LISTS.into_iter().find(|other| declared(tree, other, component));
                errors.push(match found {
                    Some(other) => ReferenceError::ReferenceTypeMismatch {
                        path: item_path,
                        id: component.to_string(),
                        expected: table.to_string(),
                        found: other.to_string(),
                    },
                    None => ReferenceError::UnresolvedReference {
                        path: item_path,
                        id: component.to_string(),
                        expected: table.to_string(),
                    },
                });
            }
        }

        if errors.len() > before {
            return None;
        }

        let mut settings = direct_settings(record);
        for table in PIPELINE_LISTS {
            settings.remove(table);
        }
        let [endpoints, backends, middleware] = lists;
        Some(ResolvedPipeline {
            path,
            id: id.to_string(),
            settings: layered([self.ctx.defaults_for(&format!("pipelines.{}", id)), settings]),
            endpoints,
            backends,
            middleware,
        })
    }

    /// Resolve the `authentication` field of `record` as a flat lookup.
    fn authentication(&self, owner: &str, record: &Table, errors: &mut Vec<ReferenceError>) -> Option<ResolvedEntity> {
        let value = reference_values(record, &AUTHENTICATION).into_iter().next()?;
        match self.ctx.lookup(owner, &value, EntityKind::Authentication) {
            Ok(entity) => Some(ResolvedEntity {
                id: value.id.to_string(),
                settings: self.ctx.entity_layer(entity),
            }),
            Err(e) => {
                errors.push(e);
                None
            }
        }
    }

    fn own_reference_errors(&self, owner: &str, kind: EntityKind, record: &Table, errors: &mut Vec<ReferenceError>) {
        for field in entity_reference_fields(kind) {
            for value in reference_values(record, field) {
                if let Err(e) = self.ctx.lookup(owner, &value, field.target) {
                    errors.push(e);
                }
            }
        }
    }
}

/// Table-valued entries of a component table.
fn records(table: &Table) -> impl Iterator<Item = (&str, &Table)> {
    table
        .iter()
        .filter_map(|(id, value)| value.as_table().map(|record| (id.as_str(), record)))
}

fn declared(tree: &ValueTree, table: &str, id: &str) -> bool {
    tree.get(table)
        .and_then(|v| v.as_table())
        .and_then(|t| t.get(id))
        .map(|v| v.is_table())
        .unwrap_or(false)
}

fn finish<T>(resolved: T, errors: Vec<ReferenceError>) -> Result<T, Vec<ReferenceError>> {
    if errors.is_empty() {
        Ok(resolved)
    } else {
        Err(dedupe(errors))
    }
}

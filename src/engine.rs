//! One configuration generation, end to end.
//!
//! # Responsibilities
//! - Validate the global document and every pipeline document against
//!   their schemas
//! - Resolve references of structurally valid documents against the
//!   generation's entity snapshot
//! - Merge per-document reports into one generation report
//!
//! # Design Decisions
//! - Pipelines are only resolved once the global document is structurally
//!   valid; its entity tables may be malformed otherwise
//! - A reference error found through several documents (a cyclic policy
//!   used by two middleware) is reported once, at its first occurrence
//! - Schemas are shared through `Arc`; an engine can be cloned into a
//!   watcher task cheaply

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::config::loader::{self, LoadError};
use crate::config::settings::EngineConfig;
use crate::observability::metrics;
use crate::report::Report;
use crate::resolve::{EntitySnapshot, ReferenceError, ResolvedGlobal, ResolvedPipelineDocument, Resolver};
use crate::schema::{bundled, SchemaDocument, SchemaLoadError};
use crate::validation::{validate, ValidationError};
use crate::ValueTree;

/// Errors that prevent a generation from being evaluated at all.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("schema `{name}` is unusable: {source}")]
    Schema {
        name: String,
        #[source]
        source: SchemaLoadError,
    },

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// A named configuration document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub name: String,
    pub tree: ValueTree,
}

impl Document {
    pub fn new(name: impl Into<String>, tree: ValueTree) -> Self {
        Self {
            name: name.into(),
            tree,
        }
    }
}

/// Every document of one configuration generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSources {
    pub global: Document,
    pub pipelines: Vec<Document>,
}

/// Resolved output of one pipeline document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedDocument {
    pub document: String,
    #[serde(flatten)]
    pub resolved: ResolvedPipelineDocument,
}

/// Fully resolved configuration generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedGeneration {
    pub global: ResolvedGlobal,
    pub pipelines: Vec<ResolvedDocument>,
}

/// Result of evaluating one generation.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub report: Report,
    /// Present only when the report is valid.
    pub resolved: Option<ResolvedGeneration>,
    pub entities: Arc<EntitySnapshot>,
}

/// Validation and resolution engine bound to a pair of schemas.
#[derive(Debug, Clone)]
pub struct Engine {
    config_schema: Arc<SchemaDocument>,
    pipeline_schema: Arc<SchemaDocument>,
    apply_schema_defaults: bool,
}

impl Engine {
    pub fn new(config_schema: SchemaDocument, pipeline_schema: SchemaDocument) -> Self {
        Self {
            config_schema: Arc::new(config_schema),
            pipeline_schema: Arc::new(pipeline_schema),
            apply_schema_defaults: false,
        }
    }

    /// Engine using the schemas shipped with the crate.
    pub fn bundled() -> Result<Self, EngineError> {
        let config = bundled::config_schema().map_err(|source| EngineError::Schema {
            name: "bundled config schema".to_string(),
            source,
        })?;
        let pipeline = bundled::pipeline_schema().map_err(|source| EngineError::Schema {
            name: "bundled pipeline schema".to_string(),
            source,
        })?;
        Ok(Self::new(config, pipeline))
    }

    /// Engine built from settings: schema overrides and resolution flags.
    pub fn from_settings(settings: &EngineConfig) -> Result<Self, EngineError> {
        let bundled = Self::bundled()?;
        let config_schema = match &settings.schemas.config {
            Some(path) => Arc::new(load_schema(path)?),
            None => bundled.config_schema,
        };
        let pipeline_schema = match &settings.schemas.pipeline {
            Some(path) => Arc::new(load_schema(path)?),
            None => bundled.pipeline_schema,
        };

        Ok(Self {
            config_schema,
            pipeline_schema,
            apply_schema_defaults: settings.resolution.apply_schema_defaults,
        })
    }

    pub fn with_schema_defaults(mut self, apply: bool) -> Self {
        self.apply_schema_defaults = apply;
        self
    }

    pub fn config_schema(&self) -> &SchemaDocument {
        &self.config_schema
    }

    pub fn pipeline_schema(&self) -> &SchemaDocument {
        &self.pipeline_schema
    }

    /// Validate and resolve one generation.
    pub fn evaluate(&self, sources: &GenerationSources) -> Evaluation {
        let global_errors = validate(&sources.global.tree, &self.config_schema);
        let entities = Arc::new(EntitySnapshot::from_tree(&sources.global.tree));
        let resolver = if self.apply_schema_defaults {
            Resolver::with_schema_defaults(&entities, vec![&*self.config_schema, &*self.pipeline_schema])
        } else {
            Resolver::new(&entities)
        };

        let mut seen = HashSet::new();
        let mut validation_count = global_errors.len();
        let mut reference_count = 0;

        let global_structurally_valid = global_errors.is_empty();
        let mut global = None;
        let mut global_refs = Vec::new();
        if global_structurally_valid {
            match resolver.resolve_global() {
                Ok(resolved) => global = Some(resolved),
                Err(errors) => global_refs = first_occurrences(errors, &mut seen),
            }
        }
        reference_count += global_refs.len();

        let mut report = Report::aggregate(&global_errors, &global_refs).for_document(&sources.global.name);
        let mut pipelines = Vec::with_capacity(sources.pipelines.len());

        for document in &sources.pipelines {
            let errors: Vec<ValidationError> = validate(&document.tree, &self.pipeline_schema);
            let mut refs = Vec::new();
            if errors.is_empty() && global_structurally_valid {
                match resolver.resolve_pipeline(&document.tree) {
                    Ok(resolved) => pipelines.push(ResolvedDocument {
                        document: document.name.clone(),
                        resolved,
                    }),
                    Err(found) => refs = first_occurrences(found, &mut seen),
                }
            }

            validation_count += errors.len();
            reference_count += refs.len();
            report.merge(Report::aggregate(&errors, &refs).for_document(&document.name));
        }

        metrics::record_evaluation(validation_count, reference_count);
        tracing::info!(
            documents = sources.pipelines.len() + 1,
            validation_errors = validation_count,
            reference_errors = reference_count,
            valid = report.is_valid(),
            "Configuration generation evaluated"
        );

        let resolved = match global {
            Some(global) if report.is_valid() => Some(ResolvedGeneration { global, pipelines }),
            _ => None,
        };

        Evaluation {
            report,
            resolved,
            entities: Arc::clone(&entities),
        }
    }
}

fn first_occurrences(errors: Vec<ReferenceError>, seen: &mut HashSet<ReferenceError>) -> Vec<ReferenceError> {
    errors.into_iter().filter(|e| seen.insert(e.clone())).collect()
}

/// Load a schema document from a TOML file.
pub fn load_schema(path: &Path) -> Result<SchemaDocument, EngineError> {
    let tree = loader::load_tree(path)?;
    crate::schema::load(&tree).map_err(|source| EngineError::Schema {
        name: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ErrorKind;

    fn document(name: &str, src: &str) -> Document {
        Document::new(name, toml::from_str(src).unwrap())
    }

    const GLOBAL: &str = r#"
        [proxy]
        id = "gw"

        [network.default]
        enable_wireguard = false

        [policies.p1]
        rules = ["r1"]

        [rules.r1]
        type = "delegate"
        policies = ["p1"]
    "#;

    #[test]
    fn test_cycle_reported_once_and_named_at_its_consumer() {
        let engine = Engine::bundled().unwrap();
        let sources = GenerationSources {
            global: document("config.toml", GLOBAL),
            pipelines: vec![document(
                "main.toml",
                r#"
                [pipelines.main]
                networks = ["default"]
                endpoints = ["inbound"]
                backends = ["upstream"]
                middleware = ["guard"]

                [endpoints.inbound]
                service = "http"

                [backends.upstream]
                service = "http"

                [middleware.guard]
                type = "policies"
                policies = ["p1"]
                "#,
            )],
        };

        let evaluation = engine.evaluate(&sources);
        assert!(!evaluation.report.is_valid());
        assert!(evaluation.resolved.is_none());
        let cycles: Vec<_> = evaluation
            .report
            .errors()
            .iter()
            .filter(|e| e.kind == ErrorKind::ReferenceCycle)
            .map(|e| (e.document.as_deref(), e.path.as_str()))
            .collect();
        assert_eq!(
            cycles,
            vec![
                (Some("config.toml"), "policies.p1"),
                (Some("main.toml"), "middleware.guard.policies[0]"),
            ]
        );
    }

    #[test]
    fn test_invalid_global_skips_resolution() {
        let engine = Engine::bundled().unwrap();
        let sources = GenerationSources {
            global: document("config.toml", "[targets.api]\nauthentication = 'nowhere'"),
            pipelines: Vec::new(),
        };
        let evaluation = engine.evaluate(&sources);
        assert!(evaluation
            .report
            .errors()
            .iter()
            .all(|e| !e.kind.is_reference()));
        assert_eq!(evaluation.report.errors()[0].kind, ErrorKind::MissingTable);
    }
}

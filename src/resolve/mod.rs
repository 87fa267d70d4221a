//! Reference resolution.
//!
//! # Responsibilities
//! - Snapshot the global entities of one configuration generation
//! - Resolve every reference in global and pipeline documents against it
//! - Produce effective configurations with settings merged by precedence
//!
//! # Data Flow
//! ```text
//! global tree ──▶ EntitySnapshot ──▶ ReferenceGraph (cycles)
//!                       │
//! pipeline tree ──▶ Resolver ──▶ EffectiveConfig per component
//!                       └──────▶ ReferenceError list
//! ```

pub mod effective;
pub mod entities;
pub mod error;
pub mod graph;
pub mod references;
pub mod resolver;

pub use effective::{ComponentKind, EffectiveConfig, ResolvedEntity, ResolvedPipeline, ResolvedPolicy, ResolvedRule};
pub use entities::{Entity, EntityKey, EntityKind, EntitySnapshot};
pub use error::ReferenceError;
pub use graph::ReferenceGraph;
pub use resolver::{ResolvedGlobal, ResolvedPipelineDocument, Resolver};

use crate::ValueTree;

/// Resolve every reference in one pipeline document against `entities`.
///
/// Either every reference resolves and the effective configurations are
/// returned, or every reference error found is.
pub fn resolve(tree: &ValueTree, entities: &EntitySnapshot) -> Result<ResolvedPipelineDocument, Vec<ReferenceError>> {
    Resolver::new(entities).resolve_pipeline(tree)
}

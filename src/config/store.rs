//! Live configuration generation.
//!
//! # Design Decisions
//! - The live generation sits behind an `ArcSwapOption`; publishing is one
//!   pointer swap and readers never see a half-applied generation
//! - A rejected candidate leaves the live generation untouched
//! - Generation IDs increase by one per published generation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::engine::{Engine, GenerationSources, ResolvedGeneration};
use crate::observability::metrics;
use crate::report::Report;
use crate::resolve::EntitySnapshot;

/// A published, fully resolved configuration generation.
#[derive(Debug)]
pub struct Generation {
    pub id: u64,
    pub sources: GenerationSources,
    pub entities: Arc<EntitySnapshot>,
    pub resolved: ResolvedGeneration,
}

/// Holds the live generation.
#[derive(Debug, Default)]
pub struct GenerationStore {
    current: ArcSwapOption<Generation>,
    published: AtomicU64,
}

impl GenerationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live generation, if one was ever published.
    pub fn current(&self) -> Option<Arc<Generation>> {
        self.current.load_full()
    }

    /// Evaluate a candidate generation and publish it if it is valid.
    pub fn apply(&self, engine: &Engine, sources: GenerationSources) -> Report {
        let evaluation = engine.evaluate(&sources);

        match evaluation.resolved {
            Some(resolved) => {
                let id = self.published.fetch_add(1, Ordering::Relaxed) + 1;
                self.current.store(Some(Arc::new(Generation {
                    id,
                    sources,
                    entities: evaluation.entities,
                    resolved,
                })));
                metrics::record_generation_published();
                tracing::info!(generation = id, "Configuration generation published");
            }
            None => {
                metrics::record_generation_rejected();
                tracing::warn!(
                    errors = evaluation.report.error_count(),
                    live_generation = ?self.current().map(|g| g.id),
                    "Configuration generation rejected, keeping the live generation"
                );
            }
        }

        evaluation.report
    }
}

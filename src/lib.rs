//! Gateway configuration validation and reference-resolution engine.
//!
//! # Architecture Overview
//!
//! ```text
//!   schema document (TOML)            config / pipeline documents (TOML)
//!           │                                      │
//!           ▼                                      ▼
//!   ┌───────────────┐                      ┌───────────────┐
//!   │ schema::load  │── SchemaDocument ───▶│  validation   │── ValidationError[]
//!   └───────────────┘                      └───────┬───────┘
//!                                                  │ zero structural errors
//!                                                  ▼
//!   global document ──▶ EntitySnapshot ───▶┌───────────────┐
//!                                          │    resolve    │── ReferenceError[]
//!                                          └───────┬───────┘
//!                                                  │ EffectiveConfig per component
//!                                                  ▼
//!                                          ┌───────────────┐
//!                                          │    report     │── Report {valid, errors}
//!                                          └───────────────┘
//! ```
//!
//! The [`engine::Engine`] runs one configuration generation (the global
//! document plus every pipeline document) through the whole flow. The
//! `config` subsystem loads documents from disk, watches them, and publishes
//! valid generations atomically.

// Core engine
pub mod engine;
pub mod report;
pub mod resolve;
pub mod schema;
pub mod validation;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

/// A parsed configuration document.
///
/// Tables keep their declaration order, which is what makes report ordering
/// follow the document.
pub type ValueTree = toml::Table;

pub use engine::{Document, Engine, EngineError, Evaluation, GenerationSources, ResolvedGeneration};
pub use report::Report;
pub use resolve::{resolve, EntitySnapshot, Resolver};
pub use schema::{SchemaDocument, SchemaLoadError};
pub use validation::{validate, ValidationError};

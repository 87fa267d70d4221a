//! Schema model subsystem.
//!
//! # Data Flow
//! ```text
//! schema file (TOML)
//!     → loader.rs (deserialize raw tables, compile regexes, parse conditions)
//!     → pattern.rs (table name patterns, ambiguity check)
//!     → SchemaDocument (immutable, shared via Arc)
//! ```
//!
//! # Design Decisions
//! - The schema is data, not compiled types: field types are a closed enum
//!   dispatched with `match`
//! - Every authoring mistake is caught at load time; the validator assumes a
//!   well-formed model
//! - A literal table name beats a pattern that also covers it

pub mod bundled;
pub mod loader;
pub mod model;
pub mod pattern;

pub use loader::{load, SchemaLoadError};
pub use model::{Condition, FieldSpec, FieldType, SchemaDocument, SemanticVersion, TableSpec};
pub use pattern::TablePattern;

//! Structural validation subsystem.
//!
//! # Data Flow
//! ```text
//! ValueTree + SchemaDocument
//!     → matcher.rs (table spec → matched instances, computed once per pass)
//!     → validator.rs (walk every instance and every field spec)
//!     → constraints.rs (type / enum / range / array / required_if checks)
//!     → Vec<ValidationError> (every problem, in schema declaration order)
//! ```
//!
//! # Design Decisions
//! - Never fail fast: a user sees every structural problem in one pass
//! - Unknown tables and fields are accepted (forward compatibility)
//! - `options` sub-tables are never enforced

pub mod constraints;
pub mod error;
pub mod matcher;
pub mod validator;

pub use error::ValidationError;
pub use matcher::{MatchPlan, SpecMatch};
pub use validator::validate;

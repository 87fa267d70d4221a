//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! engine.toml
//!     → settings.rs (EngineConfig, every field defaulted)
//!
//! config.toml + pipelines/*.toml
//!     → loader.rs (read & parse into value trees)
//!     → Engine::evaluate (validate & resolve)
//!     → store.rs (atomic swap of the live generation)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads the whole generation again
//!     → store.rs publishes it, or keeps the live one if it is invalid
//! ```
//!
//! # Design Decisions
//! - A generation is replaced as a whole; there are no partial updates
//! - A missing engine settings file means defaults

pub mod loader;
pub mod settings;
pub mod store;
pub mod watcher;

pub use loader::LoadError;
pub use settings::EngineConfig;
pub use store::{Generation, GenerationStore};
pub use watcher::ConfigWatcher;

//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! engine, loader, store, watcher produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (error and generation counters)
//!
//! Consumers:
//!     → stderr, pretty or JSON
//!     → Prometheus scrape endpoint (watch mode only)
//! ```
//!
//! # Design Decisions
//! - Counters go through the `metrics` facade; without an installed
//!   recorder they cost nothing
//! - Log level comes from `RUST_LOG` first, then the engine settings

pub mod logging;
pub mod metrics;

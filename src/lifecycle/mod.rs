//! Lifecycle management for long-running commands.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGINT/SIGTERM → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → every subscriber (watch loop) stops
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;

//! Metrics collection and exposition.
//!
//! # Metrics
//! - `config_validation_errors_total` (counter): structural errors found
//! - `config_reference_errors_total` (counter): reference errors found
//! - `config_generations_published_total` (counter): generations made live
//! - `config_generations_rejected_total` (counter): invalid candidates
//!
//! # Design Decisions
//! - The exporter is only installed by long-running commands

use std::net::SocketAddr;

use ::metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const VALIDATION_ERRORS: &str = "config_validation_errors_total";
pub const REFERENCE_ERRORS: &str = "config_reference_errors_total";
pub const GENERATIONS_PUBLISHED: &str = "config_generations_published_total";
pub const GENERATIONS_REJECTED: &str = "config_generations_rejected_total";

/// Serve the Prometheus scrape endpoint on `addr`. Needs a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(VALIDATION_ERRORS, "Structural validation errors found");
    describe_counter!(REFERENCE_ERRORS, "Reference resolution errors found");
    describe_counter!(GENERATIONS_PUBLISHED, "Configuration generations published");
    describe_counter!(GENERATIONS_REJECTED, "Configuration generations rejected");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_evaluation(validation_errors: usize, reference_errors: usize) {
    counter!(VALIDATION_ERRORS).increment(validation_errors as u64);
    counter!(REFERENCE_ERRORS).increment(reference_errors as u64);
}

pub fn record_generation_published() {
    counter!(GENERATIONS_PUBLISHED).increment(1);
}

pub fn record_generation_rejected() {
    counter!(GENERATIONS_REJECTED).increment(1);
}

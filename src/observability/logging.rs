//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for machines, pretty format for people
//! - Logs go to stderr so stdout stays free for reports

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::settings::{LogFormat, ObservabilityConfig};

/// Install the global subscriber. Returns an error if one is already set.
pub fn init(config: &ObservabilityConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_default_filter_covers_library_and_binary() {
        let config = ObservabilityConfig::default();
        let subscriber = tracing_subscriber::registry().with(EnvFilter::new(&config.log_level));

        tracing::subscriber::with_default(subscriber, || {
            assert!(tracing::enabled!(target: "gateway_config_engine::engine", Level::INFO));
            assert!(tracing::enabled!(target: "config_engine", Level::INFO));
            assert!(!tracing::enabled!(target: "config_engine", Level::DEBUG));
        });
    }
}

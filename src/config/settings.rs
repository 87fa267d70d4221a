//! Engine settings.
//!
//! These are the settings of the engine itself, not the gateway
//! configuration it validates. Every field has a default so an empty (or
//! missing) settings file is valid.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root settings for the configuration engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Where the gateway configuration lives.
    pub paths: PathsConfig,

    /// Schema documents to use instead of the bundled ones.
    pub schemas: SchemasConfig,

    /// Reference resolution behaviour.
    pub resolution: ResolutionConfig,

    /// Watch mode settings.
    pub watch: WatchConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

/// Location of the documents of one configuration generation.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// The global configuration document.
    pub config: PathBuf,

    /// Directory of pipeline documents (`*.toml`). When unset, the global
    /// document's `proxy.pipelines_path` is used, relative to that document.
    pub pipelines_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            config: PathBuf::from("config.toml"),
            pipelines_dir: None,
        }
    }
}

/// Schema overrides; `None` means the bundled schema.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct SchemasConfig {
    pub config: Option<PathBuf>,
    pub pipeline: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Layer schema `default` values beneath every effective configuration.
    pub apply_schema_defaults: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WatchConfig {
    /// Poll interval of the file watcher backend.
    pub poll_interval_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { poll_interval_secs: 2 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "gateway_config_engine=info,config_engine=info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_settings_use_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.watch.poll_interval_secs, 2);
        assert!(!config.resolution.apply_schema_defaults);
    }

    #[test]
    fn test_partial_settings() {
        let config: EngineConfig = toml::from_str(
            r#"
            [paths]
            pipelines_dir = "pipelines"

            [resolution]
            apply_schema_defaults = true

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.paths.config, PathBuf::from("config.toml"));
        assert_eq!(config.paths.pipelines_dir, Some(PathBuf::from("pipelines")));
        assert!(config.resolution.apply_schema_defaults);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.log_level, "gateway_config_engine=info,config_engine=info");
    }
}

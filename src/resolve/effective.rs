//! Effective configuration and settings layering.
//!
//! # Layers (lowest to highest precedence)
//! ```text
//! 0. schema defaults of the component's table        (opt-in)
//! 1. referenced entity: connection.* → direct fields → options.*
//! 2. component: connection.* → direct fields
//! 3. component: options.* (keys mapped through the option alias table)
//! ```
//!
//! # Design Decisions
//! - A layer only overrides keys it sets; it never removes a lower key
//! - Reference fields and the `options` / `connection` tables are never
//!   settings themselves
//! - Option aliases are explicit per component kind; unlisted keys keep
//!   their own name

use serde::Serialize;
use toml::{Table, Value};

/// Keys that never become settings.
const RESERVED: &[&str] = &[
    "options",
    "connection",
    "peer_ref",
    "target_ref",
    "authentication",
    "policies",
    "rules",
];

/// The kinds of component that get an effective configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Peer,
    Target,
    Endpoint,
    Backend,
    Middleware,
}

impl ComponentKind {
    /// Name of the table components of this kind are declared in.
    pub fn table(&self) -> &'static str {
        match self {
            Self::Peer => "peers",
            Self::Target => "targets",
            Self::Endpoint => "endpoints",
            Self::Backend => "backends",
            Self::Middleware => "middleware",
        }
    }

    /// `options.<key>` → setting name, for keys that name a setting
    /// differently from the direct field.
    pub fn option_aliases(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Backend => &[("timeout", "timeout_secs"), ("url", "base_url"), ("retries", "max_retries")],
            Self::Endpoint => &[("timeout", "timeout_secs"), ("path", "path_prefix")],
            Self::Peer | Self::Target => &[("timeout", "timeout_secs")],
            Self::Middleware => &[],
        }
    }

    /// The setting an `options.<key>` entry overrides.
    pub fn setting_for_option<'a>(&self, key: &'a str) -> &'a str {
        self.option_aliases()
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, setting)| *setting)
            .unwrap_or(key)
    }
}

/// A referenced entity resolved as a flat lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedEntity {
    pub id: String,
    pub settings: Table,
}

/// A rule with its settings and any policies it delegates to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedRule {
    pub id: String,
    pub settings: Table,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<ResolvedPolicy>,
}

/// A policy with its rules expanded in declared (evaluation) order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPolicy {
    pub id: String,
    pub settings: Table,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<ResolvedPolicy>,
    pub rules: Vec<ResolvedRule>,
}

/// The merged, reference-resolved view of one component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveConfig {
    /// Dotted path of the component (`backends.my_api`).
    pub path: String,
    pub kind: ComponentKind,
    pub id: String,
    /// Path of the entity settings were inherited from (`targets.api`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inherits: Option<String>,
    pub settings: Table,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<ResolvedEntity>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<ResolvedPolicy>,
}

impl EffectiveConfig {
    pub fn get(&self, setting: &str) -> Option<&Value> {
        self.settings.get(setting)
    }
}

/// A pipeline with its component lists checked against the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPipeline {
    pub path: String,
    pub id: String,
    pub settings: Table,
    pub endpoints: Vec<String>,
    pub backends: Vec<String>,
    pub middleware: Vec<String>,
}

/// Inline `connection.*` fields, then direct fields, of one record.
pub fn direct_settings(record: &Table) -> Table {
    let mut settings = Table::new();
    if let Some(connection) = record.get("connection").and_then(Value::as_table) {
        overlay(&mut settings, connection.clone());
    }
    for (key, value) in record.iter() {
        if !RESERVED.contains(&key.as_str()) {
            settings.insert(key.clone(), value.clone());
        }
    }
    settings
}

/// `options.*` fields of one record, keyed by the setting they override.
pub fn option_settings(kind: Option<ComponentKind>, record: &Table) -> Table {
    let mut settings = Table::new();
    if let Some(options) = record.get("options").and_then(Value::as_table) {
        for (key, value) in options.iter() {
            let name = kind.map(|k| k.setting_for_option(key)).unwrap_or(key.as_str());
            settings.insert(name.to_string(), value.clone());
        }
    }
    settings
}

/// Direct and option settings of an entity, as a single lower layer.
pub fn entity_settings(kind: Option<ComponentKind>, record: &Table) -> Table {
    let mut settings = direct_settings(record);
    overlay(&mut settings, option_settings(kind, record));
    settings
}

/// Merge layers, lowest precedence first.
pub fn layered<I: IntoIterator<Item = Table>>(layers: I) -> Table {
    let mut settings = Table::new();
    for layer in layers {
        overlay(&mut settings, layer);
    }
    settings
}

fn overlay(base: &mut Table, layer: Table) {
    for (key, value) in layer {
        base.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(src: &str) -> Table {
        toml::from_str(src).unwrap()
    }

    #[test]
    fn test_direct_settings_flatten_connection() {
        let record = table(
            r#"
            authentication = "oauth"
            timeout_secs = 60
            [connection]
            host = "api.example.com"
            timeout_secs = 5
            [options]
            retries = 2
            "#,
        );
        let settings = direct_settings(&record);
        assert_eq!(settings.get("host"), Some(&Value::String("api.example.com".into())));
        assert_eq!(settings.get("timeout_secs"), Some(&Value::Integer(60)));
        assert!(settings.get("authentication").is_none());
        assert!(settings.get("options").is_none());
        assert!(settings.get("retries").is_none());
    }

    #[test]
    fn test_option_aliases() {
        let record = table("[options]\ntimeout = 5\nurl = 'https://x'\ncustom = true");
        let settings = option_settings(Some(ComponentKind::Backend), &record);
        assert_eq!(settings.get("timeout_secs"), Some(&Value::Integer(5)));
        assert_eq!(settings.get("base_url"), Some(&Value::String("https://x".into())));
        assert_eq!(settings.get("custom"), Some(&Value::Boolean(true)));

        let settings = option_settings(Some(ComponentKind::Middleware), &record);
        assert!(settings.get("timeout").is_some());
    }

    #[test]
    fn test_layers_never_clear_lower_keys() {
        let merged = layered([table("a = 1\nb = 1"), table("b = 2"), table("c = 3")]);
        assert_eq!(merged, table("a = 1\nb = 2\nc = 3"));
    }
}

//! Schema documents shipped with the engine.

use crate::schema::loader::SchemaLoadError;
use crate::schema::model::SchemaDocument;

/// Source of the global configuration schema.
pub const CONFIG_SCHEMA: &str = include_str!("../../schemas/config-schema.toml");

/// Source of the pipeline schema.
pub const PIPELINE_SCHEMA: &str = include_str!("../../schemas/pipeline-schema.toml");

/// Load the bundled global configuration schema.
pub fn config_schema() -> Result<SchemaDocument, SchemaLoadError> {
    SchemaDocument::from_toml_str(CONFIG_SCHEMA)
}

/// Load the bundled pipeline schema.
pub fn pipeline_schema() -> Result<SchemaDocument, SchemaLoadError> {
    SchemaDocument::from_toml_str(PIPELINE_SCHEMA)
}

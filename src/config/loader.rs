//! Loading documents from disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::settings::EngineConfig;
use crate::engine::{Document, GenerationSources};
use crate::ValueTree;

/// Pipeline directory used when the global document does not name one.
pub const DEFAULT_PIPELINES_PATH: &str = "pipelines";

/// Error type for reading a document from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse `{}`: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a TOML file into a value tree.
pub fn load_tree(path: &Path) -> Result<ValueTree, LoadError> {
    let content = read(path)?;
    toml::from_str(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load one configuration document, named after its path.
pub fn load_document(path: &Path) -> Result<Document, LoadError> {
    let tree = load_tree(path)?;
    Ok(Document::new(path.display().to_string(), tree))
}

/// The `*.toml` files of a pipeline directory, sorted by file name. A
/// missing directory holds no pipelines.
pub fn pipeline_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(dir = %dir.display(), "Pipeline directory does not exist");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(LoadError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| LoadError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "toml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// The pipeline directory a global document points at through
/// `proxy.pipelines_path`, relative to the document's own directory.
pub fn pipelines_dir_for(config_path: &Path, global: &ValueTree) -> PathBuf {
    let relative = global
        .get("proxy")
        .and_then(|proxy| proxy.get("pipelines_path"))
        .and_then(|path| path.as_str())
        .unwrap_or(DEFAULT_PIPELINES_PATH);
    config_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(relative)
}

/// Load one configuration generation: the global document, every pipeline
/// document in the pipeline directory, then any extra pipeline files.
pub fn load_sources(
    config_path: &Path,
    pipelines_dir: Option<&Path>,
    extra_pipelines: &[PathBuf],
) -> Result<GenerationSources, LoadError> {
    let global = load_document(config_path)?;
    let dir = match pipelines_dir {
        Some(dir) => dir.to_path_buf(),
        None => pipelines_dir_for(config_path, &global.tree),
    };

    let mut files = pipeline_files(&dir)?;
    for extra in extra_pipelines {
        if !files.contains(extra) {
            files.push(extra.clone());
        }
    }

    let pipelines = files
        .iter()
        .map(|path| load_document(path))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(
        config = %config_path.display(),
        pipelines = pipelines.len(),
        "Configuration generation loaded"
    );
    Ok(GenerationSources { global, pipelines })
}

/// Load engine settings. A missing file yields the defaults.
pub fn load_engine_config(path: &Path) -> Result<EngineConfig, LoadError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(EngineConfig::default()),
        Err(source) => {
            return Err(LoadError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    toml::from_str(&content).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

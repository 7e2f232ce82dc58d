//! Spec directory loading
//!
//! A spec directory is read once at boot:
//!
//! ```text
//! specs/
//!   schemas/vertices/<collection>.json
//!   schemas/edges/<collection>.json
//!   views/<view>.aql
//! ```
//!
//! Missing subdirectories are treated as empty. Files with other extensions
//! are skipped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use docgate_core::DocumentKind;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::registry::{SchemaRegistry, SpecRegistry};
use crate::validator::Schema;

/// Errors raised while building a registry.
#[derive(Debug, Error)]
pub enum SpecError {
    /// A file or directory could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// A schema file is not valid JSON.
    #[error("invalid JSON in {}: {reason}", path.display())]
    InvalidJson {
        /// Offending path.
        path: PathBuf,
        /// Parser diagnostic.
        reason: String,
    },

    /// A schema document is not a valid JSON Schema.
    #[error("invalid schema for collection {name}: {reason}")]
    InvalidSchema {
        /// Collection name.
        name: String,
        /// Compiler diagnostic.
        reason: String,
    },

    /// The same collection is declared as both vertex and edge.
    #[error("collection {name} is declared more than once")]
    DuplicateCollection {
        /// Collection name.
        name: String,
    },
}

impl SpecRegistry {
    /// Load every schema and view under `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error naming the offending file if any schema cannot be
    /// read, parsed or compiled.
    pub fn load_dir(dir: &Path) -> Result<Self, SpecError> {
        let mut registry = SpecRegistry::new();

        for kind in [DocumentKind::Vertex, DocumentKind::Edge] {
            let schema_dir = dir.join("schemas").join(kind.plural());
            for (name, path) in list_files(&schema_dir, "json")? {
                if registry.schema_for(&name).is_some() {
                    return Err(SpecError::DuplicateCollection { name });
                }
                let content = read(&path)?;
                let source: Value =
                    serde_json::from_str(&content).map_err(|e| SpecError::InvalidJson {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?;
                debug!(collection = %name, ?kind, "registering schema");
                registry.register_schema(Schema::compile(name, kind, source)?);
            }
        }

        for (name, path) in list_files(&dir.join("views"), "aql")? {
            registry.register_view(name, read(&path)?);
        }

        info!(
            dir = %dir.display(),
            schemas = registry.schemas().count(),
            views = registry.view_count(),
            "loaded specs"
        );
        Ok(registry)
    }
}

fn read(path: &Path) -> Result<String, SpecError> {
    fs::read_to_string(path).map_err(|source| SpecError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Files in `dir` with extension `ext`, as `(stem, path)` sorted by stem.
fn list_files(dir: &Path, ext: &str) -> Result<Vec<(String, PathBuf)>, SpecError> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "spec directory absent, skipping");
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|source| SpecError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| SpecError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        if path.extension().and_then(|e| e.to_str()) != Some(ext) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.push((stem.to_string(), path.clone()));
        }
    }
    files.sort();
    Ok(files)
}

//! Spec directory reloads while serving.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use docgate_core::{Backend, BackendError};
use docgate_schema::{SharedSpecs, SpecRegistry};
use tracing::{debug, info, warn};

use crate::error::ServeError;

/// What a reload installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadSummary {
    /// Schemas registered after the reload.
    pub schemas: usize,
    /// Views registered after the reload.
    pub views: usize,
    /// Collections checked or created, when requested.
    pub collections: usize,
}

/// Loads the spec directory into the registry the executor reads from.
pub struct SpecReloader {
    dir: PathBuf,
    specs: Arc<SharedSpecs>,
    backend: Arc<dyn Backend>,
}

impl SpecReloader {
    /// Reload `dir` into `specs`, creating collections on `backend`.
    pub fn new(dir: impl Into<PathBuf>, specs: Arc<SharedSpecs>, backend: Arc<dyn Backend>) -> Self {
        Self {
            dir: dir.into(),
            specs,
            backend,
        }
    }

    /// The spec directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The registry reloads are installed into.
    pub fn specs(&self) -> &Arc<SharedSpecs> {
        &self.specs
    }

    /// Read the spec directory again and install it.
    ///
    /// With `reset`, the loaded directory replaces the registry, so removed
    /// files stop being served. Without it, loaded entries are merged over
    /// the current ones. With `init_collections`, every schema's collection
    /// is created before the new registry is installed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory is invalid or a collection cannot be
    /// created. The current registry stays in place in both cases.
    pub fn reload(&self, reset: bool, init_collections: bool) -> Result<ReloadSummary, ServeError> {
        let loaded = SpecRegistry::load_dir(&self.dir)?;
        let next = if reset {
            loaded
        } else {
            let mut merged = SpecRegistry::clone(&self.specs.snapshot());
            merged.merge(loaded);
            merged
        };
        let collections = if init_collections {
            ensure_collections(self.backend.as_ref(), &next, false)?
        } else {
            0
        };
        let summary = ReloadSummary {
            schemas: next.schema_count(),
            views: next.view_count(),
            collections,
        };
        self.specs.replace(next);
        info!(
            dir = %self.dir.display(),
            reset,
            schemas = summary.schemas,
            views = summary.views,
            collections = summary.collections,
            "specs reloaded"
        );
        Ok(summary)
    }
}

impl std::fmt::Debug for SpecReloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecReloader")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

/// Create the collection of every schema in `specs`. Returns how many are
/// ready.
///
/// With `tolerate_unavailable`, an unreachable database is logged and the
/// collection skipped.
pub(crate) fn ensure_collections(
    backend: &dyn Backend,
    specs: &SpecRegistry,
    tolerate_unavailable: bool,
) -> Result<usize, ServeError> {
    let mut ready = 0;
    for schema in specs.schemas() {
        match backend.ensure_collection(schema.name(), schema.kind()) {
            Ok(()) => {
                debug!(collection = schema.name(), "collection ready");
                ready += 1;
            }
            Err(BackendError::Unavailable { reason }) if tolerate_unavailable => {
                warn!(collection = schema.name(), %reason, "database unreachable, collection not checked");
            }
            Err(source) => {
                return Err(ServeError::Collection {
                    collection: schema.name().to_string(),
                    source,
                })
            }
        }
    }
    Ok(ready)
}

//! Read-only schema and view lookups.
//!
//! The executor consumes these traits; it never loads or refreshes specs
//! itself. [`SpecRegistry`] is the in-memory implementation, built
//! programmatically or from a spec directory. [`SharedSpecs`] wraps one so
//! the serving layer can swap in a reloaded registry while requests run.

use std::collections::BTreeMap;
use std::sync::Arc;

use docgate_core::DocumentKind;
use parking_lot::RwLock;

use crate::validator::Schema;

/// Lookup of the schema governing a collection.
pub trait SchemaRegistry: Send + Sync {
    /// Schema registered for `collection`, if any.
    fn schema_for(&self, collection: &str) -> Option<Arc<Schema>>;

    /// Sorted names of the collections of `kind` that have a schema.
    fn schema_names(&self, kind: DocumentKind) -> Vec<String>;
}

/// Lookup of named, pre-registered queries.
pub trait ViewRegistry: Send + Sync {
    /// Query text registered under `name`, if any.
    fn query_for(&self, name: &str) -> Option<String>;

    /// Sorted view names.
    fn view_names(&self) -> Vec<String>;
}

/// In-memory schema and view registry.
#[derive(Debug, Clone, Default)]
pub struct SpecRegistry {
    schemas: BTreeMap<String, Arc<Schema>>,
    views: BTreeMap<String, String>,
}

impl SpecRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the schema for its collection.
    pub fn register_schema(&mut self, schema: Schema) -> &mut Self {
        self.schemas
            .insert(schema.name().to_string(), Arc::new(schema));
        self
    }

    /// Register (or replace) a named view.
    pub fn register_view(&mut self, name: impl Into<String>, query: impl Into<String>) -> &mut Self {
        self.views.insert(name.into(), query.into());
        self
    }

    /// Iterate over every registered schema.
    pub fn schemas(&self) -> impl Iterator<Item = &Arc<Schema>> {
        self.schemas.values()
    }

    /// Number of registered schemas.
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// Number of registered views.
    pub fn view_count(&self) -> usize {
        self.views.len()
    }

    /// Add every entry of `newer`, replacing entries with the same name.
    pub fn merge(&mut self, newer: SpecRegistry) -> &mut Self {
        self.schemas.extend(newer.schemas);
        self.views.extend(newer.views);
        self
    }
}

impl SchemaRegistry for SpecRegistry {
    fn schema_for(&self, collection: &str) -> Option<Arc<Schema>> {
        self.schemas.get(collection).cloned()
    }

    fn schema_names(&self, kind: DocumentKind) -> Vec<String> {
        self.schemas
            .values()
            .filter(|s| s.kind() == kind)
            .map(|s| s.name().to_string())
            .collect()
    }
}

impl ViewRegistry for SpecRegistry {
    fn query_for(&self, name: &str) -> Option<String> {
        self.views.get(name).cloned()
    }

    fn view_names(&self) -> Vec<String> {
        self.views.keys().cloned().collect()
    }
}

/// A [`SpecRegistry`] that can be replaced as a whole.
///
/// Each lookup reads the registry current at that moment; a request that
/// already resolved its schema keeps using it after a swap.
#[derive(Debug, Default)]
pub struct SharedSpecs {
    current: RwLock<Arc<SpecRegistry>>,
}

impl SharedSpecs {
    /// Wrap `specs`.
    pub fn new(specs: SpecRegistry) -> Self {
        Self {
            current: RwLock::new(Arc::new(specs)),
        }
    }

    /// The registry in effect now.
    pub fn snapshot(&self) -> Arc<SpecRegistry> {
        Arc::clone(&*self.current.read())
    }

    /// Install `specs`, returning the registry it replaces.
    pub fn replace(&self, specs: SpecRegistry) -> Arc<SpecRegistry> {
        std::mem::replace(&mut *self.current.write(), Arc::new(specs))
    }
}

impl SchemaRegistry for SharedSpecs {
    fn schema_for(&self, collection: &str) -> Option<Arc<Schema>> {
        self.current.read().schema_for(collection)
    }

    fn schema_names(&self, kind: DocumentKind) -> Vec<String> {
        self.current.read().schema_names(kind)
    }
}

impl ViewRegistry for SharedSpecs {
    fn query_for(&self, name: &str) -> Option<String> {
        self.current.read().query_for(name)
    }

    fn view_names(&self) -> Vec<String> {
        self.current.read().view_names()
    }
}

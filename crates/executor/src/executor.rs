//! The Executor - single entry point to the gateway's operations.
//!
//! The Executor routes commands to handlers. The only state it owns is the
//! cursor table; schemas, views and storage are injected collaborators.

use std::sync::Arc;
use std::time::Duration;

use docgate_core::{Backend, Result};
use docgate_schema::{SchemaRegistry, ViewRegistry};
use tracing::debug;

use crate::cursor::CursorStore;
use crate::{Command, Output};

/// Paging and cursor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Rows per page when the request does not ask for a size.
    pub page_size: usize,
    /// Upper bound for a requested page size.
    pub max_page_size: usize,
    /// Idle time after which a cursor is expired.
    pub cursor_ttl: Duration,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            page_size: 100,
            max_page_size: 1000,
            cursor_ttl: Duration::from_secs(30),
        }
    }
}

impl ExecutorOptions {
    /// Effective page size for a request, clamped to `[1, max_page_size]`.
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

/// Collaborators shared by every handler.
pub(crate) struct Services {
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) schemas: Arc<dyn SchemaRegistry>,
    pub(crate) views: Arc<dyn ViewRegistry>,
    pub(crate) cursors: CursorStore,
    pub(crate) options: ExecutorOptions,
}

/// The command executor.
///
/// # Thread Safety
///
/// Executor is `Send + Sync`; share it behind an `Arc`. Calls block on
/// backend I/O, so async callers should run them on a blocking pool.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use docgate_backend::MemoryBackend;
/// use docgate_executor::{Command, Executor, ExecutorOptions};
/// use docgate_schema::SpecRegistry;
///
/// let executor = Executor::with_specs(
///     Arc::new(MemoryBackend::new()),
///     Arc::new(SpecRegistry::new()),
///     ExecutorOptions::default(),
/// );
/// let output = executor.execute(Command::ListViews)?;
/// ```
pub struct Executor {
    services: Arc<Services>,
}

impl Executor {
    /// Create an executor from separate schema and view registries.
    pub fn new(
        backend: Arc<dyn Backend>,
        schemas: Arc<dyn SchemaRegistry>,
        views: Arc<dyn ViewRegistry>,
        options: ExecutorOptions,
    ) -> Self {
        let cursors = CursorStore::new(Arc::clone(&backend), options.cursor_ttl);
        Self {
            services: Arc::new(Services {
                backend,
                schemas,
                views,
                cursors,
                options,
            }),
        }
    }

    /// Create an executor whose schemas and views come from one registry,
    /// such as a [`SpecRegistry`](docgate_schema::SpecRegistry) or a
    /// swappable [`SharedSpecs`](docgate_schema::SharedSpecs).
    pub fn with_specs<R>(backend: Arc<dyn Backend>, specs: Arc<R>, options: ExecutorOptions) -> Self
    where
        R: SchemaRegistry + ViewRegistry + 'static,
    {
        let schemas: Arc<dyn SchemaRegistry> = specs.clone();
        let views: Arc<dyn ViewRegistry> = specs;
        Self::new(backend, schemas, views, options)
    }

    /// Execute a single command.
    pub fn execute(&self, cmd: Command) -> Result<Output> {
        debug!(command = cmd.name(), "executing");
        let s = &self.services;
        match cmd {
            Command::SaveDocuments {
                collection,
                payload,
                on_duplicate,
                display_errors,
            } => crate::handlers::documents::save_documents(
                s,
                collection,
                payload,
                on_duplicate,
                display_errors,
            ),

            Command::QueryView {
                view,
                bind_vars,
                batch_size,
            } => crate::handlers::query::query_view(s, view, bind_vars, batch_size),
            Command::QueryRaw {
                query,
                bind_vars,
                batch_size,
            } => crate::handlers::query::query_raw(s, query, bind_vars, batch_size),
            Command::FetchCursor { cursor_id } => {
                crate::handlers::query::fetch_cursor(s, cursor_id)
            }

            Command::ListViews => crate::handlers::specs::list_views(s),
            Command::ShowView { name } => crate::handlers::specs::show_view(s, name),
            Command::ListSchemas => crate::handlers::specs::list_schemas(s),
            Command::ShowSchema { name } => crate::handlers::specs::show_schema(s, name),
            Command::Status => crate::handlers::specs::status(s),
        }
    }

    /// Execute multiple commands sequentially.
    ///
    /// Returns all results in input order; execution continues past failures.
    pub fn execute_many(&self, cmds: Vec<Command>) -> Vec<Result<Output>> {
        cmds.into_iter().map(|cmd| self.execute(cmd)).collect()
    }

    /// Expire idle cursors. Returns how many were removed.
    pub fn sweep_cursors(&self) -> usize {
        self.services.cursors.sweep_expired()
    }

    /// Expire one cursor now. Returns whether it was open.
    pub fn expire_cursor(&self, cursor_id: &str) -> bool {
        self.services.cursors.expire(cursor_id)
    }

    /// Number of open cursors.
    pub fn open_cursors(&self) -> usize {
        self.services.cursors.len()
    }

    /// Paging settings in effect.
    pub fn options(&self) -> ExecutorOptions {
        self.services.options
    }

    /// The storage adapter.
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.services.backend
    }
}

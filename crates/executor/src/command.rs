//! Command enum defining every gateway operation.
//!
//! Commands are:
//! - **Self-contained**: all parameters needed for execution are in the variant
//! - **Serializable**: can be logged or replayed as JSON
//! - **Pure data**: the HTTP layer builds them, the [`Executor`](crate::Executor) runs them

use docgate_core::{BindVars, DuplicatePolicy};
use docgate_security::Role;
use serde::{Deserialize, Serialize};

/// A self-contained gateway operation.
///
/// # Command Categories
///
/// | Category | Commands | Role |
/// |----------|----------|------|
/// | Ingest | `SaveDocuments` | Admin |
/// | Query | `QueryView`, `FetchCursor` | User |
/// | Query | `QueryRaw` | Admin |
/// | Specs | `ListViews`, `ShowView`, `ListSchemas`, `ShowSchema` | public |
/// | Database | `Status` | public |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub enum Command {
    // ==================== Ingest ====================
    /// Validate and write a newline-delimited batch.
    /// Returns: `Output::Batch`
    SaveDocuments {
        collection: String,
        payload: String,
        #[serde(default)]
        on_duplicate: DuplicatePolicy,
        #[serde(default)]
        display_errors: bool,
    },

    // ==================== Query ====================
    /// Run a registered view.
    /// Returns: `Output::Query`
    QueryView {
        view: String,
        #[serde(default)]
        bind_vars: BindVars,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        batch_size: Option<usize>,
    },

    /// Run ad-hoc query text.
    /// Returns: `Output::Query`
    QueryRaw {
        query: String,
        #[serde(default)]
        bind_vars: BindVars,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        batch_size: Option<usize>,
    },

    /// Continue a paginated result.
    /// Returns: `Output::Query`
    FetchCursor { cursor_id: String },

    // ==================== Specs ====================
    /// Returns: `Output::ViewList`
    ListViews,

    /// Returns: `Output::ViewSource`
    ShowView { name: String },

    /// Returns: `Output::SchemaList`
    ListSchemas,

    /// Returns: `Output::Schema`
    ShowSchema { name: String },

    // ==================== Database ====================
    /// Returns: `Output::Status`
    Status,
}

/// A [`Command`] variant without its arguments.
///
/// Lets the HTTP layer check permissions before it parses any parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// [`Command::SaveDocuments`]
    SaveDocuments,
    /// [`Command::QueryView`]
    QueryView,
    /// [`Command::QueryRaw`]
    QueryRaw,
    /// [`Command::FetchCursor`]
    FetchCursor,
    /// [`Command::ListViews`]
    ListViews,
    /// [`Command::ShowView`]
    ShowView,
    /// [`Command::ListSchemas`]
    ListSchemas,
    /// [`Command::ShowSchema`]
    ShowSchema,
    /// [`Command::Status`]
    Status,
}

impl CommandKind {
    /// Minimum role needed to run this kind of command; `None` when public.
    pub fn required_role(self) -> Option<Role> {
        match self {
            CommandKind::SaveDocuments | CommandKind::QueryRaw => Some(Role::Admin),
            CommandKind::QueryView | CommandKind::FetchCursor => Some(Role::User),
            CommandKind::ListViews
            | CommandKind::ShowView
            | CommandKind::ListSchemas
            | CommandKind::ShowSchema
            | CommandKind::Status => None,
        }
    }

    /// Short name for logs.
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::SaveDocuments => "SaveDocuments",
            CommandKind::QueryView => "QueryView",
            CommandKind::QueryRaw => "QueryRaw",
            CommandKind::FetchCursor => "FetchCursor",
            CommandKind::ListViews => "ListViews",
            CommandKind::ShowView => "ShowView",
            CommandKind::ListSchemas => "ListSchemas",
            CommandKind::ShowSchema => "ShowSchema",
            CommandKind::Status => "Status",
        }
    }
}

impl Command {
    /// The variant of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::SaveDocuments { .. } => CommandKind::SaveDocuments,
            Command::QueryView { .. } => CommandKind::QueryView,
            Command::QueryRaw { .. } => CommandKind::QueryRaw,
            Command::FetchCursor { .. } => CommandKind::FetchCursor,
            Command::ListViews => CommandKind::ListViews,
            Command::ShowView { .. } => CommandKind::ShowView,
            Command::ListSchemas => CommandKind::ListSchemas,
            Command::ShowSchema { .. } => CommandKind::ShowSchema,
            Command::Status => CommandKind::Status,
        }
    }

    /// Minimum role needed to run this command; `None` when public.
    pub fn required_role(&self) -> Option<Role> {
        self.kind().required_role()
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }
}

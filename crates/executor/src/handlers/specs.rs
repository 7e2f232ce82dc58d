//! Schema, view and status handlers.

use std::sync::Arc;

use docgate_core::{DocumentKind, Error, Result};

use crate::executor::Services;
use crate::Output;

/// Handle ListViews command.
pub fn list_views(s: &Arc<Services>) -> Result<Output> {
    Ok(Output::ViewList(s.views.view_names()))
}

/// Handle ShowView command.
pub fn show_view(s: &Arc<Services>, name: String) -> Result<Output> {
    crate::handlers::query::resolve_view(s, &name).map(Output::ViewSource)
}

/// Handle ListSchemas command.
pub fn list_schemas(s: &Arc<Services>) -> Result<Output> {
    Ok(Output::SchemaList {
        vertices: s.schemas.schema_names(DocumentKind::Vertex),
        edges: s.schemas.schema_names(DocumentKind::Edge),
    })
}

/// Handle ShowSchema command.
pub fn show_schema(s: &Arc<Services>, name: String) -> Result<Output> {
    let schema = s
        .schemas
        .schema_for(&name)
        .ok_or(Error::SchemaNotFound { collection: name })?;
    Ok(Output::Schema(schema.source().clone()))
}

/// Handle Status command.
pub fn status(s: &Arc<Services>) -> Result<Output> {
    Ok(Output::Status {
        arangodb_status: s.backend.status(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

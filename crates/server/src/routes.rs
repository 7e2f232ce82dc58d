//! HTTP routes.
//!
//! Each handler authorizes first, then turns the request into a [`Command`]
//! and runs it on the blocking pool. Parameter problems surface as
//! `InvalidParameter` only after the caller is known to be allowed in.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use docgate_core::{BatchOutcome, BindVars, DuplicatePolicy, Error, QueryResult};
use docgate_executor::{Command, CommandKind, Executor, Output};
use docgate_security::{Role, TokenTable};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::task;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::specs::SpecReloader;
use crate::Gateway;

/// Shared state behind every route.
pub struct ServerState {
    executor: Arc<Executor>,
    reloader: Arc<SpecReloader>,
    tokens: TokenTable,
}

impl ServerState {
    /// Bundle a booted gateway with the token table used to authorize requests.
    pub fn new(gateway: Gateway, tokens: TokenTable) -> Self {
        Self {
            executor: gateway.executor,
            reloader: gateway.reloader,
            tokens,
        }
    }

    /// The executor requests are run on.
    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }
}

/// State handle passed to handlers.
pub type AppState = Arc<ServerState>;

/// Build the gateway router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status_handler))
        .route("/api/documents", put(save_documents_handler))
        .route("/api/query_results", post(query_results_handler))
        .route("/api/views", get(list_views_handler))
        .route("/api/views/:name", get(show_view_handler))
        .route("/api/schemas", get(list_schemas_handler))
        .route("/api/schemas/:name", get(show_schema_handler))
        .route("/api/update_specs", get(update_specs_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Check the caller against `required`; `None` lets anyone in.
fn authorize(
    state: &ServerState,
    headers: &HeaderMap,
    required: Option<Role>,
) -> Result<(), AppError> {
    let Some(required) = required else {
        return Ok(());
    };
    // A header that is not visible ASCII cannot carry a known token.
    let header = headers
        .get(AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default());
    state.tokens.authorize(header, required)?;
    Ok(())
}

async fn run(state: &AppState, cmd: Command) -> Result<Output, AppError> {
    let executor = Arc::clone(&state.executor);
    let output = task::spawn_blocking(move || executor.execute(cmd)).await??;
    Ok(output)
}

fn unexpected(output: &Output) -> AppError {
    AppError::Gateway(Error::Internal {
        reason: format!("unexpected output {:?}", output),
    })
}

fn invalid_parameter(name: &str, reason: impl Into<String>) -> Error {
    Error::InvalidParameter {
        name: name.to_string(),
        reason: reason.into(),
    }
}

// =============================================================================
// Status and specs
// =============================================================================

async fn status_handler(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    match run(&state, Command::Status).await? {
        Output::Status {
            arangodb_status,
            version,
        } => Ok(Json(json!({
            "arangodb_status": arangodb_status,
            "version": version,
        }))),
        other => Err(unexpected(&other)),
    }
}

async fn list_views_handler(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    match run(&state, Command::ListViews).await? {
        Output::ViewList(names) => Ok(Json(names)),
        other => Err(unexpected(&other)),
    }
}

async fn show_view_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<String, AppError> {
    match run(&state, Command::ShowView { name }).await? {
        Output::ViewSource(source) => Ok(source),
        other => Err(unexpected(&other)),
    }
}

async fn list_schemas_handler(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    match run(&state, Command::ListSchemas).await? {
        Output::SchemaList { vertices, edges } => {
            Ok(Json(json!({ "vertices": vertices, "edges": edges })))
        }
        other => Err(unexpected(&other)),
    }
}

async fn show_schema_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, AppError> {
    match run(&state, Command::ShowSchema { name }).await? {
        Output::Schema(schema) => Ok(Json(schema)),
        other => Err(unexpected(&other)),
    }
}

// =============================================================================
// Documents
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct DocumentParams {
    #[serde(default)]
    collection: Option<String>,
    #[serde(default)]
    on_duplicate: Option<String>,
    #[serde(default)]
    display_errors: Option<String>,
}

impl DocumentParams {
    fn into_command(self, body: Bytes) -> Result<Command, Error> {
        let collection = self
            .collection
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| invalid_parameter("collection", "required"))?;
        let on_duplicate = match self.on_duplicate.as_deref() {
            None | Some("") => DuplicatePolicy::default(),
            Some(raw) => raw.parse::<DuplicatePolicy>()?,
        };
        let display_errors = parse_flag("display_errors", self.display_errors.as_deref())?;
        let payload = String::from_utf8(body.to_vec())
            .map_err(|e| invalid_parameter("body", format!("not valid UTF-8: {}", e)))?;
        Ok(Command::SaveDocuments {
            collection,
            payload,
            on_duplicate,
            display_errors,
        })
    }
}

fn parse_flag(name: &str, raw: Option<&str>) -> Result<bool, Error> {
    match raw.map(str::trim) {
        None | Some("") | Some("0") | Some("false") => Ok(false),
        Some("1") | Some("true") => Ok(true),
        Some(other) => Err(invalid_parameter(
            name,
            format!("'{}' is not one of 0, 1, true, false", other),
        )),
    }
}

async fn save_documents_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<DocumentParams>,
    body: Bytes,
) -> Result<Json<BatchOutcome>, AppError> {
    authorize(&state, &headers, CommandKind::SaveDocuments.required_role())?;
    let cmd = params.into_command(body)?;
    match run(&state, cmd).await? {
        Output::Batch(outcome) => Ok(Json(outcome)),
        other => Err(unexpected(&other)),
    }
}

// =============================================================================
// Queries
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct QueryParams {
    #[serde(default)]
    view: Option<String>,
    #[serde(default)]
    cursor_id: Option<String>,
    #[serde(default)]
    batch_size: Option<String>,
}

impl QueryParams {
    /// `cursor_id` wins over `view`; neither means an ad-hoc query.
    fn kind(&self) -> CommandKind {
        if self.cursor_id.is_some() {
            CommandKind::FetchCursor
        } else if self.view.is_some() {
            CommandKind::QueryView
        } else {
            CommandKind::QueryRaw
        }
    }

    fn batch_size(&self) -> Result<Option<usize>, Error> {
        match self.batch_size.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| invalid_parameter("batch_size", format!("'{}' is not a count", raw))),
        }
    }

    fn into_command(self, body: Bytes) -> Result<Command, Error> {
        if let Some(cursor_id) = self.cursor_id {
            return Ok(Command::FetchCursor { cursor_id });
        }
        let batch_size = self.batch_size()?;
        let mut bind_vars = parse_bind_vars(&body)?;
        match self.view {
            Some(view) => Ok(Command::QueryView {
                view,
                bind_vars,
                batch_size,
            }),
            None => {
                let query = match bind_vars.remove("query") {
                    Some(Value::String(query)) => query,
                    Some(_) => return Err(invalid_parameter("query", "must be a string")),
                    None => return Err(invalid_parameter("query", "required")),
                };
                Ok(Command::QueryRaw {
                    query,
                    bind_vars,
                    batch_size,
                })
            }
        }
    }
}

/// An empty body binds nothing; anything else must be a JSON object.
fn parse_bind_vars(body: &[u8]) -> Result<BindVars, Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(BindVars::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(invalid_parameter(
            "body",
            format!("expected a JSON object, found {}", json_type(&other)),
        )),
        Err(e) => Err(invalid_parameter("body", e.to_string())),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

async fn query_results_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<QueryParams>,
    body: Bytes,
) -> Result<Json<QueryResult>, AppError> {
    authorize(&state, &headers, params.kind().required_role())?;
    let cmd = params.into_command(body)?;
    match run(&state, cmd).await? {
        Output::Query(result) => Ok(Json(result)),
        other => Err(unexpected(&other)),
    }
}

// =============================================================================
// Spec reloads
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct UpdateSpecsParams {
    #[serde(default)]
    reset: Option<String>,
    #[serde(default)]
    init_collections: Option<String>,
}

async fn update_specs_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<UpdateSpecsParams>,
) -> Result<Json<Value>, AppError> {
    authorize(&state, &headers, Some(Role::Admin))?;
    let reset = parse_flag("reset", params.reset.as_deref())?;
    let init_collections = parse_flag("init_collections", params.init_collections.as_deref())?;
    let reloader = Arc::clone(&state.reloader);
    let summary =
        task::spawn_blocking(move || reloader.reload(reset, init_collections)).await??;
    Ok(Json(json!({
        "status": "updated",
        "schemas": summary.schemas,
        "views": summary.views,
        "collections": summary.collections,
    })))
}

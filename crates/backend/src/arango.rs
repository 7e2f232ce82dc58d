//! ArangoDB HTTP adapter.
//!
//! Speaks the document, collection and cursor endpoints of the ArangoDB REST
//! API through a blocking `ureq` agent. Database error bodies
//! (`{"error": true, "errorNum": ..., "errorMessage": ...}`) become
//! [`BackendError::Query`] with `errorMessage` verbatim; transport failures
//! become [`BackendError::Unavailable`].

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use docgate_core::{
    Backend, BackendError, BackendResult, BackendStatus, BindVars, Document, DocumentKind,
    QueryPage, WriteOutcome,
};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// `ERROR_ARANGO_UNIQUE_CONSTRAINT_VIOLATED`
const UNIQUE_CONSTRAINT_VIOLATED: i64 = 1210;
/// `ERROR_ARANGO_DUPLICATE_NAME`
const DUPLICATE_NAME: i64 = 1207;

/// Connection settings for [`ArangoBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArangoOptions {
    /// Server root, e.g. `http://localhost:8529`.
    pub url: String,
    /// Database name.
    pub database: String,
    /// Basic-auth user; no header is sent when empty.
    pub username: String,
    /// Basic-auth password.
    pub password: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ArangoOptions {
    fn default() -> Self {
        Self {
            url: "http://localhost:8529".to_string(),
            database: "_system".to_string(),
            username: "root".to_string(),
            password: String::new(),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum BodyMethod {
    Post,
    Put,
    Patch,
}

#[derive(Debug)]
struct Reply {
    status: u16,
    body: Value,
}

impl Reply {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body of a 2xx reply, or the server's error message.
    fn into_ok(self) -> BackendResult<Value> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(BackendError::query(error_message(&self.body, self.status)))
        }
    }
}

/// Blocking ArangoDB [`Backend`].
pub struct ArangoBackend {
    agent: ureq::Agent,
    base: String,
    authorization: Option<String>,
}

impl std::fmt::Debug for ArangoBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArangoBackend")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl ArangoBackend {
    /// Build a client. No request is made until the first call.
    pub fn new(options: ArangoOptions) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(options.timeout))
            .http_status_as_error(false)
            .build();
        let agent = ureq::Agent::new_with_config(config);
        Self {
            agent,
            base: database_url(&options.url, &options.database),
            authorization: basic_auth(&options.username, &options.password),
        }
    }

    fn authorize<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        match &self.authorization {
            Some(value) => request.header("Authorization", value),
            None => request,
        }
    }

    fn get(&self, path: &str) -> BackendResult<Reply> {
        let url = format!("{}{}", self.base, path);
        read_reply(self.authorize(self.agent.get(&url)).call())
    }

    fn delete(&self, path: &str) -> BackendResult<Reply> {
        let url = format!("{}{}", self.base, path);
        read_reply(self.authorize(self.agent.delete(&url)).call())
    }

    fn send(&self, method: BodyMethod, path: &str, body: Option<&Value>) -> BackendResult<Reply> {
        let url = format!("{}{}", self.base, path);
        let bytes = match body {
            Some(body) => serde_json::to_vec(body)
                .map_err(|e| BackendError::unavailable(format!("failed to serialize request: {}", e)))?,
            None => Vec::new(),
        };
        let request = match method {
            BodyMethod::Post => self.agent.post(&url),
            BodyMethod::Put => self.agent.put(&url),
            BodyMethod::Patch => self.agent.patch(&url),
        };
        debug!(?method, %url, bytes = bytes.len(), "arango request");
        read_reply(
            self.authorize(request)
                .header("Content-Type", "application/json")
                .send(&bytes[..]),
        )
    }

    fn write(
        &self,
        method: BodyMethod,
        collection: &str,
        docs: &[Document],
        success: WriteOutcome,
    ) -> BackendResult<Vec<WriteOutcome>> {
        let body = Value::Array(docs.iter().cloned().map(Value::Object).collect());
        let reply = self
            .send(method, &format!("/_api/document/{}", collection), Some(&body))?
            .into_ok()?;
        let items = reply.as_array().ok_or_else(|| {
            BackendError::unavailable("document API did not return an array")
        })?;
        Ok(items.iter().map(|item| item_outcome(item, &success)).collect())
    }
}

fn database_url(url: &str, database: &str) -> String {
    format!("{}/_db/{}", url.trim_end_matches('/'), database)
}

fn basic_auth(username: &str, password: &str) -> Option<String> {
    if username.is_empty() {
        return None;
    }
    let credentials = STANDARD.encode(format!("{}:{}", username, password));
    Some(format!("Basic {}", credentials))
}

fn read_reply(result: Result<ureq::http::Response<ureq::Body>, ureq::Error>) -> BackendResult<Reply> {
    let mut response = result.map_err(|e| BackendError::unavailable(e.to_string()))?;
    let status = response.status().as_u16();
    let text = response
        .body_mut()
        .read_to_string()
        .map_err(|e| BackendError::unavailable(format!("failed to read response: {}", e)))?;
    let body = if text.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).map_err(|e| {
            BackendError::unavailable(format!("invalid JSON response (HTTP {}): {}", status, e))
        })?
    };
    Ok(Reply { status, body })
}

fn error_message(body: &Value, status: u16) -> String {
    body.get("errorMessage")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status))
}

fn error_num(body: &Value) -> Option<i64> {
    body.get("errorNum").and_then(Value::as_i64)
}

/// Classify one entry of a document API array reply.
fn item_outcome(item: &Value, success: &WriteOutcome) -> WriteOutcome {
    if item.get("error").and_then(Value::as_bool) != Some(true) {
        return success.clone();
    }
    let message = error_message(item, 0);
    if error_num(item) == Some(UNIQUE_CONSTRAINT_VIOLATED) {
        WriteOutcome::Conflict { message }
    } else {
        WriteOutcome::Failed { message }
    }
}

/// Convert a cursor API reply into a page.
fn cursor_page(body: Value) -> BackendResult<QueryPage> {
    let results = match body.get("result") {
        Some(Value::Array(rows)) => rows.clone(),
        _ => return Err(BackendError::unavailable("cursor API reply has no result array")),
    };
    let has_more = body.get("hasMore").and_then(Value::as_bool).unwrap_or(false);
    let continuation = body.get("id").and_then(Value::as_str).map(str::to_string);
    if has_more && continuation.is_none() {
        return Err(BackendError::unavailable("cursor API reported more rows without an id"));
    }
    Ok(QueryPage {
        results,
        count: body.get("count").and_then(Value::as_u64),
        has_more,
        continuation: if has_more { continuation } else { None },
        stats: body
            .get("extra")
            .and_then(|e| e.get("stats"))
            .cloned()
            .unwrap_or_else(|| json!({})),
    })
}

impl Backend for ArangoBackend {
    fn ensure_collection(&self, collection: &str, kind: DocumentKind) -> BackendResult<()> {
        let collection_type = match kind {
            DocumentKind::Vertex => 2,
            DocumentKind::Edge => 3,
        };
        let reply = self.send(
            BodyMethod::Post,
            "/_api/collection",
            Some(&json!({"name": collection, "type": collection_type})),
        )?;
        if reply.is_success() {
            debug!(collection, ?kind, "created collection");
            return Ok(());
        }
        if error_num(&reply.body) == Some(DUPLICATE_NAME) {
            return Ok(());
        }
        reply.into_ok().map(|_| ())
    }

    fn insert(&self, collection: &str, docs: &[Document]) -> BackendResult<Vec<WriteOutcome>> {
        self.write(BodyMethod::Post, collection, docs, WriteOutcome::Created)
    }

    fn update(&self, collection: &str, docs: &[Document]) -> BackendResult<Vec<WriteOutcome>> {
        self.write(BodyMethod::Patch, collection, docs, WriteOutcome::Updated)
    }

    fn replace(&self, collection: &str, docs: &[Document]) -> BackendResult<Vec<WriteOutcome>> {
        self.write(BodyMethod::Put, collection, docs, WriteOutcome::Updated)
    }

    fn query(
        &self,
        query: &str,
        bind_vars: &BindVars,
        batch_size: usize,
    ) -> BackendResult<QueryPage> {
        let body = json!({
            "query": query,
            "bindVars": bind_vars,
            "batchSize": batch_size.max(1),
            "count": true,
        });
        let reply = self.send(BodyMethod::Post, "/_api/cursor", Some(&body))?;
        cursor_page(reply.into_ok()?)
    }

    fn next_page(&self, continuation: &str) -> BackendResult<QueryPage> {
        let reply = self.send(
            BodyMethod::Put,
            &format!("/_api/cursor/{}", continuation),
            None,
        )?;
        cursor_page(reply.into_ok()?)
    }

    fn discard(&self, continuation: &str) -> BackendResult<()> {
        self.delete(&format!("/_api/cursor/{}", continuation))?
            .into_ok()
            .map(|_| ())
    }

    fn status(&self) -> BackendStatus {
        match self.get("/_api/version") {
            Ok(reply) if reply.is_success() => BackendStatus::ConnectedAuthorized,
            Ok(reply) if reply.status == 401 || reply.status == 403 => {
                BackendStatus::ConnectedUnauthorized
            }
            Ok(reply) => {
                warn!(status = reply.status, "unexpected reply from version endpoint");
                BackendStatus::Unreachable
            }
            Err(e) => {
                debug!(error = %e, "backend unreachable");
                BackendStatus::Unreachable
            }
        }
    }
}

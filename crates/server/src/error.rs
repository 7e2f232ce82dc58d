//! HTTP error mapping and boot errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use docgate_core::{BackendError, Error};
use docgate_schema::SpecError;
use docgate_security::AuthError;
use serde_json::json;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that stop the gateway from starting or serving.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The config file is unreadable or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The spec directory is unreadable or holds an invalid schema.
    #[error(transparent)]
    Spec(#[from] SpecError),
    /// A schema's collection could not be created.
    #[error("failed to prepare collection {collection}: {source}")]
    Collection {
        /// Collection name.
        collection: String,
        /// Backend failure.
        source: BackendError,
    },
    /// Binding the listener or serving failed.
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request-level failure, rendered as a JSON body with a status code.
#[derive(Debug, Error)]
pub enum AppError {
    /// A gateway error from the executor.
    #[error(transparent)]
    Gateway(#[from] Error),
    /// Missing or insufficient credentials.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// The blocking task running the command panicked or was cancelled.
    #[error("internal task failure: {0}")]
    Join(#[from] tokio::task::JoinError),
    /// Reloading the spec directory failed.
    #[error(transparent)]
    Reload(#[from] ServeError),
}

impl AppError {
    /// Status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Gateway(err) => match err {
                Error::Parse { .. }
                | Error::Validation { .. }
                | Error::BackendExecution { .. }
                | Error::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
                Error::SchemaNotFound { .. }
                | Error::ViewNotFound { .. }
                | Error::CursorNotFound { .. } => StatusCode::NOT_FOUND,
                Error::BackendUnavailable { .. } => StatusCode::BAD_GATEWAY,
                Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Auth(AuthError::MissingHeader) => StatusCode::BAD_REQUEST,
            AppError::Auth(AuthError::Unauthorized) => StatusCode::FORBIDDEN,
            AppError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Reload(ServeError::Collection {
                source: BackendError::Unavailable { .. },
                ..
            }) => StatusCode::BAD_GATEWAY,
            AppError::Reload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = match &self {
            AppError::Gateway(err) => err.to_body(),
            AppError::Auth(_) | AppError::Join(_) | AppError::Reload(_) => {
                json!({ "error": self.to_string() })
            }
        };
        (status, Json(body)).into_response()
    }
}
